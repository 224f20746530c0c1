//! Options to control how documents are parsed

/// The parsing strictness mode
///
/// This can be set with [`ParseOptions::parsing_mode`].
///
/// # Examples
///
/// ```rust
/// use ebml_tree::config::{ParseOptions, ParsingMode};
///
/// // We only want to read spec-compliant inputs
/// let parsing_options = ParseOptions::new().parsing_mode(ParsingMode::Strict);
/// ```
#[derive(Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq, Default)]
#[non_exhaustive]
pub enum ParsingMode {
	/// Will eagerly error on invalid input
	///
	/// ## Examples of behavior
	///
	/// * An element declares more payload than its container holds - The parser errors
	///   and the entire input is discarded
	/// * A fixed-width value is cut short - The parser errors
	Strict,
	/// Default mode, less eager to error on recoverably malformed input
	///
	/// ## Examples of behavior
	///
	/// * An element declares more payload than its container holds - Parsing of that
	///   container stops, the partial tree is kept, and the interruption is recorded
	///   on the container
	/// * A fixed-width value is cut short - Reading that value errors, the rest of
	///   the tree is unaffected
	#[default]
	BestAttempt,
	/// Least eager to error, may produce zeroed/partial values
	///
	/// ## Examples of behavior
	///
	/// * An element's payload is cut short - Whatever bytes are present are decoded
	/// * A float or date has an impossible length - The value reads as zero,
	///   matching the behavior of older demuxers
	Relaxed,
}

/// Options to control how a [`Document`](crate::document::Document) is parsed
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct ParseOptions {
	pub(crate) parsing_mode: ParsingMode,
	pub(crate) max_id_length: u8,
	pub(crate) max_size_length: u8,
	pub(crate) max_depth: u8,
}

impl Default for ParseOptions {
	/// The default implementation for `ParseOptions`
	///
	/// The defaults are as follows:
	///
	/// ```rust,ignore
	/// ParseOptions {
	/// 	parsing_mode: ParsingMode::BestAttempt,
	/// 	max_id_length: 4,
	/// 	max_size_length: 8,
	/// 	max_depth: 16,
	/// }
	/// ```
	fn default() -> Self {
		Self::new()
	}
}

impl ParseOptions {
	/// Default parsing mode
	pub const DEFAULT_PARSING_MODE: ParsingMode = ParsingMode::BestAttempt;

	/// Default maximum length in octets of an element ID
	///
	/// <https://www.rfc-editor.org/rfc/rfc8794.html#name-ebmlmaxidlength-element>
	pub const DEFAULT_MAX_ID_LENGTH: u8 = 4;

	/// Default maximum length in octets of an element data size
	///
	/// <https://www.rfc-editor.org/rfc/rfc8794.html#name-ebmlmaxsizelength-element>
	pub const DEFAULT_MAX_SIZE_LENGTH: u8 = 8;

	/// Default maximum container nesting depth
	pub const DEFAULT_MAX_DEPTH: u8 = 16;

	/// Creates a new `ParseOptions`, alias for `Default` implementation
	///
	/// See also: [`ParseOptions::default`]
	///
	/// # Examples
	///
	/// ```rust
	/// use ebml_tree::config::ParseOptions;
	///
	/// let parsing_options = ParseOptions::new();
	/// ```
	#[must_use]
	pub const fn new() -> Self {
		Self {
			parsing_mode: Self::DEFAULT_PARSING_MODE,
			max_id_length: Self::DEFAULT_MAX_ID_LENGTH,
			max_size_length: Self::DEFAULT_MAX_SIZE_LENGTH,
			max_depth: Self::DEFAULT_MAX_DEPTH,
		}
	}

	/// The parsing mode to use, see [`ParsingMode`] for details
	///
	/// # Examples
	///
	/// ```rust
	/// use ebml_tree::config::{ParseOptions, ParsingMode};
	///
	/// // By default, `parsing_mode` is ParsingMode::BestAttempt. Here, we need absolute correctness.
	/// let parsing_options = ParseOptions::new().parsing_mode(ParsingMode::Strict);
	/// ```
	pub fn parsing_mode(&mut self, parsing_mode: ParsingMode) -> Self {
		self.parsing_mode = parsing_mode;
		*self
	}

	/// The maximum length in octets of an element ID
	///
	/// This is the initial value; the `EBMLMaxIDLength` header element overrides it
	/// once the header is parsed.
	///
	/// # Examples
	///
	/// ```rust
	/// use ebml_tree::config::ParseOptions;
	///
	/// let parsing_options = ParseOptions::new().max_id_length(8);
	/// ```
	pub fn max_id_length(&mut self, max_id_length: u8) -> Self {
		self.max_id_length = max_id_length;
		*self
	}

	/// The maximum length in octets of an element data size
	///
	/// This is the initial value; the `EBMLMaxSizeLength` header element overrides it
	/// once the header is parsed.
	///
	/// # Examples
	///
	/// ```rust
	/// use ebml_tree::config::ParseOptions;
	///
	/// let parsing_options = ParseOptions::new().max_size_length(4);
	/// ```
	pub fn max_size_length(&mut self, max_size_length: u8) -> Self {
		self.max_size_length = max_size_length;
		*self
	}

	/// The maximum container nesting depth before parsing bails out
	///
	/// # Examples
	///
	/// ```rust
	/// use ebml_tree::config::ParseOptions;
	///
	/// let parsing_options = ParseOptions::new().max_depth(32);
	/// ```
	pub fn max_depth(&mut self, max_depth: u8) -> Self {
		self.max_depth = max_depth;
		*self
	}
}
