//! Contains the errors that can arise within the EBML engine
//!
//! The primary error is [`EbmlError`]. The type of error is determined by [`ErrorKind`],
//! which can be extended at any time.

use std::collections::TryReserveError;
use std::fmt::{Debug, Display, Formatter};

/// Alias for `Result<T, EbmlError>`
pub type Result<T> = std::result::Result<T, EbmlError>;

/// The types of errors that can occur
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
	// Codec-level errors
	/// A VINT is either invalid (no marker bit in the leading octet) or too wide
	/// for the permitted octet count
	BadVintSize,
	/// A declared element length does not fit the element's data type
	///
	/// For example, an unsigned integer element declaring more than 8 octets,
	/// or a float element declaring a length other than 0, 4, or 8.
	BadElementLength {
		/// The element ID the bad length was declared for
		id: u64,
		/// The declared length in octets
		length: u64,
	},
	/// A fixed-width value read was cut short by the end of its segment
	TruncatedElement {
		/// The element ID whose payload was truncated
		id: u64,
	},

	// Structural errors
	/// The input does not begin with an EBML header element
	MissingHeader,
	/// An EBML header element was found nested inside a body container
	MisplacedHeader,
	/// The EBML header carries a DocType with no registered schema
	UnknownDocType(String),
	/// Containers were nested deeper than [`ParseOptions::max_depth`](crate::config::ParseOptions)
	MaxDepthReached,
	/// Errors that occur while decoding an element stream
	Decoding(&'static str),
	/// Errors that occur while re-serializing a tree
	Encoding(&'static str),

	// Tree manipulation errors
	/// Attempted to read or assign a value of the wrong type for an element
	ValueTypeMismatch {
		/// The data type the schema declares for the element
		expected: &'static str,
	},
	/// Attempted a child operation on a non-container element
	NotAContainer,
	/// Attempted a value operation on a container element
	NotALeaf,
	/// A stale [`ElementRef`](crate::element::ElementRef) was used after its element was removed
	DetachedElement,

	// Data errors
	/// Attempting to read/write an abnormally large amount of data
	TooMuchData,

	// Conversions for external errors
	/// Unable to convert bytes to a String
	StringFromUtf8(std::string::FromUtf8Error),
	/// Represents all cases of [`std::io::Error`].
	Io(std::io::Error),
	/// Failure to allocate enough memory
	Alloc(TryReserveError),
}

/// Errors that could occur within the EBML engine
pub struct EbmlError {
	pub(crate) kind: ErrorKind,
}

impl EbmlError {
	/// Create an `EbmlError` from an [`ErrorKind`]
	///
	/// # Examples
	///
	/// ```rust
	/// use ebml_tree::error::{EbmlError, ErrorKind};
	///
	/// let missing_header = EbmlError::new(ErrorKind::MissingHeader);
	/// ```
	#[must_use]
	pub const fn new(kind: ErrorKind) -> Self {
		Self { kind }
	}

	/// Returns the [`ErrorKind`]
	///
	/// # Examples
	///
	/// ```rust
	/// use ebml_tree::error::{EbmlError, ErrorKind};
	///
	/// let missing_header = EbmlError::new(ErrorKind::MissingHeader);
	/// if let ErrorKind::MissingHeader = missing_header.kind() {
	/// 	println!("Not an EBML stream at all");
	/// }
	/// ```
	pub fn kind(&self) -> &ErrorKind {
		&self.kind
	}
}

impl std::error::Error for EbmlError {}

impl Debug for EbmlError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:?}", self.kind)
	}
}

impl From<std::io::Error> for EbmlError {
	fn from(input: std::io::Error) -> Self {
		Self {
			kind: ErrorKind::Io(input),
		}
	}
}

impl From<std::string::FromUtf8Error> for EbmlError {
	fn from(input: std::string::FromUtf8Error) -> Self {
		Self {
			kind: ErrorKind::StringFromUtf8(input),
		}
	}
}

impl From<TryReserveError> for EbmlError {
	fn from(input: TryReserveError) -> Self {
		Self {
			kind: ErrorKind::Alloc(input),
		}
	}
}

impl Display for EbmlError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self.kind {
			// Conversions
			ErrorKind::StringFromUtf8(ref err) => write!(f, "{err}"),
			ErrorKind::Io(ref err) => write!(f, "{err}"),
			ErrorKind::Alloc(ref err) => write!(f, "{err}"),

			// Codec
			ErrorKind::BadVintSize => write!(f, "Encountered an invalid VINT octet length"),
			ErrorKind::BadElementLength { id, length } => write!(
				f,
				"Element {id:#X} declares a length of {length} octets, invalid for its data type"
			),
			ErrorKind::TruncatedElement { id } => {
				write!(f, "Element {id:#X} was cut short by the end of its segment")
			},

			// Structure
			ErrorKind::MissingHeader => {
				write!(f, "Input does not start with an EBML header element")
			},
			ErrorKind::MisplacedHeader => {
				write!(f, "Found an EBML header element nested inside a container")
			},
			ErrorKind::UnknownDocType(ref doc_type) => {
				write!(f, "No schema registered for DocType \"{doc_type}\"")
			},
			ErrorKind::MaxDepthReached => write!(f, "Maximum container depth reached"),
			ErrorKind::Decoding(message) => write!(f, "Decoding: {message}"),
			ErrorKind::Encoding(message) => write!(f, "Encoding: {message}"),

			// Tree
			ErrorKind::ValueTypeMismatch { expected } => {
				write!(f, "Value does not match the element's data type ({expected})")
			},
			ErrorKind::NotAContainer => {
				write!(f, "Attempted a child operation on a non-container element")
			},
			ErrorKind::NotALeaf => {
				write!(f, "Attempted a value operation on a container element")
			},
			ErrorKind::DetachedElement => {
				write!(f, "Attempted to use an element that was removed from its tree")
			},

			ErrorKind::TooMuchData => write!(
				f,
				"Attempted to read/write an abnormally large amount of data"
			),
		}
	}
}
