//! Declarative per-DocType schemas
//!
//! A [`Schema`] is a table mapping numeric element IDs to their names, data types,
//! permitted ancestry, and occurrence rules. Schemas are pure data; the engine
//! consults them to resolve element types at parse time and to decide, during
//! unknown-size resolution, whether an ID can legally appear at a given point in
//! the tree.
//!
//! A [`SchemaSet`] overlays a DocType-specific table (Matroska, WebM) over the
//! base EBML header table. How a table is authored does not matter to the engine;
//! the tables shipped here are plain statics.

mod ebml;
mod matroska;

pub use ebml::EBML_SCHEMA;
pub use matroska::{MATROSKA_SCHEMA, WEBM_SCHEMA};

pub(crate) mod ids {
	pub(crate) use super::ebml::{
		CRC32, DOC_TYPE, DOC_TYPE_READ_VERSION, DOC_TYPE_VERSION, EBML, MAX_ID_LENGTH,
		MAX_SIZE_LENGTH, READ_VERSION, VERSION,
	};
	pub(crate) use super::matroska::{
		ATTACHMENTS, CHAPTERS, CUES, INFO, SEEK, SEEK_HEAD, SEEK_ID, SEEK_POSITION, SEGMENT, TAGS,
		TRACKS,
	};
}

use crate::vint::ElementId;

use std::collections::HashMap;

/// The data types an element's payload can take
///
/// `Block` and `SimpleBlock` carry Matroska frame payloads; structurally they are
/// binary, but they keep their own tag so callers can recognize them without
/// ID comparisons.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ElementDataType {
	SignedInt,
	UnsignedInt,
	Float,
	String,
	Utf8,
	Date,
	Master,
	Binary,
	Block,
	SimpleBlock,
}

impl ElementDataType {
	pub(crate) fn name(self) -> &'static str {
		match self {
			Self::SignedInt => "signed integer",
			Self::UnsignedInt => "unsigned integer",
			Self::Float => "float",
			Self::String => "string",
			Self::Utf8 => "UTF-8 string",
			Self::Date => "date",
			Self::Master => "master",
			Self::Binary => "binary",
			Self::Block => "block",
			Self::SimpleBlock => "simple block",
		}
	}
}

/// The required ancestry of a schema element
#[derive(Copy, Clone, Debug)]
pub enum ElementPath {
	/// The exact chain of ancestor IDs, root first, excluding the element itself
	Exact(&'static [u64]),
	/// Valid at any point in any tree once the chain depth is >= `min_depth`
	///
	/// A `min_depth` of 0 is an unrestricted global.
	Global {
		/// The minimum ancestor chain depth at which the element is valid
		min_depth: usize,
	},
}

/// A default value carried by a schema element
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DefaultValue {
	UnsignedInt(u64),
	SignedInt(i64),
	Float(f64),
	Str(&'static str),
}

/// An exact or ranged constraint on an element's payload length in octets
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LengthConstraint {
	Exact(u64),
	Range(u64, u64),
}

impl LengthConstraint {
	/// Whether `length` satisfies the constraint
	pub fn permits(self, length: u64) -> bool {
		match self {
			Self::Exact(expected) => length == expected,
			Self::Range(min, max) => (min..=max).contains(&length),
		}
	}
}

/// One declarative schema record
///
/// Immutable once loaded; tables are built from these with const builder calls:
///
/// ```rust
/// use ebml_tree::schema::{ElementDataType, SchemaElement};
///
/// const SEGMENT: u64 = 0x1853_8067;
/// static INFO: SchemaElement =
/// 	SchemaElement::new(0x1549_A966, "Info", &[SEGMENT], ElementDataType::Master).required();
/// ```
#[derive(Debug)]
pub struct SchemaElement {
	pub(crate) id: u64,
	pub(crate) name: &'static str,
	pub(crate) path: ElementPath,
	pub(crate) data_type: ElementDataType,
	pub(crate) min_occurs: u64,
	pub(crate) max_occurs: Option<u64>,
	pub(crate) recurring: bool,
	pub(crate) recursive: bool,
	pub(crate) default: Option<DefaultValue>,
	pub(crate) length: Option<LengthConstraint>,
}

impl SchemaElement {
	/// Create an element with an exact ancestry path
	#[must_use]
	pub const fn new(
		id: u64,
		name: &'static str,
		parents: &'static [u64],
		data_type: ElementDataType,
	) -> Self {
		Self {
			id,
			name,
			path: ElementPath::Exact(parents),
			data_type,
			min_occurs: 0,
			max_occurs: None,
			recurring: false,
			recursive: false,
			default: None,
			length: None,
		}
	}

	/// Create a global element, valid anywhere at depth >= `min_depth`
	#[must_use]
	pub const fn global(
		id: u64,
		name: &'static str,
		min_depth: usize,
		data_type: ElementDataType,
	) -> Self {
		Self {
			id,
			name,
			path: ElementPath::Global { min_depth },
			data_type,
			min_occurs: 0,
			max_occurs: None,
			recurring: true,
			recursive: false,
			default: None,
			length: None,
		}
	}

	/// Mark the element as mandatory (`min_occurs = 1`)
	#[must_use]
	pub const fn required(mut self) -> Self {
		self.min_occurs = 1;
		self
	}

	/// Limit how many times the element may occur within its parent
	#[must_use]
	pub const fn max_occurs(mut self, max: u64) -> Self {
		self.max_occurs = Some(max);
		self
	}

	/// Mark the element as recurring (it may appear in multiple parents)
	#[must_use]
	pub const fn recurring(mut self) -> Self {
		self.recurring = true;
		self
	}

	/// Mark the element as recursive (it may nest within itself)
	#[must_use]
	pub const fn recursive(mut self) -> Self {
		self.recursive = true;
		self
	}

	/// Attach a default value
	#[must_use]
	pub const fn default_value(mut self, default: DefaultValue) -> Self {
		self.default = Some(default);
		self
	}

	/// Constrain the payload length in octets
	#[must_use]
	pub const fn length(mut self, constraint: LengthConstraint) -> Self {
		self.length = Some(constraint);
		self
	}

	/// The element's numeric ID
	pub fn id(&self) -> u64 {
		self.id
	}

	/// The element's human-readable name
	pub fn name(&self) -> &'static str {
		self.name
	}

	/// The element's data type
	pub fn data_type(&self) -> ElementDataType {
		self.data_type
	}

	/// The element's default value, if the schema declares one
	pub fn default(&self) -> Option<DefaultValue> {
		self.default
	}

	/// Whether the schema requires at least one occurrence of the element
	pub fn is_required(&self) -> bool {
		self.min_occurs > 0
	}

	/// Whether the element may appear under multiple parents
	pub fn is_recurring(&self) -> bool {
		self.recurring
	}

	/// Whether `candidate_chain` (root first, ending in this element's would-be
	/// parent) satisfies this element's path rule
	fn valid_under(&self, chain: &[ElementId]) -> bool {
		match self.path {
			ElementPath::Global { min_depth } => chain.len() >= min_depth,
			ElementPath::Exact(parents) => {
				let mut chain = chain;

				// A recursive element nests within itself; strip any trailing
				// run of its own ID before the exact comparison.
				if self.recursive {
					while let [rest @ .., last] = chain {
						if last.value() != self.id {
							break;
						}
						chain = rest;
					}
				}

				// Children of a recursive container see their parent's ID repeated
				// at the chain tail (\Chapters\EditionEntry\ChapterAtom\ChapterAtom\...).
				if let Some(&innermost) = parents.last() {
					while chain.len() > parents.len() {
						let [rest @ .., last] = chain else { break };
						if last.value() != innermost {
							break;
						}
						chain = rest;
					}
				}

				chain.len() == parents.len()
					&& chain
						.iter()
						.zip(parents)
						.all(|(have, want)| have.value() == *want)
			},
		}
	}
}

/// Check whether `candidate` is a valid direct child of a container with the
/// given id-chain
///
/// `chain` is the container's own id-chain: its ancestor IDs root first, ending
/// in the container's own ID. The document root has an empty chain.
pub fn check_parent(chain: &[ElementId], candidate: &SchemaElement) -> bool {
	candidate.valid_under(chain)
}

/// Walk an ancestor chain from the deepest entry outward, discarding entries
/// until `candidate` is valid, and return the length of the surviving chain
///
/// This is the primitive behind unknown-size resolution: when the forward scan
/// reads the next ID, the elements it can legally belong to are exactly the
/// prefixes of the current chain that this function does not discard. `None`
/// means the ID is not valid anywhere along the chain.
pub fn check_parents(chain: &[ElementId], candidate: &SchemaElement) -> Option<usize> {
	(0..=chain.len())
		.rev()
		.find(|&depth| candidate.valid_under(&chain[..depth]))
}

/// A schema table for one DocType
pub struct Schema {
	doc_type: &'static str,
	elements: HashMap<u64, &'static SchemaElement>,
}

impl Schema {
	/// Build a schema from a static table
	///
	/// Later entries with a duplicate ID override earlier ones.
	pub fn new(doc_type: &'static str, table: &'static [SchemaElement]) -> Self {
		let mut elements = HashMap::with_capacity(table.len());
		for element in table {
			elements.insert(element.id, element);
		}

		Self { doc_type, elements }
	}

	/// The DocType this schema describes
	pub fn doc_type(&self) -> &'static str {
		self.doc_type
	}

	/// Look up an element by its numeric ID
	pub fn get(&self, id: u64) -> Option<&'static SchemaElement> {
		self.elements.get(&id).copied()
	}
}

/// The base EBML table plus any number of DocType overlays
///
/// Lookups in an activated DocType fall through to the base table, so the
/// header elements and the CRC-32/Void globals never need re-declaring.
pub struct SchemaSet {
	base: Schema,
	doc_types: Vec<Schema>,
}

impl Default for SchemaSet {
	fn default() -> Self {
		Self::with_default_doc_types()
	}
}

impl SchemaSet {
	/// A set containing only the base EBML header schema
	pub fn bare() -> Self {
		Self {
			base: Schema::new("ebml", EBML_SCHEMA),
			doc_types: Vec::new(),
		}
	}

	/// A set with the bundled Matroska and WebM schemas registered
	pub fn with_default_doc_types() -> Self {
		let mut set = Self::bare();
		set.register(Schema::new("matroska", MATROSKA_SCHEMA));
		set.register(Schema::new("webm", WEBM_SCHEMA));
		set
	}

	/// Register a DocType schema, replacing any existing one for the same DocType
	pub fn register(&mut self, schema: Schema) {
		self.doc_types.retain(|s| s.doc_type != schema.doc_type);
		self.doc_types.push(schema);
	}

	/// Whether a schema is registered for `doc_type`
	pub fn supports(&self, doc_type: &str) -> bool {
		self.doc_types.iter().any(|s| s.doc_type == doc_type)
	}

	/// Look up an ID in the given DocType's table, falling through to the base
	/// EBML table
	///
	/// With no DocType active (the state before the header has been parsed),
	/// only the base table is consulted.
	pub fn resolve(&self, doc_type: Option<&str>, id: u64) -> Option<&'static SchemaElement> {
		if let Some(doc_type) = doc_type {
			if let Some(schema) = self.doc_types.iter().find(|s| s.doc_type == doc_type) {
				if let Some(element) = schema.get(id) {
					return Some(element);
				}
			}
		}

		self.base.get(id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::vint::ElementId;

	fn chain(ids: &[u64]) -> Vec<ElementId> {
		ids.iter().map(|id| ElementId(*id)).collect()
	}

	#[test_log::test]
	fn exact_path_depth_must_match() {
		let set = SchemaSet::with_default_doc_types();
		let info = set.resolve(Some("matroska"), 0x1549_A966).unwrap();

		// \Segment\Info
		assert!(check_parent(&chain(&[0x1853_8067]), info));
		// Not at the root
		assert!(!check_parent(&chain(&[]), info));
		// Not a level deeper
		assert!(!check_parent(&chain(&[0x1853_8067, 0x1549_A966]), info));
	}

	#[test_log::test]
	fn unrestricted_global_valid_anywhere() {
		let set = SchemaSet::bare();
		let void = set.resolve(None, 0xEC).unwrap();

		assert!(check_parent(&chain(&[]), void));
		assert!(check_parent(&chain(&[0x1853_8067]), void));
		assert!(check_parent(
			&chain(&[0x1853_8067, 0x1654_AE6B, 0xAE]),
			void
		));
	}

	#[test_log::test]
	fn min_depth_global() {
		static DEEP_GLOBAL: SchemaElement =
			SchemaElement::global(0x6FAB, "DeepGlobal", 2, ElementDataType::Binary);

		assert!(!check_parent(&chain(&[]), &DEEP_GLOBAL));
		assert!(!check_parent(&chain(&[0x1853_8067]), &DEEP_GLOBAL));
		assert!(check_parent(
			&chain(&[0x1853_8067, 0x1549_A966]),
			&DEEP_GLOBAL
		));
	}

	#[test_log::test]
	fn check_parents_discards_invalid_tails() {
		let set = SchemaSet::with_default_doc_types();
		let info = set.resolve(Some("matroska"), 0x1549_A966).unwrap();

		// Scanning inside \Segment\Tracks\TrackEntry: Info is only valid once the
		// chain is unwound back to \Segment.
		let deep = chain(&[0x1853_8067, 0x1654_AE6B, 0xAE]);
		assert_eq!(check_parents(&deep, info), Some(1));

		// An ID that is valid nowhere along the chain
		static NOWHERE: SchemaElement =
			SchemaElement::new(0x7FFE, "Nowhere", &[0x4242], ElementDataType::Binary);
		assert_eq!(check_parents(&deep, &NOWHERE), None);
	}

	#[test_log::test]
	fn doc_type_overlay_falls_through_to_base() {
		let set = SchemaSet::with_default_doc_types();

		// DocType lives in the base EBML table
		assert!(set.resolve(Some("matroska"), 0x4282).is_some());
		// Segment lives in the overlay only
		assert!(set.resolve(Some("matroska"), 0x1853_8067).is_some());
		assert!(set.resolve(None, 0x1853_8067).is_none());
	}

	#[test_log::test]
	fn recursive_elements_nest_within_themselves() {
		let set = SchemaSet::with_default_doc_types();
		let chapter_atom = set.resolve(Some("matroska"), 0xB6).unwrap();
		assert!(chapter_atom.recursive);

		let base = &[0x1853_8067, 0x1043_A770, 0x45B9][..];
		assert!(check_parent(&chain(base), chapter_atom));

		// Nested once inside itself
		let mut nested = base.to_vec();
		nested.push(0xB6);
		assert!(check_parent(&chain(&nested), chapter_atom));

		// And twice
		nested.push(0xB6);
		assert!(check_parent(&chain(&nested), chapter_atom));
	}
}
