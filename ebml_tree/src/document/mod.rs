//! The document layer: a parsed tree, its active schema, and reactive engines
//!
//! A [`Document`] owns everything a caller needs to read, edit, and re-serialize
//! one EBML stream: the element tree, the schema set the IDs resolve against,
//! the DocType the header activated, and the engines that keep derived state
//! (checksums, the seek index) consistent while the tree is edited.
//!
//! All mutation goes through the document. After each mutation commits, every
//! registered engine gets exactly one chance to react; changes an engine makes
//! do not trigger another round.

pub mod engines;

use self::engines::{DocumentEngine, EngineSlot};
use crate::config::ParseOptions;
use crate::element::{ElementRef, ElementTree, ElementValue, ParseContext, ParseInterruption};
use crate::error::Result;
use crate::macros::err;
use crate::schema::{ids, ElementDataType, SchemaSet};
use crate::segment::{MediaSource, SegmentSource};
use crate::vint::ElementId;

use std::io::Write;

/// The decoded contents of a document's EBML header
///
/// Fields the header leaves out take their schema-declared defaults.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct EbmlHeaderProperties {
	pub(crate) version: u64,
	pub(crate) read_version: u64,
	pub(crate) max_id_length: u8,
	pub(crate) max_size_length: u8,
	pub(crate) doc_type: String,
	pub(crate) doc_type_version: u64,
	pub(crate) doc_type_read_version: u64,
}

impl Default for EbmlHeaderProperties {
	fn default() -> Self {
		Self {
			version: 1,
			read_version: 1,
			max_id_length: 4,
			max_size_length: 8,
			doc_type: String::new(),
			doc_type_version: 1,
			doc_type_read_version: 1,
		}
	}
}

impl EbmlHeaderProperties {
	/// The EBML version the document was written with
	pub fn version(&self) -> u64 {
		self.version
	}

	/// The minimum EBML version a reader needs to understand the document
	pub fn read_version(&self) -> u64 {
		self.read_version
	}

	/// The maximum length of any element ID in the document, in octets
	pub fn max_id_length(&self) -> u8 {
		self.max_id_length
	}

	/// The maximum length of any element data size in the document, in octets
	pub fn max_size_length(&self) -> u8 {
		self.max_size_length
	}

	/// The DocType, e.g. `"matroska"` or `"webm"`
	pub fn doc_type(&self) -> &str {
		&self.doc_type
	}

	/// The DocType version the document conforms to
	pub fn doc_type_version(&self) -> u64 {
		self.doc_type_version
	}

	/// The minimum DocType version a reader needs
	pub fn doc_type_read_version(&self) -> u64 {
		self.doc_type_read_version
	}
}

/// A parsed EBML document
///
/// See the [module docs](self) for the overall model.
pub struct Document {
	tree: ElementTree,
	schemas: SchemaSet,
	doc_type: Option<String>,
	header: EbmlHeaderProperties,
	engines: Vec<EngineSlot>,
}

impl std::fmt::Debug for Document {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Document")
			.field("doc_type", &self.doc_type)
			.field("header", &self.header)
			.field("elements", &self.tree.node_count())
			.field("engines", &self.engines.len())
			.finish_non_exhaustive()
	}
}

impl Document {
	/// Parse a document from any seekable reader
	///
	/// Only the root level and the EBML header are parsed up front; everything
	/// below is parsed on first access. The bundled Matroska and WebM schemas
	/// are registered, as are the CRC-32 and seek index engines.
	///
	/// # Errors
	///
	/// * The input does not start with an EBML header
	/// * The header names a DocType with no registered schema
	/// * The header itself is malformed
	pub fn read_from<R>(reader: R, options: ParseOptions) -> Result<Self>
	where
		R: MediaSource + 'static,
	{
		Self::read_with_schemas(reader, options, SchemaSet::with_default_doc_types())
	}

	/// Parse a document from an in-memory buffer
	pub fn read_from_buf(buf: Vec<u8>, options: ParseOptions) -> Result<Self> {
		Self::from_segment(
			SegmentSource::from_buf(buf),
			options,
			SchemaSet::with_default_doc_types(),
		)
	}

	/// Parse a document resolving against a caller-provided schema set
	pub fn read_with_schemas<R>(
		reader: R,
		options: ParseOptions,
		schemas: SchemaSet,
	) -> Result<Self>
	where
		R: MediaSource + 'static,
	{
		Self::from_segment(SegmentSource::from_reader(reader)?, options, schemas)
	}

	fn from_segment(
		segment: SegmentSource,
		options: ParseOptions,
		schemas: SchemaSet,
	) -> Result<Self> {
		let mut tree = ElementTree::new(segment, options);
		let mut doc_type = None;

		let root = tree.root();
		tree.ensure_children(
			root,
			&mut ParseContext {
				schemas: &schemas,
				doc_type: &mut doc_type,
			},
		)?;

		let mut document = Self {
			tree,
			schemas,
			doc_type,
			header: EbmlHeaderProperties::default(),
			engines: Vec::new(),
		};
		document.read_header_properties()?;

		// Order matters: the seek index may rewrite SeekPositions, and checksums
		// have to cover those final bytes
		document.register_engine(Box::new(engines::SeekIndexEngine));
		document.register_engine(Box::new(engines::ChecksumEngine));
		Ok(document)
	}

	/// The DocType the header activated, if any
	pub fn doc_type(&self) -> Option<&str> {
		self.doc_type.as_deref()
	}

	/// The decoded EBML header
	pub fn header(&self) -> &EbmlHeaderProperties {
		&self.header
	}

	/// The virtual root container
	pub fn root(&self) -> ElementRef {
		self.tree.root()
	}

	/// The element's children, parsing them on first access
	///
	/// # Errors
	///
	/// * The element is not a container
	/// * `ParsingMode::Strict` is active and a child is malformed
	pub fn children(&mut self, elem: ElementRef) -> Result<Vec<ElementRef>> {
		self.tree.ensure_children(
			elem,
			&mut ParseContext {
				schemas: &self.schemas,
				doc_type: &mut self.doc_type,
			},
		)?;

		Ok(self
			.tree
			.materialized_children(elem)?
			.unwrap_or_default())
	}

	/// The element's decoded value, decoding it on first access
	pub fn value(&mut self, elem: ElementRef) -> Result<&ElementValue> {
		self.tree.value(elem)
	}

	/// The element's numeric ID
	pub fn id(&self, elem: ElementRef) -> Result<u64> {
		self.tree.id(elem)
	}

	/// The element's schema name
	pub fn name(&self, elem: ElementRef) -> Result<&'static str> {
		self.tree.name(elem)
	}

	/// The element's resolved data type
	pub fn data_type(&self, elem: ElementRef) -> Result<ElementDataType> {
		self.tree.data_type(elem)
	}

	/// The element's parent, `None` for the root
	pub fn parent(&self, elem: ElementRef) -> Result<Option<ElementRef>> {
		self.tree.parent(elem)
	}

	/// Whether the element is a container
	pub fn is_master(&self, elem: ElementRef) -> Result<bool> {
		self.tree.is_master(elem)
	}

	/// Where parsing of this container stopped early, if it did
	pub fn interruption(&self, elem: ElementRef) -> Result<Option<&ParseInterruption>> {
		self.tree.interruption(elem)
	}

	/// The element's full encoded length in bytes
	pub fn total_length(&mut self, elem: ElementRef) -> Result<u64> {
		self.tree.total_length(elem)
	}

	/// Assign a new value to a leaf element
	///
	/// Engines react once the assignment commits: checksums covering the element
	/// are recomputed and the seek index is brought back in sync.
	pub fn set_value(&mut self, elem: ElementRef, value: ElementValue) -> Result<()> {
		self.tree.set_value(elem, value)?;
		self.dispatch_engines(elem);
		Ok(())
	}

	/// Insert a new leaf element at `index` within `parent`'s children
	///
	/// The ID is resolved against the active schema for its name and data type;
	/// IDs without a schema entry are inserted as opaque binary.
	///
	/// # Errors
	///
	/// * `id` has no valid VINT encoding (zero, below the 1-octet floor, or
	///   wider than 8 octets)
	/// * The schema declares `id` as a master element
	pub fn insert_leaf(
		&mut self,
		parent: ElementRef,
		index: usize,
		id: u64,
		value: ElementValue,
	) -> Result<ElementRef> {
		// An ID stores its own marker bit, so anything below 0x80 has no
		// encodable width at all
		if id == 0 || !(1..=8).contains(&ElementId(id).octet_length()) {
			err!(BadVintSize);
		}

		let (name, data_type) = match self.schemas.resolve(self.doc_type.as_deref(), id) {
			Some(schema_element) => (schema_element.name(), schema_element.data_type()),
			None => ("(unknown)", ElementDataType::Binary),
		};

		if data_type == ElementDataType::Master {
			err!(NotALeaf);
		}

		let new_ref = self
			.tree
			.insert_leaf(parent, index, ElementId(id), name, data_type, value)?;
		self.dispatch_engines(new_ref);
		Ok(new_ref)
	}

	/// Insert a new, empty container at `index` within `parent`'s children
	///
	/// # Errors
	///
	/// * The schema does not declare `id` as a master element
	pub fn insert_master(
		&mut self,
		parent: ElementRef,
		index: usize,
		id: u64,
	) -> Result<ElementRef> {
		let Some(schema_element) = self.schemas.resolve(self.doc_type.as_deref(), id) else {
			err!(Encoding("cannot insert a container with no schema entry"));
		};

		if schema_element.data_type() != ElementDataType::Master {
			err!(NotAContainer);
		}

		let new_ref =
			self.tree
				.insert_master(parent, index, ElementId(id), schema_element.name())?;
		self.dispatch_engines(new_ref);
		Ok(new_ref)
	}

	/// Remove an element and its whole subtree
	pub fn remove(&mut self, elem: ElementRef) -> Result<()> {
		let parent = self.tree.parent(elem)?;
		self.tree.remove(elem)?;

		if let Some(parent) = parent {
			self.dispatch_engines(parent);
		}
		Ok(())
	}

	/// Serialize the document
	///
	/// Untouched subtrees reproduce their original bytes exactly; a document
	/// serialized straight after parsing is byte for byte its input.
	pub fn write_to<W: Write>(&mut self, writer: &mut W) -> Result<()> {
		self.tree.write_to(writer)
	}

	/// Register an engine; it reacts to every mutation from now on
	pub fn register_engine(&mut self, engine: Box<dyn DocumentEngine>) {
		self.engines.push(EngineSlot {
			engine,
			in_progress: false,
		});
	}

	pub(crate) fn tree_mut(&mut self) -> &mut ElementTree {
		&mut self.tree
	}

	/// Give every applicable engine one pass over the committed mutation
	///
	/// The engine list is taken out of the document for the duration, so any
	/// mutation an engine makes through the document API finds an empty list and
	/// cannot start a second round.
	fn dispatch_engines(&mut self, changed: ElementRef) {
		let mut engines = std::mem::take(&mut self.engines);

		for slot in &mut engines {
			if slot.in_progress || !slot.engine.applies_to(self.doc_type.as_deref()) {
				continue;
			}

			slot.in_progress = true;
			if let Err(error) = slot.engine.on_change(self, changed) {
				log::warn!("The {} engine failed to react: {error}", slot.engine.name());
			}
			slot.in_progress = false;
		}

		// Engines registered during dispatch landed in self.engines; keep them
		let added = std::mem::replace(&mut self.engines, engines);
		self.engines.extend(added);
	}

	fn read_header_properties(&mut self) -> Result<()> {
		let root = self.tree.root();
		let top_level = self.children(root)?;
		let Some(&header) = top_level.first() else {
			err!(MissingHeader);
		};

		if self.tree.id(header)? != ids::EBML {
			err!(MissingHeader);
		}

		let mut props = EbmlHeaderProperties {
			doc_type: self.doc_type.clone().unwrap_or_default(),
			..EbmlHeaderProperties::default()
		};

		for child in self.children(header)? {
			let id = self.tree.id(child)?;
			match id {
				ids::VERSION => props.version = self.uint_value(child)?,
				ids::READ_VERSION => props.read_version = self.uint_value(child)?,
				ids::MAX_ID_LENGTH => props.max_id_length = self.uint_value(child)? as u8,
				ids::MAX_SIZE_LENGTH => props.max_size_length = self.uint_value(child)? as u8,
				ids::DOC_TYPE_VERSION => props.doc_type_version = self.uint_value(child)?,
				ids::DOC_TYPE_READ_VERSION => {
					props.doc_type_read_version = self.uint_value(child)?
				},
				_ => {},
			}
		}

		self.header = props;
		Ok(())
	}

	fn uint_value(&mut self, elem: ElementRef) -> Result<u64> {
		match self.tree.value(elem)? {
			ElementValue::UnsignedInt(value) => Ok(*value),
			_ => err!(ValueTypeMismatch {
				expected: "unsigned integer",
			}),
		}
	}
}
