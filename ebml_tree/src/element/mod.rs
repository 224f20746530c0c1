//! The element tree model
//!
//! Elements live in an arena owned by their [`ElementTree`]; an [`ElementRef`] is
//! a stable handle into it. The arena keeps parent links, upward invalidation,
//! and engine-driven mutation simple in the face of the borrow checker, and makes
//! the single-threaded execution model explicit.
//!
//! Every element is dual-lazy:
//!
//! * An element created by parsing holds a [`SegmentSource`] and derives its value
//!   (or its child list) the first time either is read.
//! * An element created programmatically, or assigned a new value, holds the value
//!   and derives its encoded bytes on demand.
//!
//! Both derivations are memoized; assigning a value invalidates every ancestor's
//! memoized length on the way to the root.

mod container;
mod value;

pub use value::{EbmlDate, ElementValue};

pub(crate) use container::ParseContext;

use crate::config::{ParseOptions, ParsingMode};
use crate::error::{EbmlError, Result};
use crate::macros::{err, parse_mode_choice};
use crate::schema::ElementDataType;
use crate::segment::SegmentSource;
use crate::vint::{ElementId, VInt};

use std::io::Read;

/// A handle to an element within its [`ElementTree`]
///
/// Handles stay valid across mutations elsewhere in the tree; using a handle
/// whose element was removed reports [`ErrorKind::DetachedElement`](crate::error::ErrorKind).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ElementRef(pub(crate) usize);

/// Where and why parsing of a container stopped early
///
/// Parsing a malformed or truncated container under
/// [`ParsingMode::BestAttempt`](crate::config::ParsingMode) keeps the children
/// read so far and records the interruption here instead of failing the whole
/// document.
#[derive(Debug)]
pub struct ParseInterruption {
	pub(crate) last_good_position: u64,
	pub(crate) error: EbmlError,
}

impl ParseInterruption {
	/// The offset within the container's payload of the last successfully parsed byte
	pub fn last_good_position(&self) -> u64 {
		self.last_good_position
	}

	/// The error that stopped parsing
	pub fn error(&self) -> &EbmlError {
		&self.error
	}
}

pub(crate) enum LeafState {
	/// Parsed; the value is derived from the segment on first read
	Encoded {
		segment: SegmentSource,
		value: Option<ElementValue>,
	},
	/// Assigned; the bytes are derived from the value on demand
	Decoded {
		value: ElementValue,
		bytes: Option<Vec<u8>>,
	},
}

pub(crate) struct MasterData {
	/// The payload bytes as parsed; `None` for synthesized containers
	pub(crate) segment: Option<SegmentSource>,
	/// `None` until the child list is first read
	pub(crate) children: Option<Vec<ElementRef>>,
	/// Memoized payload length, dropped whenever a descendant changes
	pub(crate) cached_length: Option<u64>,
	/// Whether any part of the subtree changed since it was parsed
	pub(crate) dirty: bool,
	pub(crate) interruption: Option<ParseInterruption>,
}

pub(crate) enum ElementKind {
	Leaf(LeafState),
	Master(MasterData),
}

pub(crate) struct Element {
	pub(crate) id: ElementId,
	pub(crate) parent: Option<ElementRef>,
	/// Ancestor IDs root first, ending in this element's own ID; empty for the root
	pub(crate) id_chain: Vec<ElementId>,
	pub(crate) name: &'static str,
	pub(crate) data_type: ElementDataType,
	/// Octet width of the parsed size VINT; 0 for synthesized elements
	pub(crate) size_width: u8,
	/// Whether the parsed size was the unknown sentinel
	pub(crate) size_unknown: bool,
	pub(crate) detached: bool,
	pub(crate) kind: ElementKind,
}

/// An arena of elements forming one parsed (or constructed) tree
pub struct ElementTree {
	nodes: Vec<Element>,
	root: ElementRef,
	pub(crate) options: ParseOptions,
}

impl ElementTree {
	/// Create a tree whose virtual root container spans `segment`
	pub fn new(segment: SegmentSource, options: ParseOptions) -> Self {
		let root = Element {
			id: ElementId(0),
			parent: None,
			id_chain: Vec::new(),
			name: "(root)",
			data_type: ElementDataType::Master,
			size_width: 0,
			size_unknown: false,
			detached: false,
			kind: ElementKind::Master(MasterData {
				segment: Some(segment),
				children: None,
				cached_length: None,
				dirty: false,
				interruption: None,
			}),
		};

		Self {
			nodes: vec![root],
			root: ElementRef(0),
			options,
		}
	}

	/// The virtual root container spanning the entire input
	pub fn root(&self) -> ElementRef {
		self.root
	}

	pub(crate) fn node(&self, elem: ElementRef) -> Result<&Element> {
		let node = &self.nodes[elem.0];
		if node.detached {
			err!(DetachedElement);
		}

		Ok(node)
	}

	pub(crate) fn node_mut(&mut self, elem: ElementRef) -> Result<&mut Element> {
		let node = &mut self.nodes[elem.0];
		if node.detached {
			err!(DetachedElement);
		}

		Ok(node)
	}

	/// The element's numeric ID
	pub fn id(&self, elem: ElementRef) -> Result<u64> {
		Ok(self.node(elem)?.id.value())
	}

	/// The element's schema name, or `"(unknown)"` if no schema entry matched
	pub fn name(&self, elem: ElementRef) -> Result<&'static str> {
		Ok(self.node(elem)?.name)
	}

	/// The element's resolved data type
	pub fn data_type(&self, elem: ElementRef) -> Result<ElementDataType> {
		Ok(self.node(elem)?.data_type)
	}

	/// The element's parent container, `None` for the root
	pub fn parent(&self, elem: ElementRef) -> Result<Option<ElementRef>> {
		Ok(self.node(elem)?.parent)
	}

	/// The element's id-chain: its ancestors' IDs root first, ending in its own
	pub fn id_chain(&self, elem: ElementRef) -> Result<&[ElementId]> {
		Ok(&self.node(elem)?.id_chain)
	}

	/// Whether the element is a container
	pub fn is_master(&self, elem: ElementRef) -> Result<bool> {
		Ok(matches!(self.node(elem)?.kind, ElementKind::Master(_)))
	}

	/// Where parsing of this container stopped early, if it did
	pub fn interruption(&self, elem: ElementRef) -> Result<Option<&ParseInterruption>> {
		match &self.node(elem)?.kind {
			ElementKind::Master(master) => Ok(master.interruption.as_ref()),
			ElementKind::Leaf(_) => Ok(None),
		}
	}

	/// The element's children, or `None` if they have not been materialized yet
	///
	/// Unlike [`Document::children`](crate::document::Document::children), this
	/// never triggers a parse.
	pub(crate) fn materialized_children(
		&self,
		elem: ElementRef,
	) -> Result<Option<Vec<ElementRef>>> {
		match &self.node(elem)?.kind {
			ElementKind::Master(master) => Ok(master.children.clone()),
			ElementKind::Leaf(_) => Ok(None),
		}
	}

	/// Whether the element's subtree changed since it was parsed
	///
	/// A clean subtree serializes to its original bytes verbatim.
	pub fn is_dirty(&self, elem: ElementRef) -> Result<bool> {
		match &self.node(elem)?.kind {
			ElementKind::Master(master) => Ok(master.dirty),
			ElementKind::Leaf(state) => Ok(matches!(state, LeafState::Decoded { .. })),
		}
	}

	/// The element's decoded value
	///
	/// The first read decodes the value from the element's segment and memoizes it.
	///
	/// # Errors
	///
	/// * The element is a container
	/// * The payload is malformed for the element's data type (unless
	///   [`ParsingMode::Relaxed`] is active)
	pub fn value(&mut self, elem: ElementRef) -> Result<&ElementValue> {
		let parse_mode = self.options.parsing_mode;

		let node = self.node_mut(elem)?;
		let (id, data_type) = (node.id.value(), node.data_type);

		let ElementKind::Leaf(state) = &mut node.kind else {
			err!(ValueTypeMismatch {
				expected: ElementDataType::Master.name(),
			});
		};

		match state {
			LeafState::Decoded { value, .. } => Ok(&*value),
			LeafState::Encoded { segment, value } => {
				if value.is_none() {
					let content = read_leaf_content(id, segment, parse_mode)?;
					*value = Some(ElementValue::decode(id, data_type, content, parse_mode)?);
				}

				Ok(value.as_ref().expect("value was just materialized"))
			},
		}
	}

	/// Assign a new value to a leaf element
	///
	/// The element's derived bytes are invalidated, and every ancestor's memoized
	/// length is dropped on the way to the root. The element's original segment is
	/// released; it will re-serialize from the new value.
	///
	/// # Errors
	///
	/// * The element is a container
	/// * The value's type does not match the element's data type
	pub fn set_value(&mut self, elem: ElementRef, value: ElementValue) -> Result<()> {
		let node = self.node_mut(elem)?;

		let ElementKind::Leaf(state) = &mut node.kind else {
			err!(NotALeaf);
		};

		if !value.matches(node.data_type) {
			err!(ValueTypeMismatch {
				expected: node.data_type.name(),
			});
		}

		*state = LeafState::Decoded { value, bytes: None };
		node.size_width = 0;
		node.size_unknown = false;

		self.invalidate_ancestors(elem);
		Ok(())
	}

	/// Drop the memoized length of every ancestor and mark it dirty
	///
	/// One pass per top-level mutation; each ancestor is touched exactly once.
	pub(crate) fn invalidate_ancestors(&mut self, elem: ElementRef) {
		let mut current = self.nodes[elem.0].parent;
		while let Some(ancestor) = current {
			let node = &mut self.nodes[ancestor.0];
			if let ElementKind::Master(master) = &mut node.kind {
				master.cached_length = None;
				master.dirty = true;
			}

			current = node.parent;
		}
	}

	/// The element's payload length in bytes, excluding its ID and size header
	///
	/// For a clean parsed element this is the segment length; for a mutated one it
	/// is derived from the live value/children and memoized.
	pub fn payload_length(&mut self, elem: ElementRef) -> Result<u64> {
		match &self.node(elem)?.kind {
			ElementKind::Leaf(LeafState::Encoded { segment, .. }) => Ok(segment.length()),
			ElementKind::Leaf(LeafState::Decoded { .. }) => {
				Ok(self.encoded_leaf_bytes(elem)?.len() as u64)
			},
			ElementKind::Master(master) => {
				if let Some(cached) = master.cached_length {
					return Ok(cached);
				}

				if !master.dirty {
					if let Some(segment) = &master.segment {
						return Ok(segment.length());
					}
				}

				let children = master
					.children
					.clone()
					.expect("a dirty container always has materialized children");

				let mut total = 0;
				for child in children {
					total += self.total_length(child)?;
				}

				if let ElementKind::Master(master) = &mut self.node_mut(elem)?.kind {
					master.cached_length = Some(total);
				}

				Ok(total)
			},
		}
	}

	/// The element's full encoded length: ID octets + size octets + payload
	///
	/// The virtual root writes no header of its own, so its total length is its
	/// payload length.
	pub fn total_length(&mut self, elem: ElementRef) -> Result<u64> {
		let payload = self.payload_length(elem)?;
		if elem == self.root {
			return Ok(payload);
		}

		let dirty = self.is_dirty(elem)?;

		let node = self.node(elem)?;
		let id_len = u64::from(node.id.octet_length());
		// An unknown-size sentinel survives edits below its element, so the
		// parsed width stays authoritative even for dirty containers
		let size_len = if (!dirty || node.size_unknown) && node.size_width > 0 {
			u64::from(node.size_width)
		} else {
			u64::from(VInt::<u64>::try_from(payload)?.octet_length())
		};

		Ok(id_len + size_len + payload)
	}

	/// The encoded payload of a `Decoded` leaf, memoized
	pub(crate) fn encoded_leaf_bytes(&mut self, elem: ElementRef) -> Result<&[u8]> {
		let node = self.node_mut(elem)?;

		let ElementKind::Leaf(LeafState::Decoded { value, bytes }) = &mut node.kind else {
			err!(Encoding("only assigned leaf elements re-derive their bytes"));
		};

		if bytes.is_none() {
			*bytes = Some(value.encode(None)?);
		}

		Ok(bytes.as_deref().expect("bytes were just materialized"))
	}

	/// Insert a new leaf element at `index` within `parent`'s children
	///
	/// The caller resolves `name` and `data_type` (normally from the active
	/// schema). The parent and all its ancestors are invalidated.
	pub(crate) fn insert_leaf(
		&mut self,
		parent: ElementRef,
		index: usize,
		id: ElementId,
		name: &'static str,
		data_type: ElementDataType,
		value: ElementValue,
	) -> Result<ElementRef> {
		if !value.matches(data_type) {
			err!(ValueTypeMismatch {
				expected: data_type.name(),
			});
		}

		self.insert_node(
			parent,
			index,
			id,
			name,
			data_type,
			ElementKind::Leaf(LeafState::Decoded { value, bytes: None }),
		)
	}

	/// Insert a new, empty container element at `index` within `parent`'s children
	pub(crate) fn insert_master(
		&mut self,
		parent: ElementRef,
		index: usize,
		id: ElementId,
		name: &'static str,
	) -> Result<ElementRef> {
		self.insert_node(
			parent,
			index,
			id,
			name,
			ElementDataType::Master,
			ElementKind::Master(MasterData {
				segment: None,
				children: Some(Vec::new()),
				cached_length: None,
				dirty: true,
				interruption: None,
			}),
		)
	}

	fn insert_node(
		&mut self,
		parent: ElementRef,
		index: usize,
		id: ElementId,
		name: &'static str,
		data_type: ElementDataType,
		kind: ElementKind,
	) -> Result<ElementRef> {
		let parent_node = self.node(parent)?;
		let mut id_chain = parent_node.id_chain.clone();
		id_chain.push(id);

		let ElementKind::Master(master) = &parent_node.kind else {
			err!(NotAContainer);
		};

		let Some(children) = &master.children else {
			err!(Encoding("cannot insert into an unmaterialized container"));
		};

		if index > children.len() {
			err!(Encoding("child index out of bounds"));
		}

		let new_ref = ElementRef(self.nodes.len());
		self.nodes.push(Element {
			id,
			parent: Some(parent),
			id_chain,
			name,
			data_type,
			size_width: 0,
			size_unknown: false,
			detached: false,
			kind,
		});

		if let ElementKind::Master(master) = &mut self.nodes[parent.0].kind {
			master
				.children
				.as_mut()
				.expect("presence was checked above")
				.insert(index, new_ref);
			master.cached_length = None;
			master.dirty = true;
		}

		self.invalidate_ancestors(parent);
		Ok(new_ref)
	}

	/// Remove an element (and its whole subtree) from its parent
	///
	/// The subtree is detached: the parent link is cleared and any handle into it
	/// reports [`ErrorKind::DetachedElement`](crate::error::ErrorKind) afterwards.
	pub fn remove(&mut self, elem: ElementRef) -> Result<()> {
		let node = self.node(elem)?;
		let Some(parent) = node.parent else {
			err!(Encoding("the root container cannot be removed"));
		};

		if let ElementKind::Master(master) = &mut self.nodes[parent.0].kind {
			if let Some(children) = &mut master.children {
				children.retain(|child| *child != elem);
			}
			master.cached_length = None;
			master.dirty = true;
		}

		self.invalidate_ancestors(parent);
		self.detach(elem);
		Ok(())
	}

	fn detach(&mut self, elem: ElementRef) {
		let node = &mut self.nodes[elem.0];
		node.detached = true;
		node.parent = None;

		if let ElementKind::Master(master) = &node.kind {
			if let Some(children) = master.children.clone() {
				for child in children {
					self.detach(child);
				}
			}
		}
	}

	/// The number of materialized elements in the tree, detached ones included
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}
}

/// Read a leaf's payload, handling backing streams shorter than the declared size
fn read_leaf_content(
	id: u64,
	segment: &mut SegmentSource,
	parse_mode: ParsingMode,
) -> Result<Vec<u8>> {
	segment.set_position(0);

	let mut content = Vec::new();
	segment.read_to_end(&mut content)?;

	if (content.len() as u64) < segment.length() {
		parse_mode_choice!(
			parse_mode,
			// Decode whatever the stream still had
			RELAXED: return Ok(content),
			DEFAULT: err!(TruncatedElement { id })
		);
	}

	Ok(content)
}
