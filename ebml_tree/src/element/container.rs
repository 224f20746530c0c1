//! Container parsing and re-serialization
//!
//! Children are parsed on first access, one level at a time. The loop for a
//! single level:
//!
//! 1. Parse the child's ID (marker retained) and size VINT
//! 2. If the size is the unknown sentinel, resolve the true length by scanning
//!    forward over child headers
//! 3. Sub-slice the container's segment for the child's payload
//! 4. Resolve the ID against the active schema for its name and data type
//! 5. If the child is the EBML header, parse it eagerly and activate the
//!    DocType's schema before any further sibling is read
//!
//! Serialization is the mirror image, with one guarantee: an element whose
//! subtree was never mutated re-emits its original bytes exactly, including
//! over-long size encodings and unknown-size sentinels.

use super::{
	Element, ElementKind, ElementRef, ElementTree, ElementValue, LeafState, MasterData,
	ParseInterruption,
};
use crate::config::ParsingMode;
use crate::error::{EbmlError, ErrorKind, Result};
use crate::macros::err;
use crate::schema::{check_parent, check_parents, ids, ElementDataType, SchemaElement, SchemaSet};
use crate::segment::SegmentSource;
use crate::vint::{ElementId, VInt};

use std::io::Write;

/// Everything the parse loop needs besides the tree itself
///
/// Kept separate so a [`Document`](crate::document::Document) can lend its
/// schema set and DocType state to the tree without borrowing itself whole.
pub(crate) struct ParseContext<'a> {
	pub(crate) schemas: &'a SchemaSet,
	pub(crate) doc_type: &'a mut Option<String>,
}

impl ParseContext<'_> {
	fn resolve(&self, id: u64) -> Option<&'static SchemaElement> {
		self.schemas.resolve(self.doc_type.as_deref(), id)
	}
}

impl ElementTree {
	/// Parse `elem`'s children if they have not been materialized yet
	///
	/// Idempotent; the child list is parsed at most once per container.
	pub(crate) fn ensure_children(
		&mut self,
		elem: ElementRef,
		ctx: &mut ParseContext<'_>,
	) -> Result<()> {
		let is_root = elem == self.root();
		let parse_mode = self.options.parsing_mode;

		let node = self.node(elem)?;
		let container_name = node.name;
		let chain = node.id_chain.clone();

		let ElementKind::Master(master) = &node.kind else {
			err!(NotAContainer);
		};

		if master.children.is_some() {
			return Ok(());
		}

		if chain.len() >= usize::from(self.options.max_depth) {
			err!(MaxDepthReached);
		}

		// An unmaterialized container always came from parsing, so it has a segment.
		// Cloning resets the cursor to the payload start.
		let mut segment = master
			.segment
			.clone()
			.expect("unmaterialized containers retain their segment");

		let mut children = Vec::new();
		let mut interruption = None;
		let mut last_good = 0u64;

		// In `Strict` mode a malformed child fails the whole parse; otherwise the
		// container keeps what was read so far and records where things went wrong.
		macro_rules! stop {
			($error:expr) => {{
				let error = $error;
				if parse_mode == ParsingMode::Strict {
					return Err(error);
				}

				log::warn!("Stopping parse of {container_name}: {error}");
				interruption = Some(ParseInterruption {
					last_good_position: last_good,
					error,
				});
				break
			}};
		}

		while segment.remaining() > 0 {
			// The EBML header may have raised these mid-loop
			let max_id_length = self.options.max_id_length;
			let max_size_length = self.options.max_size_length;

			let id = match ElementId::parse(&mut segment, max_id_length) {
				Ok((id, _)) => id,
				Err(error) => stop!(error),
			};

			if is_root && children.is_empty() && id != ids::EBML {
				err!(MissingHeader);
			}

			if !is_root && id == ids::EBML {
				stop!(EbmlError::new(ErrorKind::MisplacedHeader));
			}

			let (size, size_width) = match VInt::<u64>::parse(&mut segment, max_size_length) {
				Ok(parsed) => parsed,
				Err(error) => stop!(error),
			};

			let mut child_chain = chain.clone();
			child_chain.push(id);

			let size_unknown = size.is_unknown();
			let payload_len = if size_unknown {
				// Scan forward on an independent cursor; the real cursor stays put
				let mut scan = segment.clone();
				scan.set_position(segment.position());

				match self.resolve_unknown_size(&mut scan, &child_chain, ctx) {
					Ok(resolved) => resolved,
					Err(error) => stop!(error),
				}
			} else {
				size.value()
			};

			if payload_len > segment.remaining() {
				stop!(EbmlError::new(ErrorKind::TruncatedElement { id: id.value() }));
			}

			let schema_element = ctx.resolve(id.value());
			let (name, data_type) = match schema_element {
				Some(schema_element) => (schema_element.name(), schema_element.data_type()),
				None => {
					log::debug!("No schema entry for ID {id:X}, treating it as opaque binary");
					("(unknown)", ElementDataType::Binary)
				},
			};

			if let Some(schema_element) = schema_element {
				if !check_parent(&chain, schema_element) {
					log::warn!("Element {name} ({id:X}) appears outside its declared path");
				}

				if let Some(constraint) = schema_element.length {
					if !constraint.permits(payload_len) {
						let error = EbmlError::new(ErrorKind::BadElementLength {
							id: id.value(),
							length: payload_len,
						});
						if parse_mode == ParsingMode::Strict {
							return Err(error);
						}

						log::warn!("{error}");
					}
				}

				if let Some(max) = schema_element.max_occurs {
					let occurrences = children
						.iter()
						.filter(|child: &&ElementRef| self.nodes[child.0].id == id)
						.count() as u64;
					if occurrences >= max {
						log::warn!(
							"Element {name} ({id:X}) occurs more than {max} time(s) in \
							 {container_name}"
						);
					}
				}
			}

			let child_segment = segment.slice(payload_len);
			let kind = if data_type == ElementDataType::Master {
				ElementKind::Master(MasterData {
					segment: Some(child_segment),
					children: None,
					cached_length: None,
					dirty: false,
					interruption: None,
				})
			} else {
				ElementKind::Leaf(LeafState::Encoded {
					segment: child_segment,
					value: None,
				})
			};

			let child_ref = ElementRef(self.nodes.len());
			self.nodes.push(Element {
				id,
				parent: Some(elem),
				id_chain: child_chain,
				name,
				data_type,
				size_width,
				size_unknown,
				detached: false,
				kind,
			});
			children.push(child_ref);

			// The header decides which schema every later sibling resolves against
			if id == ids::EBML {
				self.parse_header(child_ref, ctx)?;
			}

			last_good = segment.position();
		}

		if is_root && children.is_empty() && interruption.is_none() {
			err!(MissingHeader);
		}

		if let ElementKind::Master(master) = &mut self.nodes[elem.0].kind {
			master.children = Some(children);
			master.interruption = interruption;
		}

		Ok(())
	}

	/// Eagerly parse the EBML header and activate the schema its DocType names
	fn parse_header(&mut self, header: ElementRef, ctx: &mut ParseContext<'_>) -> Result<()> {
		self.ensure_children(header, ctx)?;

		let ElementKind::Master(master) = &self.nodes[header.0].kind else {
			err!(NotAContainer);
		};

		let children = master.children.clone().unwrap_or_default();
		for child in children {
			let id = self.nodes[child.0].id.value();
			match id {
				ids::DOC_TYPE => {
					if let ElementValue::String(doc_type) = self.value(child)? {
						let doc_type = doc_type.clone();
						if !ctx.schemas.supports(&doc_type) {
							err!(UnknownDocType(doc_type));
						}

						log::debug!("Activating schema for DocType \"{doc_type}\"");
						*ctx.doc_type = Some(doc_type);
					}
				},
				ids::MAX_ID_LENGTH => {
					if let ElementValue::UnsignedInt(length) = *self.value(child)? {
						if (1..=8).contains(&length) {
							self.options.max_id_length = length as u8;
						} else {
							log::warn!("Unsupported EBMLMaxIDLength of {length}, keeping {}", self.options.max_id_length);
						}
					}
				},
				ids::MAX_SIZE_LENGTH => {
					if let ElementValue::UnsignedInt(length) = *self.value(child)? {
						if (1..=8).contains(&length) {
							self.options.max_size_length = length as u8;
						} else {
							log::warn!("Unsupported EBMLMaxSizeLength of {length}, keeping {}", self.options.max_size_length);
						}
					}
				},
				_ => {},
			}
		}

		Ok(())
	}

	/// Compute the true payload length of an unknown-sized element
	///
	/// `chain` is the unknown-sized element's own id-chain. The scan walks child
	/// headers forward from `scan`'s position: an ID that resolves to a valid
	/// direct child is skipped over, anything else (an ancestor's sibling, an ID
	/// with no valid placement, a malformed header) ends the element just before
	/// it. Running off the end of the scan window means the element extends to
	/// the end of its container.
	///
	/// Nested unknown sizes recurse; each level consumes exactly the bytes that
	/// belong to it.
	fn resolve_unknown_size(
		&self,
		scan: &mut SegmentSource,
		chain: &[ElementId],
		ctx: &ParseContext<'_>,
	) -> Result<u64> {
		if chain.len() > usize::from(self.options.max_depth) {
			err!(MaxDepthReached);
		}

		let start = scan.position();

		while scan.remaining() > 0 {
			let before = scan.position();

			let Ok((id, _)) = ElementId::parse(scan, self.options.max_id_length) else {
				scan.set_position(before);
				break;
			};
			let Ok((size, _)) = VInt::<u64>::parse(scan, self.options.max_size_length) else {
				scan.set_position(before);
				break;
			};

			let matched = ctx
				.resolve(id.value())
				.and_then(|schema_element| check_parents(chain, schema_element));

			if matched != Some(chain.len()) {
				scan.set_position(before);
				break;
			}

			if size.is_unknown() {
				let mut child_chain = chain.to_vec();
				child_chain.push(id);
				self.resolve_unknown_size(scan, &child_chain, ctx)?;
			} else {
				let skip = std::cmp::min(size.value(), scan.remaining());
				scan.set_position(scan.position() + skip);
			}
		}

		Ok(scan.position() - start)
	}
}

enum PayloadPlan {
	Verbatim(SegmentSource),
	LeafBytes,
	Children(Vec<ElementRef>),
}

impl ElementTree {
	/// Serialize the whole tree
	///
	/// The virtual root contributes no header of its own; its children are
	/// written back to back. If nothing in the tree was mutated, the output is
	/// byte for byte the original input.
	pub fn write_to<W: Write>(&mut self, writer: &mut W) -> Result<()> {
		let root = self.root();
		self.write_element(root, writer)
	}

	/// Serialize one element and its subtree
	pub(crate) fn write_element<W: Write>(
		&mut self,
		elem: ElementRef,
		writer: &mut W,
	) -> Result<()> {
		if elem != self.root() {
			self.write_header(elem, writer)?;
		}

		let plan = match &self.node(elem)?.kind {
			ElementKind::Leaf(LeafState::Encoded { segment, .. }) => {
				PayloadPlan::Verbatim(segment.clone())
			},
			ElementKind::Leaf(LeafState::Decoded { .. }) => PayloadPlan::LeafBytes,
			ElementKind::Master(master) => match (&master.segment, master.dirty) {
				(Some(segment), false) => PayloadPlan::Verbatim(segment.clone()),
				_ => PayloadPlan::Children(master.children.clone().unwrap_or_default()),
			},
		};

		match plan {
			PayloadPlan::Verbatim(mut segment) => {
				segment.copy_to(writer)?;
			},
			PayloadPlan::LeafBytes => {
				let bytes = self.encoded_leaf_bytes(elem)?;
				writer.write_all(bytes)?;
			},
			PayloadPlan::Children(children) => {
				for child in children {
					self.write_element(child, writer)?;
				}
			},
		}

		Ok(())
	}

	/// Write an element's ID and size
	///
	/// A clean element re-emits its size at the parsed width. A mutated one gets
	/// a freshly derived minimal size, except that an originally unknown-sized
	/// container keeps its sentinel (at the parsed width) even after edits
	/// below it; its extent is delimited by context, not by the size field, so
	/// preserving the sentinel keeps the byte layout stable.
	fn write_header<W: Write>(&mut self, elem: ElementRef, writer: &mut W) -> Result<()> {
		let dirty = self.is_dirty(elem)?;
		let payload_len = self.payload_length(elem)?;

		let node = self.node(elem)?;
		let (id, size_width, size_unknown) = (node.id, node.size_width, node.size_unknown);

		id.write_to(None, writer)?;

		if size_unknown && size_width > 0 {
			VInt::<u64>::write_to(0, Some(size_width), None, true, writer)?;
		} else if !dirty && size_width > 0 {
			VInt::<u64>::write_to(payload_len, Some(size_width), None, false, writer)?;
		} else {
			VInt::<u64>::write_to(payload_len, None, None, false, writer)?;
		}

		Ok(())
	}
}
