//! SeekHead index maintenance
//!
//! A Matroska SeekHead lists the byte offsets, relative to the Segment payload
//! start, of the Segment's top-level landmarks (Info, Tracks, Chapters, Cues,
//! Attachments, Tags). Any edit that changes an element's encoded length shifts
//! everything after it, so this engine recomputes the offsets after every
//! mutation, rewrites the SeekPosition entries that went stale, and creates
//! entries for landmarks the SeekHead does not mention yet.
//!
//! Entries pointing at elements that are no longer present are left alone;
//! removing them is an editorial decision the engine leaves to the caller.

use super::DocumentEngine;
use crate::document::Document;
use crate::element::{ElementRef, ElementValue};
use crate::error::Result;
use crate::schema::{ids, ElementDataType};
use crate::vint::ElementId;

use std::collections::{HashMap, HashSet};

/// The top-level Segment children a SeekHead conventionally points at
const INDEXABLE: [u64; 6] = [
	ids::INFO,
	ids::TRACKS,
	ids::CHAPTERS,
	ids::CUES,
	ids::ATTACHMENTS,
	ids::TAGS,
];

/// Keeps SeekHead offsets consistent with the elements they point at
pub struct SeekIndexEngine;

impl DocumentEngine for SeekIndexEngine {
	fn name(&self) -> &'static str {
		"seek index"
	}

	fn applies_to(&self, doc_type: Option<&str>) -> bool {
		matches!(doc_type, Some("matroska" | "webm"))
	}

	fn on_change(&mut self, document: &mut Document, _changed: ElementRef) -> Result<()> {
		let root = document.root();
		let Some(segment) = find_top_level(document, root, ids::SEGMENT)? else {
			return Ok(());
		};

		// If the Segment's children were never parsed, nothing inside it has
		// moved and the index is still accurate
		let Some(seek_head) = find_top_level(document, segment, ids::SEEK_HEAD)? else {
			return Ok(());
		};

		// Rewriting a SeekPosition or appending a Seek entry can change the
		// SeekHead's own length and shift everything after it, so iterate to a
		// fixed point. Two or three passes settle it in practice; the cap is
		// there for pathological inputs.
		for _ in 0..4 {
			let offsets = collect_offsets(document, segment)?;
			let (changed, indexed) = update_entries(document, seek_head, &offsets)?;
			let created = create_missing_entries(document, seek_head, &offsets, &indexed)?;
			if !changed && !created {
				break;
			}
		}

		Ok(())
	}
}

/// Find the first materialized child of `parent` with the given ID
fn find_top_level(
	document: &mut Document,
	parent: ElementRef,
	id: u64,
) -> Result<Option<ElementRef>> {
	let tree = document.tree_mut();
	let Some(children) = tree.materialized_children(parent)? else {
		return Ok(None);
	};

	for child in children {
		if tree.id(child)? == id {
			return Ok(Some(child));
		}
	}

	Ok(None)
}

/// Current offsets of the indexable elements, relative to the Segment payload start
fn collect_offsets(document: &mut Document, segment: ElementRef) -> Result<HashMap<u64, u64>> {
	let tree = document.tree_mut();
	let children = tree.materialized_children(segment)?.unwrap_or_default();

	let mut offsets = HashMap::new();
	let mut offset = 0u64;
	for child in children {
		let id = tree.id(child)?;
		if INDEXABLE.contains(&id) {
			// First occurrence wins, matching what players expect
			offsets.entry(id).or_insert(offset);
		}

		offset += tree.total_length(child)?;
	}

	Ok(offsets)
}

/// Rewrite stale SeekPosition values
///
/// Returns whether anything changed, plus the set of target IDs the SeekHead
/// already carries an entry for.
fn update_entries(
	document: &mut Document,
	seek_head: ElementRef,
	offsets: &HashMap<u64, u64>,
) -> Result<(bool, HashSet<u64>)> {
	let mut changed = false;
	let mut indexed = HashSet::new();

	for seek in document.children(seek_head)? {
		if document.id(seek)? != ids::SEEK {
			continue;
		}

		let mut target_id = None;
		let mut position_elem = None;
		for entry in document.children(seek)? {
			match document.id(entry)? {
				ids::SEEK_ID => {
					if let ElementValue::Binary(bytes) = document.value(entry)? {
						match ElementId::parse(&mut &bytes[..], 8) {
							Ok((id, _)) => target_id = Some(id.value()),
							Err(error) => log::warn!("Unreadable SeekID: {error}"),
						}
					}
				},
				ids::SEEK_POSITION => position_elem = Some(entry),
				_ => {},
			}
		}

		let Some(target_id) = target_id else {
			continue;
		};
		indexed.insert(target_id);

		let Some(position_elem) = position_elem else {
			continue;
		};

		let Some(&desired) = offsets.get(&target_id) else {
			log::debug!("SeekHead entry points at {target_id:#X}, which is not present");
			continue;
		};

		let current = match document.value(position_elem)? {
			ElementValue::UnsignedInt(value) => Some(*value),
			_ => None,
		};

		if current != Some(desired) {
			document
				.tree_mut()
				.set_value(position_elem, ElementValue::UnsignedInt(desired))?;
			changed = true;
		}
	}

	Ok((changed, indexed))
}

/// Append a Seek entry for every indexable element the SeekHead does not
/// mention yet; returns whether any were created
///
/// The offsets written here may already be stale (appending entries grows the
/// SeekHead), so the caller's fixed-point loop corrects them on its next pass.
fn create_missing_entries(
	document: &mut Document,
	seek_head: ElementRef,
	offsets: &HashMap<u64, u64>,
	indexed: &HashSet<u64>,
) -> Result<bool> {
	let mut created = false;

	for target_id in INDEXABLE {
		let Some(&offset) = offsets.get(&target_id) else {
			continue;
		};
		if indexed.contains(&target_id) {
			continue;
		}

		log::debug!("Creating a SeekHead entry for {target_id:#X}");

		let tree = document.tree_mut();
		let index = tree
			.materialized_children(seek_head)?
			.map_or(0, |children| children.len());
		let seek = tree.insert_master(seek_head, index, ElementId(ids::SEEK), "Seek")?;
		tree.insert_leaf(
			seek,
			0,
			ElementId(ids::SEEK_ID),
			"SeekID",
			ElementDataType::Binary,
			ElementValue::Binary(ElementId(target_id).as_bytes(None)?),
		)?;
		tree.insert_leaf(
			seek,
			1,
			ElementId(ids::SEEK_POSITION),
			"SeekPosition",
			ElementDataType::UnsignedInt,
			ElementValue::UnsignedInt(offset),
		)?;
		created = true;
	}

	Ok(created)
}
