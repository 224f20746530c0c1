//! CRC-32 checksum maintenance
//!
//! Matroska containers may carry a CRC-32 element (ID `0xBF`) covering every
//! sibling byte after it within the same container. Editing anything below such
//! a container invalidates the stored checksum; this engine recomputes it for
//! every affected container, innermost first, so an outer checksum always
//! covers the refreshed bytes of an inner one.
//!
//! The polynomial is the everyday reflected `0xEDB88320` (ISO-HDLC), and the
//! value is stored little-endian, per the Matroska spec.

use super::DocumentEngine;
use crate::document::Document;
use crate::element::{ElementRef, ElementValue};
use crate::error::Result;
use crate::schema::ids;
use crate::util::crc::crc32;

/// Keeps CRC-32 elements consistent with the bytes they cover
pub struct ChecksumEngine;

impl DocumentEngine for ChecksumEngine {
	fn name(&self) -> &'static str {
		"CRC-32"
	}

	fn applies_to(&self, _doc_type: Option<&str>) -> bool {
		// CRC-32 is a base EBML global, not a DocType feature
		true
	}

	fn on_change(&mut self, document: &mut Document, _changed: ElementRef) -> Result<()> {
		// Earlier engines may have touched elements far from the mutation (the
		// seek index does), so cover every dirty container, not just the
		// mutated element's ancestors
		let root = document.root();
		refresh_subtree(document, root)
	}
}

/// Refresh every dirty container below (and including) `elem`, children first,
/// so an outer checksum covers the refreshed bytes of an inner one
fn refresh_subtree(document: &mut Document, elem: ElementRef) -> Result<()> {
	let tree = document.tree_mut();
	if !tree.is_dirty(elem)? {
		// A clean subtree's bytes have not moved, checksums included
		return Ok(());
	}

	let Some(children) = tree.materialized_children(elem)? else {
		return Ok(());
	};

	for child in children {
		if document.is_master(child)? {
			refresh_subtree(document, child)?;
		}
	}

	if elem != document.root() {
		refresh_container(document, elem)?;
	}

	Ok(())
}

/// Recompute `container`'s CRC-32 child, if it has one
fn refresh_container(document: &mut Document, container: ElementRef) -> Result<()> {
	let tree = document.tree_mut();

	let Some(children) = tree.materialized_children(container)? else {
		// Never parsed, so nothing below it can have changed
		return Ok(());
	};

	let Some(crc) = find_crc(tree, &children)? else {
		return Ok(());
	};

	// The checksum covers every sibling byte except the CRC element itself
	let mut covered = Vec::new();
	for child in &children {
		if *child != crc {
			tree.write_element(*child, &mut covered)?;
		}
	}

	let checksum = crc32(&covered).to_le_bytes().to_vec();
	if matches!(tree.value(crc)?, ElementValue::Binary(existing) if *existing == checksum) {
		return Ok(());
	}

	log::debug!(
		"Refreshing CRC-32 under {}",
		tree.name(container).unwrap_or("(unknown)")
	);
	tree.set_value(crc, ElementValue::Binary(checksum))
}

fn find_crc(
	tree: &crate::element::ElementTree,
	children: &[ElementRef],
) -> Result<Option<ElementRef>> {
	for child in children {
		if tree.id(*child)? == ids::CRC32 {
			return Ok(Some(*child));
		}
	}

	Ok(None)
}

#[cfg(test)]
mod tests {
	use crate::config::ParseOptions;
	use crate::document::Document;
	use crate::element::ElementValue;
	use crate::util::crc::crc32;

	fn el(id: &[u8], payload: &[u8]) -> Vec<u8> {
		assert!(payload.len() < 127);
		let mut out = id.to_vec();
		out.push(0x80 | payload.len() as u8);
		out.extend_from_slice(payload);
		out
	}

	fn matroska_doc(segment_payload: &[u8]) -> Vec<u8> {
		let mut out = el(&[0x1A, 0x45, 0xDF, 0xA3], &el(&[0x42, 0x82], b"matroska"));
		out.extend(el(&[0x18, 0x53, 0x80, 0x67], segment_payload));
		out
	}

	#[test_log::test]
	fn editing_under_a_crc_refreshes_it() {
		// \Segment\Info holding a stale CRC-32 and a TimestampScale
		let mut info_payload = el(&[0xBF], &[0xDE, 0xAD, 0xBE, 0xEF]);
		info_payload.extend(el(&[0x2A, 0xD7, 0xB1], &[0x0F, 0x42, 0x40]));
		let bytes = matroska_doc(&el(&[0x15, 0x49, 0xA9, 0x66], &info_payload));

		let mut doc = Document::read_from_buf(bytes, ParseOptions::new()).unwrap();
		let root = doc.root();
		let segment = doc.children(root).unwrap()[1];
		let info = doc.children(segment).unwrap()[0];
		let info_children = doc.children(info).unwrap();
		let (crc, scale) = (info_children[0], info_children[1]);

		doc.set_value(scale, ElementValue::UnsignedInt(500_000))
			.unwrap();

		// The edited TimestampScale re-encodes minimally; the checksum covers
		// exactly that serialization
		let covered = el(&[0x2A, 0xD7, 0xB1], &[0x07, 0xA1, 0x20]);
		let expected = crc32(&covered).to_le_bytes().to_vec();
		assert_eq!(doc.value(crc).unwrap(), &ElementValue::Binary(expected));
	}

	#[test_log::test]
	fn nested_checksums_refresh_innermost_first() {
		// \Segment\Tags\Tag and its SimpleTag each carry a CRC-32; editing the
		// TagName rewrites both, the outer one covering the refreshed inner one
		let mut simple_tag_payload = el(&[0xBF], &[0; 4]);
		simple_tag_payload.extend(el(&[0x45, 0xA3], b"x"));
		let simple_tag = el(&[0x67, 0xC8], &simple_tag_payload);

		let mut tag_payload = el(&[0xBF], &[0; 4]);
		tag_payload.extend_from_slice(&simple_tag);
		let tags = el(&[0x12, 0x54, 0xC3, 0x67], &el(&[0x73, 0x73], &tag_payload));
		let bytes = matroska_doc(&tags);

		let mut doc = Document::read_from_buf(bytes, ParseOptions::new()).unwrap();
		let root = doc.root();
		let segment = doc.children(root).unwrap()[1];
		let tags = doc.children(segment).unwrap()[0];
		let tag = doc.children(tags).unwrap()[0];
		let tag_children = doc.children(tag).unwrap();
		let (outer_crc, simple_tag) = (tag_children[0], tag_children[1]);
		let simple_tag_children = doc.children(simple_tag).unwrap();
		let (inner_crc, tag_name) = (simple_tag_children[0], simple_tag_children[1]);

		doc.set_value(tag_name, ElementValue::Utf8(String::from("hello")))
			.unwrap();

		// The inner checksum covers the SimpleTag's other children
		let covered_inner = el(&[0x45, 0xA3], b"hello");
		let expected_inner = crc32(&covered_inner).to_le_bytes().to_vec();
		assert_eq!(
			doc.value(inner_crc).unwrap(),
			&ElementValue::Binary(expected_inner.clone())
		);

		// The outer one covers the serialized SimpleTag, refreshed CRC included
		let mut simple_tag_payload = el(&[0xBF], &expected_inner);
		simple_tag_payload.extend_from_slice(&covered_inner);
		let covered_outer = el(&[0x67, 0xC8], &simple_tag_payload);
		let expected_outer = crc32(&covered_outer).to_le_bytes().to_vec();
		assert_eq!(
			doc.value(outer_crc).unwrap(),
			&ElementValue::Binary(expected_outer)
		);
	}

	#[test_log::test]
	fn untouched_checksums_stay_stale() {
		// A wrong checksum in a container nothing was edited under is preserved
		let mut info_payload = el(&[0xBF], &[0xDE, 0xAD, 0xBE, 0xEF]);
		info_payload.extend(el(&[0x2A, 0xD7, 0xB1], &[0x0F, 0x42, 0x40]));
		let info = el(&[0x15, 0x49, 0xA9, 0x66], &info_payload);

		let mut segment_payload = info;
		segment_payload.extend(el(&[0x12, 0x54, 0xC3, 0x67], &[]));
		let bytes = matroska_doc(&segment_payload);

		let mut doc = Document::read_from_buf(bytes, ParseOptions::new()).unwrap();
		let root = doc.root();
		let segment = doc.children(root).unwrap()[1];

		// Edit the sibling Tags container, not Info
		let tags = doc.children(segment).unwrap()[1];
		doc.children(tags).unwrap();
		doc.insert_master(tags, 0, 0x7373).unwrap();

		let info = doc.children(segment).unwrap()[0];
		let crc = doc.children(info).unwrap()[0];
		assert_eq!(
			doc.value(crc).unwrap(),
			&ElementValue::Binary(vec![0xDE, 0xAD, 0xBE, 0xEF])
		);
	}
}
