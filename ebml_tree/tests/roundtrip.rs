use ebml_tree::error::ErrorKind;
use ebml_tree::{Document, EbmlDate, ElementRef, ElementValue, ParseOptions};

const EBML_ID: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];
const SEGMENT_ID: [u8; 4] = [0x18, 0x53, 0x80, 0x67];
const INFO_ID: [u8; 4] = [0x15, 0x49, 0xA9, 0x66];
const TIMESTAMP_SCALE_ID: [u8; 3] = [0x2A, 0xD7, 0xB1];
const TAGS_ID: [u8; 4] = [0x12, 0x54, 0xC3, 0x67];
const CLUSTER_ID: [u8; 4] = [0x1F, 0x43, 0xB6, 0x75];

fn el(id: &[u8], payload: &[u8]) -> Vec<u8> {
	assert!(payload.len() < 127);
	let mut out = id.to_vec();
	out.push(0x80 | payload.len() as u8);
	out.extend_from_slice(payload);
	out
}

/// Like [`el`], but with the size VINT emitted at a fixed (possibly over-long) width
fn el_wide(id: &[u8], payload: &[u8], size_octets: u32) -> Vec<u8> {
	let mut out = id.to_vec();
	let size = payload.len() as u64 | 1u64 << (7 * size_octets);
	out.extend_from_slice(&size.to_be_bytes()[8 - size_octets as usize..]);
	out.extend_from_slice(payload);
	out
}

fn matroska_doc(segment_payload: &[u8]) -> Vec<u8> {
	let mut out = el(&EBML_ID, &el(&[0x42, 0x82], b"matroska"));
	out.extend(el(&SEGMENT_ID, segment_payload));
	out
}

/// Materialize every element and decode every leaf
fn walk(doc: &mut Document, elem: ElementRef) {
	if doc.is_master(elem).unwrap() {
		for child in doc.children(elem).unwrap() {
			walk(doc, child);
		}
	} else {
		doc.value(elem).unwrap();
	}
}

#[test_log::test]
fn untouched_document_is_byte_identical() {
	// A Void with its size over-encoded in 2 octets; minimal re-derivation would
	// shrink it, byte-exact reproduction must not
	let mut segment_payload = el_wide(&[0xEC], &[0xAA, 0xBB, 0xCC], 2);
	segment_payload.extend(el(
		&INFO_ID,
		&el(&TIMESTAMP_SCALE_ID, &[0x0F, 0x42, 0x40]),
	));
	let bytes = matroska_doc(&segment_payload);

	let mut doc = Document::read_from_buf(bytes.clone(), ParseOptions::new()).unwrap();
	let root = doc.root();
	walk(&mut doc, root);

	let mut out = Vec::new();
	doc.write_to(&mut out).unwrap();
	assert_eq!(out, bytes);
}

#[test_log::test]
fn unknown_size_sentinels_round_trip() {
	// An unknown-sized Segment holding an unknown-sized Cluster (2-octet
	// sentinel) and an Info; both sentinels must come back out as they went in
	let mut bytes = el(&EBML_ID, &el(&[0x42, 0x82], b"matroska"));
	bytes.extend_from_slice(&SEGMENT_ID);
	bytes.push(0xFF);
	bytes.extend_from_slice(&CLUSTER_ID);
	bytes.extend_from_slice(&[0x7F, 0xFF]);
	bytes.extend(el(&[0xE7], &[0x00]));
	bytes.extend(el(
		&INFO_ID,
		&el(&TIMESTAMP_SCALE_ID, &[0x0F, 0x42, 0x40]),
	));

	let mut doc = Document::read_from_buf(bytes.clone(), ParseOptions::new()).unwrap();
	let root = doc.root();
	walk(&mut doc, root);

	// The Cluster's resolved extent is just its Timestamp; the Info is the
	// Segment's child, not the Cluster's
	let segment = doc.children(root).unwrap()[1];
	let segment_children = doc.children(segment).unwrap();
	assert_eq!(segment_children.len(), 2);
	assert_eq!(doc.name(segment_children[0]).unwrap(), "Cluster");
	assert_eq!(doc.name(segment_children[1]).unwrap(), "Info");

	let mut out = Vec::new();
	doc.write_to(&mut out).unwrap();
	assert_eq!(out, bytes);

	// A same-width edit inside the Info dirties the Segment, so serialization
	// recurses instead of copying; both sentinels still have to be re-emitted
	// at their parsed widths
	let scale = doc.children(segment_children[1]).unwrap()[0];
	doc.set_value(scale, ElementValue::UnsignedInt(0x0F_4241))
		.unwrap();

	let mut expected = bytes;
	let last = expected.len() - 1;
	expected[last] = 0x41;

	let mut out = Vec::new();
	doc.write_to(&mut out).unwrap();
	assert_eq!(out, expected);
}

#[test_log::test]
fn mixed_size_widths_round_trip() {
	// Three siblings: a minimal size, a 4-octet over-long size, and the
	// unknown-size sentinel
	let mut segment_payload = el(
		&INFO_ID,
		&el(&TIMESTAMP_SCALE_ID, &[0x0F, 0x42, 0x40]),
	);
	segment_payload.extend(el_wide(&TAGS_ID, &[], 4));
	segment_payload.extend_from_slice(&CLUSTER_ID);
	segment_payload.push(0xFF);
	segment_payload.extend(el(&[0xE7], &[0x00]));
	let bytes = matroska_doc(&segment_payload);

	let mut doc = Document::read_from_buf(bytes.clone(), ParseOptions::new()).unwrap();
	let root = doc.root();
	walk(&mut doc, root);

	let mut out = Vec::new();
	doc.write_to(&mut out).unwrap();
	assert_eq!(out, bytes);

	// Dirty the first sibling without changing any lengths; the over-long Tags
	// size and the Cluster sentinel are re-emitted, not minimized
	let segment = doc.children(root).unwrap()[1];
	let info = doc.children(segment).unwrap()[0];
	let scale = doc.children(info).unwrap()[0];
	doc.set_value(scale, ElementValue::UnsignedInt(0x0F_4241))
		.unwrap();

	let mut expected = bytes;
	let scale_payload = expected.len() - 8 /* Cluster */ - 8 /* Tags */ - 1;
	expected[scale_payload] = 0x41;

	let mut out = Vec::new();
	doc.write_to(&mut out).unwrap();
	assert_eq!(out, expected);
}

#[test_log::test]
fn edits_reencode_minimally_and_leave_siblings_alone() {
	let info = el(
		&INFO_ID,
		&el(&TIMESTAMP_SCALE_ID, &[0x0F, 0x42, 0x40]),
	);
	let tracks = el(
		&[0x16, 0x54, 0xAE, 0x6B],
		&el(&[0xAE], &el(&[0xD7], &[0x01])),
	);

	let mut segment_payload = info;
	segment_payload.extend_from_slice(&tracks);
	let bytes = matroska_doc(&segment_payload);

	let mut doc = Document::read_from_buf(bytes, ParseOptions::new()).unwrap();
	let root = doc.root();
	let segment = doc.children(root).unwrap()[1];
	let info = doc.children(segment).unwrap()[0];
	let scale = doc.children(info).unwrap()[0];

	// 100 fits in one octet where 1_000_000 took three
	doc.set_value(scale, ElementValue::UnsignedInt(100)).unwrap();

	let mut expected_segment_payload = el(&INFO_ID, &el(&TIMESTAMP_SCALE_ID, &[0x64]));
	expected_segment_payload.extend_from_slice(&tracks);
	let expected = matroska_doc(&expected_segment_payload);

	let mut out = Vec::new();
	doc.write_to(&mut out).unwrap();
	assert_eq!(out, expected);
}

#[test_log::test]
fn insert_and_remove_round_trip() {
	let bytes = matroska_doc(&el(
		&INFO_ID,
		&el(&TIMESTAMP_SCALE_ID, &[0x0F, 0x42, 0x40]),
	));

	let mut doc = Document::read_from_buf(bytes.clone(), ParseOptions::new()).unwrap();
	let root = doc.root();
	let segment = doc.children(root).unwrap()[1];
	let info = doc.children(segment).unwrap()[0];
	doc.children(info).unwrap();

	// Append \Segment\Info\DateUTC
	let date = doc
		.insert_leaf(info, 1, 0x4461, ElementValue::Date(EbmlDate::from_nanos(0)))
		.unwrap();
	assert_eq!(doc.name(date).unwrap(), "DateUTC");

	let mut expected_info_payload = el(&TIMESTAMP_SCALE_ID, &[0x0F, 0x42, 0x40]);
	expected_info_payload.extend(el(&[0x44, 0x61], &[0; 8]));
	let expected = matroska_doc(&el(&INFO_ID, &expected_info_payload));

	let mut out = Vec::new();
	doc.write_to(&mut out).unwrap();
	assert_eq!(out, expected);

	// Removing it again restores the original bytes (all sizes were minimal)
	doc.remove(date).unwrap();
	let mut out = Vec::new();
	doc.write_to(&mut out).unwrap();
	assert_eq!(out, bytes);

	// The handle is now stale
	assert!(matches!(
		doc.value(date).unwrap_err().kind(),
		ErrorKind::DetachedElement
	));
}

#[test_log::test]
fn insert_refuses_unencodable_ids() {
	let bytes = matroska_doc(&el(&INFO_ID, &[]));

	let mut doc = Document::read_from_buf(bytes, ParseOptions::new()).unwrap();
	let root = doc.root();
	let segment = doc.children(root).unwrap()[1];
	let info = doc.children(segment).unwrap()[0];
	doc.children(info).unwrap();

	// Zero has no marker bit, 0x42 is below the 1-octet floor, and u64::MAX
	// would need more than 8 octets
	for id in [0, 0x42, u64::MAX] {
		assert!(matches!(
			doc.insert_leaf(info, 0, id, ElementValue::Binary(Vec::new()))
				.unwrap_err()
				.kind(),
			ErrorKind::BadVintSize
		));
	}

	// The refused inserts left nothing behind
	assert!(doc.children(info).unwrap().is_empty());
}

#[test_log::test]
fn value_operations_on_containers_are_refused() {
	let bytes = matroska_doc(&el(
		&INFO_ID,
		&el(&TIMESTAMP_SCALE_ID, &[0x0F, 0x42, 0x40]),
	));

	let mut doc = Document::read_from_buf(bytes, ParseOptions::new()).unwrap();
	let root = doc.root();
	let segment = doc.children(root).unwrap()[1];
	let info = doc.children(segment).unwrap()[0];

	assert!(matches!(
		doc.set_value(info, ElementValue::UnsignedInt(1))
			.unwrap_err()
			.kind(),
		ErrorKind::NotALeaf
	));

	// Inserting a leaf under a master ID is refused the same way
	assert!(matches!(
		doc.insert_leaf(segment, 0, 0x1254_C367, ElementValue::Binary(Vec::new()))
			.unwrap_err()
			.kind(),
		ErrorKind::NotALeaf
	));
}

#[test_log::test]
fn wrongly_typed_values_are_refused() {
	let bytes = matroska_doc(&el(
		&INFO_ID,
		&el(&TIMESTAMP_SCALE_ID, &[0x0F, 0x42, 0x40]),
	));

	let mut doc = Document::read_from_buf(bytes, ParseOptions::new()).unwrap();
	let root = doc.root();
	let segment = doc.children(root).unwrap()[1];
	let info = doc.children(segment).unwrap()[0];
	let scale = doc.children(info).unwrap()[0];

	assert!(matches!(
		doc.set_value(scale, ElementValue::Float(1.0))
			.unwrap_err()
			.kind(),
		ErrorKind::ValueTypeMismatch { .. }
	));
	assert!(matches!(
		doc.insert_leaf(info, 0, 0x4461, ElementValue::UnsignedInt(5))
			.unwrap_err()
			.kind(),
		ErrorKind::ValueTypeMismatch { .. }
	));

	// Refused mutations leave the document untouched and fully round-trippable
	let mut out = Vec::new();
	doc.write_to(&mut out).unwrap();
	assert_eq!(doc.value(scale).unwrap(), &ElementValue::UnsignedInt(1_000_000));
}
