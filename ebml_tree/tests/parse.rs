use ebml_tree::error::ErrorKind;
use ebml_tree::{Document, ElementValue, ParseOptions, ParsingMode};

const EBML_ID: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];
const SEGMENT_ID: [u8; 4] = [0x18, 0x53, 0x80, 0x67];
const INFO_ID: [u8; 4] = [0x15, 0x49, 0xA9, 0x66];
const TIMESTAMP_SCALE_ID: [u8; 3] = [0x2A, 0xD7, 0xB1];

fn el(id: &[u8], payload: &[u8]) -> Vec<u8> {
	assert!(payload.len() < 127);
	let mut out = id.to_vec();
	out.push(0x80 | payload.len() as u8);
	out.extend_from_slice(payload);
	out
}

fn header(doc_type: &str) -> Vec<u8> {
	el(&EBML_ID, &el(&[0x42, 0x82], doc_type.as_bytes()))
}

fn matroska_doc(segment_payload: &[u8]) -> Vec<u8> {
	let mut out = header("matroska");
	out.extend(el(&SEGMENT_ID, segment_payload));
	out
}

#[test_log::test]
fn parses_a_minimal_document() {
	let info = el(&INFO_ID, &el(&TIMESTAMP_SCALE_ID, &[0x0F, 0x42, 0x40]));
	let bytes = matroska_doc(&info);

	let mut doc = Document::read_from_buf(bytes, ParseOptions::new()).unwrap();
	assert_eq!(doc.doc_type(), Some("matroska"));
	assert_eq!(doc.header().doc_type(), "matroska");
	assert_eq!(doc.header().version(), 1);
	assert_eq!(doc.header().max_id_length(), 4);

	let root = doc.root();
	let top_level = doc.children(root).unwrap();
	assert_eq!(top_level.len(), 2);
	assert_eq!(doc.name(top_level[0]).unwrap(), "EBML");
	assert_eq!(doc.name(top_level[1]).unwrap(), "Segment");

	let info = doc.children(top_level[1]).unwrap()[0];
	let scale = doc.children(info).unwrap()[0];
	assert_eq!(doc.name(scale).unwrap(), "TimestampScale");
	assert_eq!(
		doc.value(scale).unwrap(),
		&ElementValue::UnsignedInt(1_000_000)
	);
}

#[test_log::test]
fn rejects_input_without_a_header() {
	let bytes = el(&SEGMENT_ID, &[]);
	let error = Document::read_from_buf(bytes, ParseOptions::new()).unwrap_err();
	assert!(matches!(error.kind(), ErrorKind::MissingHeader));
}

#[test_log::test]
fn rejects_an_unknown_doc_type() {
	let mut bytes = header("bogus");
	bytes.extend(el(&SEGMENT_ID, &[]));

	let error = Document::read_from_buf(bytes, ParseOptions::new()).unwrap_err();
	let ErrorKind::UnknownDocType(doc_type) = error.kind() else {
		panic!("expected an unknown DocType error, got {error}");
	};
	assert_eq!(doc_type, "bogus");
}

#[test_log::test]
fn unknown_size_parses_like_known_size() {
	let info = el(&INFO_ID, &el(&TIMESTAMP_SCALE_ID, &[0x0F, 0x42, 0x40]));

	let known = matroska_doc(&info);

	let mut unknown = header("matroska");
	unknown.extend_from_slice(&SEGMENT_ID);
	unknown.push(0xFF); // unknown-size sentinel
	unknown.extend_from_slice(&info);

	let mut known_doc = Document::read_from_buf(known, ParseOptions::new()).unwrap();
	let mut unknown_doc = Document::read_from_buf(unknown, ParseOptions::new()).unwrap();

	for doc in [&mut known_doc, &mut unknown_doc] {
		let root = doc.root();
		let segment = doc.children(root).unwrap()[1];
		let info = doc.children(segment).unwrap()[0];
		let scale = doc.children(info).unwrap()[0];
		assert_eq!(
			doc.value(scale).unwrap(),
			&ElementValue::UnsignedInt(1_000_000)
		);
	}

	// Same 1-octet size field, so even the lengths agree
	let known_root = known_doc.root();
	let unknown_root = unknown_doc.root();
	let known_segment = known_doc.children(known_root).unwrap()[1];
	let unknown_segment = unknown_doc.children(unknown_root).unwrap()[1];
	assert_eq!(
		known_doc.total_length(known_segment).unwrap(),
		unknown_doc.total_length(unknown_segment).unwrap()
	);
}

#[test_log::test]
fn mixed_declared_and_computed_sizes() {
	// Three siblings: a declared 4-octet payload, an empty one, and an
	// unknown-sized Cluster holding two Timestamps before an invalid ID byte
	let mut segment_payload = el(&[0x1C, 0x53, 0xBB, 0x6B], &[0xEC, 0x82, 0x00, 0x00]);
	segment_payload.extend(el(&[0x16, 0x54, 0xAE, 0x6B], &[]));
	segment_payload.extend_from_slice(&[0x1F, 0x43, 0xB6, 0x75]);
	segment_payload.push(0xFF);
	segment_payload.extend(el(&[0xE7], &[0x01]));
	segment_payload.extend(el(&[0xE7], &[0x02]));
	segment_payload.push(0x00); // not a parseable ID
	let bytes = matroska_doc(&segment_payload);

	let mut doc = Document::read_from_buf(bytes, ParseOptions::new()).unwrap();
	let root = doc.root();
	let segment = doc.children(root).unwrap()[1];
	let children = doc.children(segment).unwrap();
	assert_eq!(children.len(), 3);
	assert_eq!(doc.name(children[0]).unwrap(), "Cues");
	assert_eq!(doc.name(children[1]).unwrap(), "Tracks");
	assert_eq!(doc.name(children[2]).unwrap(), "Cluster");

	// The Cluster's extent was computed by scanning up to the invalid byte:
	// two 3-byte Timestamps behind a 4-octet ID and a 1-octet sentinel
	let cluster = children[2];
	assert_eq!(doc.children(cluster).unwrap().len(), 2);
	assert_eq!(doc.total_length(cluster).unwrap(), 4 + 1 + 6);

	// The invalid byte itself interrupts the Segment right after the Cluster
	let interruption = doc.interruption(segment).unwrap().expect("was interrupted");
	assert!(matches!(
		interruption.error().kind(),
		ErrorKind::BadVintSize
	));
	assert_eq!(interruption.last_good_position(), 9 + 5 + 11);
}

#[test_log::test]
fn truncated_child_stops_the_container() {
	// Info declares 10 octets but only 3 follow
	let mut segment_payload = INFO_ID.to_vec();
	segment_payload.push(0x8A);
	segment_payload.extend_from_slice(&[1, 2, 3]);
	let bytes = matroska_doc(&segment_payload);

	// Default mode keeps the partial tree and records the interruption
	let mut doc = Document::read_from_buf(bytes.clone(), ParseOptions::new()).unwrap();
	let root = doc.root();
	let segment = doc.children(root).unwrap()[1];
	assert!(doc.children(segment).unwrap().is_empty());

	let interruption = doc.interruption(segment).unwrap().expect("was interrupted");
	assert_eq!(interruption.last_good_position(), 0);
	assert!(matches!(
		interruption.error().kind(),
		ErrorKind::TruncatedElement { id: 0x1549_A966 }
	));

	// Strict mode refuses outright
	let mut doc = Document::read_from_buf(
		bytes,
		ParseOptions::new().parsing_mode(ParsingMode::Strict),
	)
	.unwrap();
	let root = doc.root();
	let segment = doc.children(root).unwrap()[1];
	let error = doc.children(segment).unwrap_err();
	assert!(matches!(
		error.kind(),
		ErrorKind::TruncatedElement { id: 0x1549_A966 }
	));
}

#[test_log::test]
fn nested_header_stops_the_container() {
	let bytes = matroska_doc(&header("matroska"));

	let mut doc = Document::read_from_buf(bytes.clone(), ParseOptions::new()).unwrap();
	let root = doc.root();
	let segment = doc.children(root).unwrap()[1];
	assert!(doc.children(segment).unwrap().is_empty());
	assert!(matches!(
		doc.interruption(segment).unwrap().unwrap().error().kind(),
		ErrorKind::MisplacedHeader
	));

	let mut doc = Document::read_from_buf(
		bytes,
		ParseOptions::new().parsing_mode(ParsingMode::Strict),
	)
	.unwrap();
	let root = doc.root();
	let segment = doc.children(root).unwrap()[1];
	assert!(matches!(
		doc.children(segment).unwrap_err().kind(),
		ErrorKind::MisplacedHeader
	));
}

#[test_log::test]
fn header_can_shrink_the_id_width_limit() {
	// EBMLMaxIDLength of 2 makes the 4-octet Segment ID unparseable
	let mut header_payload = el(&[0x42, 0x82], b"matroska");
	header_payload.extend(el(&[0x42, 0xF2], &[0x02]));

	let mut bytes = el(&EBML_ID, &header_payload);
	bytes.extend(el(&SEGMENT_ID, &[]));

	let mut doc = Document::read_from_buf(bytes, ParseOptions::new()).unwrap();
	assert_eq!(doc.header().max_id_length(), 2);

	let root = doc.root();
	let top_level = doc.children(root).unwrap();
	assert_eq!(top_level.len(), 1);
	assert_eq!(doc.name(top_level[0]).unwrap(), "EBML");
	assert!(matches!(
		doc.interruption(root).unwrap().unwrap().error().kind(),
		ErrorKind::BadVintSize
	));
}

#[test_log::test]
fn deep_malformation_surfaces_only_on_access() {
	// A zero byte inside Info is not a parseable child ID, but nothing looks at
	// it until the Info level is actually walked
	let bytes = matroska_doc(&el(&INFO_ID, &[0x00]));

	let mut doc = Document::read_from_buf(bytes, ParseOptions::new()).unwrap();
	let root = doc.root();
	let segment = doc.children(root).unwrap()[1];
	let info = doc.children(segment).unwrap()[0];
	assert!(doc.interruption(info).unwrap().is_none());

	assert!(doc.children(info).unwrap().is_empty());
	assert!(matches!(
		doc.interruption(info).unwrap().unwrap().error().kind(),
		ErrorKind::BadVintSize
	));
}
