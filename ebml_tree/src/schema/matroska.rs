//! The bundled Matroska and WebM schema tables
//!
//! These cover the element set the engine's own machinery needs (SeekHead, the
//! tag and attachment hierarchies, chapters, cues) plus the structural skeleton
//! of an A/V segment. IDs with no entry here still parse; they resolve to the
//! generic binary type and round-trip untouched.

use super::{DefaultValue, ElementDataType, SchemaElement};

pub(crate) const SEGMENT: u64 = 0x1853_8067;
pub(crate) const SEEK_HEAD: u64 = 0x114D_9B74;
pub(crate) const SEEK: u64 = 0x4DBB;
pub(crate) const SEEK_ID: u64 = 0x53AB;
pub(crate) const SEEK_POSITION: u64 = 0x53AC;
pub(crate) const INFO: u64 = 0x1549_A966;
pub(crate) const CLUSTER: u64 = 0x1F43_B675;
pub(crate) const TRACKS: u64 = 0x1654_AE6B;
pub(crate) const CUES: u64 = 0x1C53_BB6B;
pub(crate) const CHAPTERS: u64 = 0x1043_A770;
pub(crate) const TAGS: u64 = 0x1254_C367;
pub(crate) const ATTACHMENTS: u64 = 0x1941_A469;

const BLOCK_GROUP: u64 = 0xA0;
const TRACK_ENTRY: u64 = 0xAE;
const AUDIO: u64 = 0xE1;
const VIDEO: u64 = 0xE0;
const CUE_POINT: u64 = 0xBB;
const CUE_TRACK_POSITIONS: u64 = 0xB7;
const EDITION_ENTRY: u64 = 0x45B9;
const CHAPTER_ATOM: u64 = 0xB6;
const CHAPTER_DISPLAY: u64 = 0x80;
const TAG: u64 = 0x7373;
const TARGETS: u64 = 0x63C0;
const SIMPLE_TAG: u64 = 0x67C8;
const ATTACHED_FILE: u64 = 0x61A7;

/// The Matroska schema table
#[rustfmt::skip]
pub static MATROSKA_SCHEMA: &[SchemaElement] = &[
	// The Root Element that contains all other Top-Level Elements
	SchemaElement::new(SEGMENT, "Segment", &[], ElementDataType::Master)
		.required()
		.max_occurs(1),

	// \Segment\SeekHead
	SchemaElement::new(SEEK_HEAD, "SeekHead", &[SEGMENT], ElementDataType::Master)
		.max_occurs(2),
	SchemaElement::new(SEEK, "Seek", &[SEGMENT, SEEK_HEAD], ElementDataType::Master).required(),
	SchemaElement::new(SEEK_ID, "SeekID", &[SEGMENT, SEEK_HEAD, SEEK], ElementDataType::Binary)
		.required(),
	SchemaElement::new(SEEK_POSITION, "SeekPosition", &[SEGMENT, SEEK_HEAD, SEEK], ElementDataType::UnsignedInt)
		.required(),

	// \Segment\Info
	SchemaElement::new(INFO, "Info", &[SEGMENT], ElementDataType::Master)
		.required()
		.recurring(),
	SchemaElement::new(0x73A4, "SegmentUUID", &[SEGMENT, INFO], ElementDataType::Binary),
	SchemaElement::new(0x2AD7_B1, "TimestampScale", &[SEGMENT, INFO], ElementDataType::UnsignedInt)
		.required()
		.default_value(DefaultValue::UnsignedInt(1_000_000)),
	SchemaElement::new(0x4489, "Duration", &[SEGMENT, INFO], ElementDataType::Float),
	SchemaElement::new(0x4461, "DateUTC", &[SEGMENT, INFO], ElementDataType::Date),
	SchemaElement::new(0x7BA9, "Title", &[SEGMENT, INFO], ElementDataType::Utf8),
	SchemaElement::new(0x4D80, "MuxingApp", &[SEGMENT, INFO], ElementDataType::Utf8).required(),
	SchemaElement::new(0x5741, "WritingApp", &[SEGMENT, INFO], ElementDataType::Utf8).required(),

	// \Segment\Cluster
	SchemaElement::new(CLUSTER, "Cluster", &[SEGMENT], ElementDataType::Master),
	SchemaElement::new(0xE7, "Timestamp", &[SEGMENT, CLUSTER], ElementDataType::UnsignedInt)
		.required(),
	SchemaElement::new(0xA3, "SimpleBlock", &[SEGMENT, CLUSTER], ElementDataType::SimpleBlock),
	SchemaElement::new(BLOCK_GROUP, "BlockGroup", &[SEGMENT, CLUSTER], ElementDataType::Master),
	SchemaElement::new(0xA1, "Block", &[SEGMENT, CLUSTER, BLOCK_GROUP], ElementDataType::Block)
		.required(),
	SchemaElement::new(0x9B, "BlockDuration", &[SEGMENT, CLUSTER, BLOCK_GROUP], ElementDataType::UnsignedInt),

	// \Segment\Tracks
	SchemaElement::new(TRACKS, "Tracks", &[SEGMENT], ElementDataType::Master).recurring(),
	SchemaElement::new(TRACK_ENTRY, "TrackEntry", &[SEGMENT, TRACKS], ElementDataType::Master)
		.required(),
	SchemaElement::new(0xD7, "TrackNumber", &[SEGMENT, TRACKS, TRACK_ENTRY], ElementDataType::UnsignedInt)
		.required(),
	SchemaElement::new(0x73C5, "TrackUID", &[SEGMENT, TRACKS, TRACK_ENTRY], ElementDataType::UnsignedInt)
		.required(),
	SchemaElement::new(0x83, "TrackType", &[SEGMENT, TRACKS, TRACK_ENTRY], ElementDataType::UnsignedInt)
		.required(),
	SchemaElement::new(0xB9, "FlagEnabled", &[SEGMENT, TRACKS, TRACK_ENTRY], ElementDataType::UnsignedInt)
		.default_value(DefaultValue::UnsignedInt(1)),
	SchemaElement::new(0x88, "FlagDefault", &[SEGMENT, TRACKS, TRACK_ENTRY], ElementDataType::UnsignedInt)
		.default_value(DefaultValue::UnsignedInt(1)),
	SchemaElement::new(0x23E3_83, "DefaultDuration", &[SEGMENT, TRACKS, TRACK_ENTRY], ElementDataType::UnsignedInt),
	SchemaElement::new(0x22B5_9C, "Language", &[SEGMENT, TRACKS, TRACK_ENTRY], ElementDataType::String)
		.default_value(DefaultValue::Str("eng")),
	SchemaElement::new(0x22B5_9D, "LanguageBCP47", &[SEGMENT, TRACKS, TRACK_ENTRY], ElementDataType::String),
	SchemaElement::new(0x86, "CodecID", &[SEGMENT, TRACKS, TRACK_ENTRY], ElementDataType::String)
		.required(),
	SchemaElement::new(0x63A2, "CodecPrivate", &[SEGMENT, TRACKS, TRACK_ENTRY], ElementDataType::Binary),
	SchemaElement::new(0x2586_88, "CodecName", &[SEGMENT, TRACKS, TRACK_ENTRY], ElementDataType::Utf8),
	SchemaElement::new(0x56AA, "CodecDelay", &[SEGMENT, TRACKS, TRACK_ENTRY], ElementDataType::UnsignedInt),
	SchemaElement::new(0x56BB, "SeekPreRoll", &[SEGMENT, TRACKS, TRACK_ENTRY], ElementDataType::UnsignedInt),

	// \Segment\Tracks\TrackEntry\Video
	SchemaElement::new(VIDEO, "Video", &[SEGMENT, TRACKS, TRACK_ENTRY], ElementDataType::Master),
	SchemaElement::new(0xB0, "PixelWidth", &[SEGMENT, TRACKS, TRACK_ENTRY, VIDEO], ElementDataType::UnsignedInt)
		.required(),
	SchemaElement::new(0xBA, "PixelHeight", &[SEGMENT, TRACKS, TRACK_ENTRY, VIDEO], ElementDataType::UnsignedInt)
		.required(),

	// \Segment\Tracks\TrackEntry\Audio
	SchemaElement::new(AUDIO, "Audio", &[SEGMENT, TRACKS, TRACK_ENTRY], ElementDataType::Master),
	SchemaElement::new(0xB5, "SamplingFrequency", &[SEGMENT, TRACKS, TRACK_ENTRY, AUDIO], ElementDataType::Float)
		.required()
		.default_value(DefaultValue::Float(8000.0)),
	SchemaElement::new(0x78B5, "OutputSamplingFrequency", &[SEGMENT, TRACKS, TRACK_ENTRY, AUDIO], ElementDataType::Float),
	SchemaElement::new(0x9F, "Channels", &[SEGMENT, TRACKS, TRACK_ENTRY, AUDIO], ElementDataType::UnsignedInt)
		.required()
		.default_value(DefaultValue::UnsignedInt(1)),
	SchemaElement::new(0x6264, "BitDepth", &[SEGMENT, TRACKS, TRACK_ENTRY, AUDIO], ElementDataType::UnsignedInt),

	// \Segment\Cues
	SchemaElement::new(CUES, "Cues", &[SEGMENT], ElementDataType::Master),
	SchemaElement::new(CUE_POINT, "CuePoint", &[SEGMENT, CUES], ElementDataType::Master).required(),
	SchemaElement::new(0xB3, "CueTime", &[SEGMENT, CUES, CUE_POINT], ElementDataType::UnsignedInt)
		.required(),
	SchemaElement::new(CUE_TRACK_POSITIONS, "CueTrackPositions", &[SEGMENT, CUES, CUE_POINT], ElementDataType::Master)
		.required(),
	SchemaElement::new(0xF7, "CueTrack", &[SEGMENT, CUES, CUE_POINT, CUE_TRACK_POSITIONS], ElementDataType::UnsignedInt)
		.required(),
	SchemaElement::new(0xF1, "CueClusterPosition", &[SEGMENT, CUES, CUE_POINT, CUE_TRACK_POSITIONS], ElementDataType::UnsignedInt)
		.required(),

	// \Segment\Chapters
	SchemaElement::new(CHAPTERS, "Chapters", &[SEGMENT], ElementDataType::Master).max_occurs(1),
	SchemaElement::new(EDITION_ENTRY, "EditionEntry", &[SEGMENT, CHAPTERS], ElementDataType::Master)
		.required(),
	SchemaElement::new(CHAPTER_ATOM, "ChapterAtom", &[SEGMENT, CHAPTERS, EDITION_ENTRY], ElementDataType::Master)
		.required()
		.recursive(),
	SchemaElement::new(0x73C4, "ChapterUID", &[SEGMENT, CHAPTERS, EDITION_ENTRY, CHAPTER_ATOM], ElementDataType::UnsignedInt)
		.required(),
	SchemaElement::new(0x91, "ChapterTimeStart", &[SEGMENT, CHAPTERS, EDITION_ENTRY, CHAPTER_ATOM], ElementDataType::UnsignedInt)
		.required(),
	SchemaElement::new(0x92, "ChapterTimeEnd", &[SEGMENT, CHAPTERS, EDITION_ENTRY, CHAPTER_ATOM], ElementDataType::UnsignedInt),
	SchemaElement::new(CHAPTER_DISPLAY, "ChapterDisplay", &[SEGMENT, CHAPTERS, EDITION_ENTRY, CHAPTER_ATOM], ElementDataType::Master),
	SchemaElement::new(0x85, "ChapString", &[SEGMENT, CHAPTERS, EDITION_ENTRY, CHAPTER_ATOM, CHAPTER_DISPLAY], ElementDataType::Utf8)
		.required(),
	SchemaElement::new(0x437C, "ChapLanguage", &[SEGMENT, CHAPTERS, EDITION_ENTRY, CHAPTER_ATOM, CHAPTER_DISPLAY], ElementDataType::String)
		.default_value(DefaultValue::Str("eng")),

	// \Segment\Tags
	SchemaElement::new(TAGS, "Tags", &[SEGMENT], ElementDataType::Master).recurring(),
	SchemaElement::new(TAG, "Tag", &[SEGMENT, TAGS], ElementDataType::Master).required(),
	SchemaElement::new(TARGETS, "Targets", &[SEGMENT, TAGS, TAG], ElementDataType::Master)
		.required()
		.max_occurs(1),
	SchemaElement::new(0x68CA, "TargetTypeValue", &[SEGMENT, TAGS, TAG, TARGETS], ElementDataType::UnsignedInt)
		.default_value(DefaultValue::UnsignedInt(50)),
	SchemaElement::new(0x63CA, "TargetType", &[SEGMENT, TAGS, TAG, TARGETS], ElementDataType::String),
	SchemaElement::new(0x63C5, "TagTrackUID", &[SEGMENT, TAGS, TAG, TARGETS], ElementDataType::UnsignedInt)
		.default_value(DefaultValue::UnsignedInt(0)),
	SchemaElement::new(0x63C9, "TagEditionUID", &[SEGMENT, TAGS, TAG, TARGETS], ElementDataType::UnsignedInt)
		.default_value(DefaultValue::UnsignedInt(0)),
	SchemaElement::new(0x63C4, "TagChapterUID", &[SEGMENT, TAGS, TAG, TARGETS], ElementDataType::UnsignedInt)
		.default_value(DefaultValue::UnsignedInt(0)),
	SchemaElement::new(0x63C6, "TagAttachmentUID", &[SEGMENT, TAGS, TAG, TARGETS], ElementDataType::UnsignedInt)
		.default_value(DefaultValue::UnsignedInt(0)),
	SchemaElement::new(SIMPLE_TAG, "SimpleTag", &[SEGMENT, TAGS, TAG], ElementDataType::Master)
		.required()
		.recursive(),
	SchemaElement::new(0x45A3, "TagName", &[SEGMENT, TAGS, TAG, SIMPLE_TAG], ElementDataType::Utf8)
		.required(),
	SchemaElement::new(0x447A, "TagLanguage", &[SEGMENT, TAGS, TAG, SIMPLE_TAG], ElementDataType::String)
		.default_value(DefaultValue::Str("und")),
	SchemaElement::new(0x4484, "TagDefault", &[SEGMENT, TAGS, TAG, SIMPLE_TAG], ElementDataType::UnsignedInt)
		.default_value(DefaultValue::UnsignedInt(1)),
	SchemaElement::new(0x4487, "TagString", &[SEGMENT, TAGS, TAG, SIMPLE_TAG], ElementDataType::Utf8),
	SchemaElement::new(0x4485, "TagBinary", &[SEGMENT, TAGS, TAG, SIMPLE_TAG], ElementDataType::Binary),

	// \Segment\Attachments
	SchemaElement::new(ATTACHMENTS, "Attachments", &[SEGMENT], ElementDataType::Master)
		.max_occurs(1),
	SchemaElement::new(ATTACHED_FILE, "AttachedFile", &[SEGMENT, ATTACHMENTS], ElementDataType::Master)
		.required(),
	SchemaElement::new(0x467E, "FileDescription", &[SEGMENT, ATTACHMENTS, ATTACHED_FILE], ElementDataType::Utf8),
	SchemaElement::new(0x466E, "FileName", &[SEGMENT, ATTACHMENTS, ATTACHED_FILE], ElementDataType::Utf8)
		.required(),
	SchemaElement::new(0x4660, "FileMimeType", &[SEGMENT, ATTACHMENTS, ATTACHED_FILE], ElementDataType::String)
		.required(),
	SchemaElement::new(0x465C, "FileData", &[SEGMENT, ATTACHMENTS, ATTACHED_FILE], ElementDataType::Binary)
		.required(),
	SchemaElement::new(0x46AE, "FileUID", &[SEGMENT, ATTACHMENTS, ATTACHED_FILE], ElementDataType::UnsignedInt)
		.required(),
];

/// The WebM schema table
///
/// WebM is a constrained profile of Matroska; it shares the structural table.
/// The profile's codec restrictions are semantic, which is out of scope here.
pub static WEBM_SCHEMA: &[SchemaElement] = MATROSKA_SCHEMA;
