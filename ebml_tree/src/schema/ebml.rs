//! The base EBML schema
//!
//! Every DocType shares these: the header element and its children
//! (<https://www.rfc-editor.org/rfc/rfc8794.html#name-ebml-header-elements>),
//! plus the CRC-32 and Void globals.

use super::{DefaultValue, ElementDataType, LengthConstraint, SchemaElement};

/// The EBML header element ID, the required first element of every document
pub(crate) const EBML: u64 = 0x1A45_DFA3;
/// The DocType element ID, decoded eagerly to activate the right schema
pub(crate) const DOC_TYPE: u64 = 0x4282;
/// The CRC-32 global element ID
pub(crate) const CRC32: u64 = 0xBF;
/// The Void global element ID
pub(crate) const VOID: u64 = 0xEC;

pub(crate) const VERSION: u64 = 0x4286;
pub(crate) const READ_VERSION: u64 = 0x42F7;
pub(crate) const MAX_ID_LENGTH: u64 = 0x42F2;
pub(crate) const MAX_SIZE_LENGTH: u64 = 0x42F3;
pub(crate) const DOC_TYPE_VERSION: u64 = 0x4287;
pub(crate) const DOC_TYPE_READ_VERSION: u64 = 0x4285;

const DOC_TYPE_EXTENSION: u64 = 0x4281;

/// The base EBML header schema table
#[rustfmt::skip]
pub static EBML_SCHEMA: &[SchemaElement] = &[
	SchemaElement::new(EBML, "EBML", &[], ElementDataType::Master).required(),
	SchemaElement::new(VERSION, "EBMLVersion", &[EBML], ElementDataType::UnsignedInt)
		.required()
		.default_value(DefaultValue::UnsignedInt(1)),
	SchemaElement::new(READ_VERSION, "EBMLReadVersion", &[EBML], ElementDataType::UnsignedInt)
		.required()
		.default_value(DefaultValue::UnsignedInt(1)),
	SchemaElement::new(MAX_ID_LENGTH, "EBMLMaxIDLength", &[EBML], ElementDataType::UnsignedInt)
		.required()
		.default_value(DefaultValue::UnsignedInt(4)),
	SchemaElement::new(MAX_SIZE_LENGTH, "EBMLMaxSizeLength", &[EBML], ElementDataType::UnsignedInt)
		.required()
		.default_value(DefaultValue::UnsignedInt(8)),
	SchemaElement::new(DOC_TYPE, "DocType", &[EBML], ElementDataType::String).required(),
	SchemaElement::new(DOC_TYPE_VERSION, "DocTypeVersion", &[EBML], ElementDataType::UnsignedInt)
		.required()
		.default_value(DefaultValue::UnsignedInt(1)),
	SchemaElement::new(DOC_TYPE_READ_VERSION, "DocTypeReadVersion", &[EBML], ElementDataType::UnsignedInt)
		.required()
		.default_value(DefaultValue::UnsignedInt(1)),
	SchemaElement::new(DOC_TYPE_EXTENSION, "DocTypeExtension", &[EBML], ElementDataType::Master),
	SchemaElement::new(0x4283, "DocTypeExtensionName", &[EBML, DOC_TYPE_EXTENSION], ElementDataType::String)
		.required(),
	SchemaElement::new(0x4284, "DocTypeExtensionVersion", &[EBML, DOC_TYPE_EXTENSION], ElementDataType::UnsignedInt)
		.required(),

	// Global elements, valid in any DocType
	SchemaElement::global(CRC32, "CRC-32", 1, ElementDataType::Binary)
		.max_occurs(1)
		.length(LengthConstraint::Exact(4)),
	SchemaElement::global(VOID, "Void", 0, ElementDataType::Binary),
];
