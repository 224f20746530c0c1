//! Engines that keep derived state consistent while a document is edited
//!
//! An engine registers interest in a document and reacts after every committed
//! mutation. The two bundled engines maintain Matroska's CRC-32 checksums and
//! its SeekHead index; callers can register their own.
//!
//! Engine failures never fail the mutation that triggered them. The mutation
//! has already committed by the time engines run, so an engine error is logged
//! and the document stays as the caller left it.

mod checksum;
mod seek_index;

pub use checksum::ChecksumEngine;
pub use seek_index::SeekIndexEngine;

use crate::document::Document;
use crate::element::ElementRef;
use crate::error::Result;

/// A reactive maintainer of derived document state
///
/// Mutations an engine makes through the [`Document`] API do not re-trigger
/// engine dispatch; each engine sees each caller-made mutation exactly once.
pub trait DocumentEngine {
	/// A short name for log output
	fn name(&self) -> &'static str;

	/// Whether the engine is active for the given DocType
	fn applies_to(&self, doc_type: Option<&str>) -> bool;

	/// React to a committed mutation
	///
	/// `changed` is the element the mutation was rooted at: the assigned leaf,
	/// the inserted element, or the parent of a removed one.
	fn on_change(&mut self, document: &mut Document, changed: ElementRef) -> Result<()>;
}

pub(crate) struct EngineSlot {
	pub(crate) engine: Box<dyn DocumentEngine>,
	pub(crate) in_progress: bool,
}
