//! Parse, edit, and byte-exactly re-serialize EBML documents (Matroska/WebM).
//!
//! Everything is lazy in both directions: parsed elements decode their values on
//! first read, and edited elements re-derive their bytes on demand. Subtrees that
//! were never touched serialize back to their original bytes exactly, over-long
//! size encodings and unknown-size sentinels included.
//!
//! # Examples
//!
//! ## Reading a document
//!
//! ```rust,no_run
//! # fn main() -> ebml_tree::error::Result<()> {
//! use ebml_tree::{Document, ParseOptions};
//! use std::fs::File;
//!
//! let file = File::open("recording.mkv")?;
//! let mut doc = Document::read_from(file, ParseOptions::new())?;
//!
//! assert_eq!(doc.doc_type(), Some("matroska"));
//!
//! // Only the root level and the EBML header have been parsed so far; walking
//! // into a container parses one level more
//! let root = doc.root();
//! for child in doc.children(root)? {
//! 	println!("{} ({:#X})", doc.name(child)?, doc.id(child)?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Editing and writing back
//!
//! ```rust,no_run
//! # fn main() -> ebml_tree::error::Result<()> {
//! use ebml_tree::{Document, ElementValue, ParseOptions};
//! use std::fs::File;
//!
//! let file = File::open("recording.mkv")?;
//! let mut doc = Document::read_from(file, ParseOptions::new())?;
//!
//! // Find \Segment\Info\TimestampScale and halve it
//! let root = doc.root();
//! let segment = doc.children(root)?[1];
//! let info = doc
//! 	.children(segment)?
//! 	.into_iter()
//! 	.find(|e| doc.id(*e).is_ok_and(|id| id == 0x1549_A966))
//! 	.expect("no Info element");
//! for child in doc.children(info)? {
//! 	if doc.id(child)? == 0x2AD7_B1 {
//! 		doc.set_value(child, ElementValue::UnsignedInt(500_000))?;
//! 	}
//! }
//!
//! // Checksums and the seek index were brought back in sync automatically.
//! // Everything outside the edited subtree re-serializes verbatim.
//! let mut out = Vec::new();
//! doc.write_to(&mut out)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod element;
pub mod error;
pub(crate) mod macros;
pub mod schema;
pub mod segment;
mod util;
pub mod vint;

pub use config::{ParseOptions, ParsingMode};
pub use document::{Document, EbmlHeaderProperties};
pub use element::{EbmlDate, ElementRef, ElementTree, ElementValue};
