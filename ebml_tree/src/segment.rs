//! Byte-range views over a shared backing source
//!
//! Every element in a parsed tree holds a [`SegmentSource`] covering exactly its
//! payload bytes. Segments compose by sub-slicing, so a document over a 2 GiB file
//! never copies payload bytes until a caller actually materializes a value.
//!
//! The engine is single threaded; one document is the sole cursor owner of its
//! backing stream. A segment seeks the shared stream to its own position before
//! every read, so interleaved reads from sibling segments cannot corrupt each other.

use crate::error::Result;
use crate::macros::try_vec;

use std::cell::RefCell;
use std::io::{Read, Seek, SeekFrom};
use std::rc::Rc;

/// Any source a document can be parsed from
///
/// This is auto-implemented for all `Read + Seek` types.
pub trait MediaSource: Read + Seek {}

impl<T: Read + Seek> MediaSource for T {}

/// A non-copying view over a byte range of a shared backing source
///
/// Cloning a `SegmentSource` shares the backing source but gives the clone an
/// independent cursor. The backing source is released when the last view over
/// it is dropped, so an owning segment releases its resource exactly once.
pub struct SegmentSource {
	source: Rc<RefCell<dyn MediaSource>>,
	start: u64,
	len: u64,
	cursor: u64,
}

impl SegmentSource {
	/// Create a segment spanning `len` bytes of `source`, starting at `start`
	pub fn new(source: Rc<RefCell<dyn MediaSource>>, start: u64, len: u64) -> Self {
		Self {
			source,
			start,
			len,
			cursor: 0,
		}
	}

	/// Create an owning segment over an in-memory buffer
	///
	/// # Examples
	///
	/// ```rust
	/// use ebml_tree::segment::SegmentSource;
	///
	/// let segment = SegmentSource::from_buf(vec![1, 2, 3, 4]);
	/// assert_eq!(segment.length(), 4);
	/// ```
	pub fn from_buf(buf: Vec<u8>) -> Self {
		let len = buf.len() as u64;
		Self {
			source: Rc::new(RefCell::new(std::io::Cursor::new(buf))),
			start: 0,
			len,
			cursor: 0,
		}
	}

	/// Create a segment spanning the entirety of a reader
	///
	/// The reader's length is determined by seeking to its end.
	pub fn from_reader<R>(mut reader: R) -> Result<Self>
	where
		R: MediaSource + 'static,
	{
		let len = reader.seek(SeekFrom::End(0))?;
		reader.seek(SeekFrom::Start(0))?;

		Ok(Self {
			source: Rc::new(RefCell::new(reader)),
			start: 0,
			len,
			cursor: 0,
		})
	}

	/// The length of the segment in bytes
	pub fn length(&self) -> u64 {
		self.len
	}

	/// The current read cursor, relative to the segment start
	pub fn position(&self) -> u64 {
		self.cursor
	}

	/// Move the read cursor, clamped to `[0, length]`
	pub fn set_position(&mut self, position: u64) {
		self.cursor = std::cmp::min(position, self.len);
	}

	/// The number of bytes between the cursor and the segment end
	pub fn remaining(&self) -> u64 {
		self.len - self.cursor
	}

	/// Create a child view starting at the current position
	///
	/// The child spans `len` bytes (clamped to the bytes remaining in `self`),
	/// and the parent's cursor advances past it. Offsets compose; payload bytes
	/// are not copied.
	///
	/// # Examples
	///
	/// ```rust
	/// use ebml_tree::segment::SegmentSource;
	///
	/// let mut parent = SegmentSource::from_buf(vec![0, 1, 2, 3, 4, 5]);
	/// parent.set_position(2);
	///
	/// let child = parent.slice(3);
	/// assert_eq!(child.length(), 3);
	/// assert_eq!(parent.position(), 5);
	/// ```
	pub fn slice(&mut self, len: u64) -> SegmentSource {
		let len = std::cmp::min(len, self.remaining());
		let child = SegmentSource {
			source: Rc::clone(&self.source),
			start: self.start + self.cursor,
			len,
			cursor: 0,
		};

		self.cursor += len;
		child
	}

	/// Read the entire segment into a freshly allocated buffer
	///
	/// The cursor is left at the segment end.
	pub fn read_to_vec(&mut self) -> Result<Vec<u8>> {
		self.set_position(0);

		let mut buf = try_vec![0; self.len as usize];
		self.read_exact(&mut buf)?;
		Ok(buf)
	}

	/// Stream the entire segment into `writer` without buffering it whole
	pub fn copy_to<W: std::io::Write>(&mut self, writer: &mut W) -> Result<u64> {
		self.set_position(0);
		let copied = std::io::copy(self, writer)?;
		Ok(copied)
	}
}

impl Clone for SegmentSource {
	fn clone(&self) -> Self {
		Self {
			source: Rc::clone(&self.source),
			start: self.start,
			len: self.len,
			cursor: 0,
		}
	}
}

impl std::fmt::Debug for SegmentSource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SegmentSource")
			.field("start", &self.start)
			.field("len", &self.len)
			.field("cursor", &self.cursor)
			.finish_non_exhaustive()
	}
}

impl Read for SegmentSource {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		let remaining = self.remaining();
		if remaining == 0 || buf.is_empty() {
			return Ok(0);
		}

		let to_read = std::cmp::min(buf.len() as u64, remaining) as usize;

		let mut source = self.source.borrow_mut();
		source.seek(SeekFrom::Start(self.start + self.cursor))?;
		let read = source.read(&mut buf[..to_read])?;

		self.cursor += read as u64;
		Ok(read)
	}
}

impl Seek for SegmentSource {
	fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
		let new_pos = match pos {
			SeekFrom::Start(offset) => offset as i64,
			SeekFrom::End(offset) => self.len as i64 + offset,
			SeekFrom::Current(offset) => self.cursor as i64 + offset,
		};

		if new_pos < 0 {
			return Err(std::io::Error::new(
				std::io::ErrorKind::InvalidInput,
				"Attempted to seek before the segment start",
			));
		}

		self.set_position(new_pos as u64);
		Ok(self.cursor)
	}
}

#[cfg(test)]
mod tests {
	use super::SegmentSource;
	use std::io::Read;

	#[test_log::test]
	fn reads_stop_at_boundary() {
		let mut parent = SegmentSource::from_buf((0u8..10).collect());
		parent.set_position(4);

		let mut child = parent.slice(3);

		let mut buf = [0u8; 8];
		let read = child.read(&mut buf).unwrap();
		assert_eq!(read, 3);
		assert_eq!(&buf[..3], &[4, 5, 6]);

		// Exhausted, short read of 0
		assert_eq!(child.read(&mut buf).unwrap(), 0);
	}

	#[test_log::test]
	fn position_is_clamped() {
		let mut segment = SegmentSource::from_buf(vec![0; 5]);
		segment.set_position(100);
		assert_eq!(segment.position(), 5);
	}

	#[test_log::test]
	fn sibling_slices_do_not_interfere() {
		let mut parent = SegmentSource::from_buf((0u8..8).collect());
		let mut first = parent.slice(4);
		let mut second = parent.slice(4);

		// Interleave reads; each segment re-seeks the shared stream
		let mut a = [0u8; 2];
		let mut b = [0u8; 2];
		first.read_exact(&mut a).unwrap();
		second.read_exact(&mut b).unwrap();
		assert_eq!(a, [0, 1]);
		assert_eq!(b, [4, 5]);

		first.read_exact(&mut a).unwrap();
		second.read_exact(&mut b).unwrap();
		assert_eq!(a, [2, 3]);
		assert_eq!(b, [6, 7]);
	}

	#[test_log::test]
	fn slice_clamps_to_remaining() {
		let mut parent = SegmentSource::from_buf(vec![0; 4]);
		parent.set_position(3);

		let child = parent.slice(10);
		assert_eq!(child.length(), 1);
		assert_eq!(parent.position(), 4);
	}
}
