//! Buffered, bit-addressed reading over a byte source.
//!
//! The reader keeps one sliding buffer over the source. Seeks that land
//! inside the buffer only move the bit-precise buffer offset; anything else
//! drops the buffer and seeks the source. `ensure` compacts when the
//! requested span would run past the buffer's capacity, so a span of up to
//! capacity minus one byte can always be made contiguous.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use tracing::trace;

use crate::error::{DebugInfo, ErrorInfo, ErrorKind};
use crate::size::Size;
use crate::source::ByteSource;

/// Default buffer capacity: 64 MiB.
pub const BUFFER_CAPACITY: usize = 64 * 1024 * 1024;

/// A buffered reader shared between record handles and their reader.
pub type SharedReader = Rc<RefCell<BufferedReader>>;

pub struct BufferedReader {
    source: Box<dyn ByteSource>,
    buffer: Vec<u8>,
    /// Absolute position of `buffer[0]`; always byte aligned.
    start: Size,
    /// Bit-precise read offset within the buffer.
    offset: Size,
    /// Bytes of `buffer` holding source data.
    used: usize,
}

fn io_error(err: io::Error, position: Size) -> ErrorInfo {
    let errno = err
        .raw_os_error()
        .map(|n| n.to_string())
        .unwrap_or_else(|| err.to_string());
    ErrorInfo::with_args(DebugInfo::default(), ErrorKind::IoError, &[&errno])
        .at_offset(position.byte_count())
}

impl BufferedReader {
    pub fn new(source: Box<dyn ByteSource>) -> BufferedReader {
        BufferedReader::with_capacity(source, BUFFER_CAPACITY)
    }

    /// A reader with a custom buffer capacity; tests use small capacities to
    /// exercise compaction.
    pub fn with_capacity(source: Box<dyn ByteSource>, capacity: usize) -> BufferedReader {
        assert!(capacity > 0);
        BufferedReader {
            source,
            buffer: vec![0; capacity],
            start: Size::default(),
            offset: Size::default(),
            used: 0,
        }
    }

    /// Wraps a source in a reader shared through `Rc<RefCell<_>>`.
    pub fn shared(source: Box<dyn ByteSource>) -> SharedReader {
        Rc::new(RefCell::new(BufferedReader::new(source)))
    }

    /// The logical read cursor.
    pub fn position(&self) -> Size {
        self.start + self.offset
    }

    /// Seeks to an absolute position. Within the buffer this only adjusts
    /// the buffer offset; otherwise the buffer is dropped and the source is
    /// seeked to the byte containing `position`.
    pub fn seek(&mut self, position: Size) -> Result<(), ErrorInfo> {
        if position >= self.start && position < self.start + Size::from_bytes(self.used as u64) {
            self.offset = position - self.start;
            return Ok(());
        }

        trace!(target: "binary_reader::reader", to = %position, "seek outside buffer");
        self.start = position.clip_to_byte();
        self.offset = Size::from_bits(u64::from(position.bit_offset()));
        self.used = 0;
        self.source
            .seek(position.byte_count())
            .map_err(|e| io_error(e, position))?;
        Ok(())
    }

    pub fn skip(&mut self, count: Size) -> Result<(), ErrorInfo> {
        self.seek(self.start + self.offset + count)
    }

    /// Ensures at least `size` is buffered past the current offset. Hitting
    /// EOF earlier is not an error here; consumers detect short data from
    /// the slice they get back.
    pub fn ensure(&mut self, size: Size) -> Result<(), ErrorInfo> {
        let capacity = self.buffer.len();
        debug_assert!(size <= Size::from_parts(capacity as u64 - 1, 7));
        debug_assert!(self.offset <= Size::from_parts(self.used as u64, 7));

        if self.offset + size > Size::from_bytes(capacity as u64) {
            // Make room by moving the unread tail to the buffer start; the
            // sub-byte part of the offset is preserved.
            let count = self.offset.byte_count() as usize;
            self.buffer.copy_within(count..self.used, 0);
            self.used -= count;
            self.start += Size::from_bytes(count as u64);
            self.offset = Size::from_bits(u64::from(self.offset.bit_offset()));
        }

        while self.offset + size > Size::from_bytes(self.used as u64) {
            let read = self
                .source
                .read(&mut self.buffer[self.used..])
                .map_err(|e| io_error(e, self.start + self.offset))?;
            if read == 0 {
                break; // EOF
            }
            trace!(target: "binary_reader::reader", bytes = read, "buffer refill");
            self.used += read;
        }

        Ok(())
    }

    /// The buffered bytes at the current read position. This operates on
    /// whole bytes; the caller accounts for the sub-byte bit offset.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer[self.offset.byte_count() as usize..self.used]
    }

    /// Buffers at least one byte if possible and returns the slice at the
    /// current position.
    pub fn get_buffer(&mut self) -> Result<&[u8], ErrorInfo> {
        self.ensure(Size::from_bits(1))?;
        Ok(self.buffered())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    fn reader_over(data: &[u8]) -> BufferedReader {
        BufferedReader::new(Box::new(MemorySource::new(data.to_vec())))
    }

    #[test]
    fn basic_flow() {
        let mut reader = reader_over(b"data");
        assert_eq!(reader.position(), Size::from_bits(0));
        let buf = reader.get_buffer().expect("buffer");
        assert_eq!(buf, b"data");
    }

    #[test]
    fn ensure_loops_until_satisfied_or_eof() {
        let mut reader = reader_over(b"abcdefghij");
        reader.ensure(Size::from_bytes(20)).expect("ensure");
        assert_eq!(reader.buffered(), b"abcdefghij");
    }

    #[test]
    fn buffered_seek_keeps_buffer() {
        let mut reader = reader_over(b"abcdefghij");
        reader.ensure(Size::from_bytes(10)).expect("ensure");
        reader.seek(Size::from_bytes(4)).expect("seek");
        assert_eq!(reader.position().byte_count(), 4);
        assert_eq!(reader.buffered(), b"efghij");
    }

    #[test]
    fn unbuffered_seek_drops_buffer() {
        let data: Vec<u8> = (0u8..100).collect();
        let mut reader =
            BufferedReader::with_capacity(Box::new(MemorySource::new(data)), 16);
        reader.ensure(Size::from_bytes(1)).expect("ensure");
        reader.seek(Size::from_bytes(50)).expect("seek");
        assert_eq!(reader.position().byte_count(), 50);
        let buf = reader.get_buffer().expect("buffer");
        assert_eq!(buf, &(50u8..66).collect::<Vec<u8>>()[..]);
    }

    #[test]
    fn seek_preserves_bit_offset() {
        let mut reader = reader_over(b"abcd");
        reader.seek(Size::from_parts(1, 3)).expect("seek");
        assert_eq!(reader.position(), Size::from_parts(1, 3));
        let buf = reader.get_buffer().expect("buffer");
        // Slice starts at the byte containing the position.
        assert_eq!(buf[0], b'b');
    }

    #[test]
    fn compaction_moves_tail_to_front() {
        let data: Vec<u8> = (0u8..32).collect();
        let mut reader =
            BufferedReader::with_capacity(Box::new(MemorySource::new(data)), 8);
        reader.ensure(Size::from_bytes(7)).expect("ensure");
        reader.seek(Size::from_bytes(6)).expect("seek");
        // 6 bytes consumed; asking for 7 more forces a compaction.
        reader.ensure(Size::from_bytes(7)).expect("ensure");
        assert_eq!(reader.position().byte_count(), 6);
        assert_eq!(reader.buffered(), &[6, 7, 8, 9, 10, 11, 12, 13]);
    }

    #[test]
    fn position_tracks_skip() {
        let mut reader = reader_over(b"abcd");
        reader.skip(Size::from_bits(5)).expect("skip");
        assert_eq!(reader.position(), Size::from_bits(5));
        reader.skip(Size::from_bits(5)).expect("skip");
        assert_eq!(reader.position(), Size::from_bits(10));
    }

    #[test]
    fn eof_reports_available_size() {
        let mut reader = reader_over(b"ab");
        reader.ensure(Size::from_bytes(10)).expect("ensure");
        assert_eq!(reader.buffered().len(), 2);
    }
}
