//! Byte sources that back a buffered reader.
//!
//! A source is assumed not to change while the reader exists and its size, if
//! known, is stable. `read` may return fewer bytes than asked for but must
//! return at least one unless at EOF; `seek` clamps to the known size.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot open file '{path}': {source}")]
    CannotOpen {
        path: String,
        source: io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub trait ByteSource {
    /// Whether `seek` works. Cannot change during the source's lifetime.
    fn can_seek(&self) -> bool;

    /// Absolute byte position of the next `read`.
    fn position(&self) -> u64;

    /// Total size in bytes, if known. Stable while the source exists.
    fn size(&self) -> Option<u64>;

    /// Reads into `buf`, returning the number of bytes read. Must read at
    /// least one byte unless at EOF.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Seeks to the given absolute byte position, clamping to `size` when
    /// known. Returns the resulting position.
    fn seek(&mut self, position: u64) -> io::Result<u64>;
}

/// Random-access file backend, the default for the CLI.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    size: u64,
    position: u64,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<FileSource, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SourceError::CannotOpen {
            path: path.display().to_string(),
            source,
        })?;
        let size = file.metadata()?.len();
        Ok(FileSource {
            file,
            size,
            position: 0,
        })
    }
}

impl ByteSource for FileSource {
    fn can_seek(&self) -> bool {
        true
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn size(&self) -> Option<u64> {
        Some(self.size)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.file.read(buf)?;
        self.position += count as u64;
        Ok(count)
    }

    fn seek(&mut self, position: u64) -> io::Result<u64> {
        let clamped = position.min(self.size);
        self.position = self.file.seek(SeekFrom::Start(clamped))?;
        Ok(self.position)
    }
}

/// In-memory backend, used by tests and hosts that already own the bytes.
pub struct MemorySource {
    data: Vec<u8>,
    position: usize,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> MemorySource {
        MemorySource {
            data: data.into(),
            position: 0,
        }
    }
}

impl ByteSource for MemorySource {
    fn can_seek(&self) -> bool {
        true
    }

    fn position(&self) -> u64 {
        self.position as u64
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.data[self.position..];
        let count = remaining.len().min(buf.len());
        buf[..count].copy_from_slice(&remaining[..count]);
        self.position += count;
        Ok(count)
    }

    fn seek(&mut self, position: u64) -> io::Result<u64> {
        self.position = (position as usize).min(self.data.len());
        Ok(self.position as u64)
    }
}
