//! Read-only memory-mapped files

use memmap2::Mmap;
use std::fs::File;
use std::ops::Deref;
use std::path::Path;
use zearch_core::{IoResultExt, Result};

/// A file mapped read-only into memory.
///
/// Zero-length files are represented without a mapping; `mmap(2)` rejects
/// empty regions and a segment flushed with no documents legitimately
/// produces empty files.
pub enum MappedFile {
    /// Zero-length file
    Empty,
    /// Memory-mapped file contents
    Mmap(Mmap),
}

impl MappedFile {
    /// Map an existing file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).at_path(path)?;
        let len = file.metadata().at_path(path)?.len();
        if len == 0 {
            return Ok(MappedFile::Empty);
        }
        // SAFETY: the file is opened read-only and index files are never
        // modified after they are flushed; a rebuild writes new directories.
        let mmap = unsafe { Mmap::map(&file) }.at_path(path)?;
        Ok(MappedFile::Mmap(mmap))
    }

    /// Mapped bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            MappedFile::Empty => &[],
            MappedFile::Mmap(m) => m,
        }
    }
}

impl Deref for MappedFile {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl std::fmt::Debug for MappedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MappedFile::Empty => f.write_str("MappedFile::Empty"),
            MappedFile::Mmap(m) => write!(f, "MappedFile::Mmap({} bytes)", m.len()),
        }
    }
}
