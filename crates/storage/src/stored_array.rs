//! Memory-mapped array of byte strings with a 64-bit extra per entry
//!
//! Used for both the term dictionary (sorted, extra = postings location) and
//! the forward array (ordinal order, extra unused).
//!
//! ## File Format
//!
//! ```text
//! <name>.header (count × 16 bytes):
//!   per entry:
//!     offset_len            u64 LE    → (data_offset << 32) | byte_length
//!     extra                 u64 LE    → caller-defined
//!
//! <name>.data:
//!   concatenated entry bytes, no separators
//! ```
//!
//! The entry count is `header length / 16`. There is no magic or version:
//! any layout change requires a full reindex.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::cmp::Ordering;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use zearch_core::limits::{HEADER_RECORD_SIZE, MAX_BLOB_OFFSET};
use zearch_core::{Error, IoResultExt, Result};

use crate::mmap::MappedFile;

/// Path of one of the two files backing an array, e.g. `inverted.header`.
fn sibling(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Path of the header file for the array at `prefix`.
pub fn header_path(prefix: &Path) -> PathBuf {
    sibling(prefix, "header")
}

/// Path of the data file for the array at `prefix`.
pub fn data_path(prefix: &Path) -> PathBuf {
    sibling(prefix, "data")
}

/// Immutable, memory-mapped string array.
pub struct StoredStringArray {
    header: MappedFile,
    data: MappedFile,
}

impl StoredStringArray {
    /// Write `items` to `<prefix>.header` / `<prefix>.data`, replacing any
    /// previous contents.
    ///
    /// For item `i` the header records `(running_offset, len(item))` and the
    /// value returned by `extra(item)`. `extra` is called exactly once per
    /// item, in order, so it may itself append to another file.
    ///
    /// Returns the number of entries written.
    pub fn write<I, S, F>(prefix: &Path, items: I, mut extra: F) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
        F: FnMut(&[u8]) -> Result<u64>,
    {
        let header_path = header_path(prefix);
        let data_path = data_path(prefix);
        let mut header = BufWriter::new(File::create(&header_path).at_path(&header_path)?);
        let mut data = BufWriter::new(File::create(&data_path).at_path(&data_path)?);

        let mut offset: u64 = 0;
        let mut count = 0usize;
        for item in items {
            let bytes = item.as_ref();
            let len = bytes.len() as u64;
            if offset > MAX_BLOB_OFFSET || len > MAX_BLOB_OFFSET {
                return Err(Error::LimitExceeded {
                    what: "string data offset",
                    actual: offset + len,
                    max: MAX_BLOB_OFFSET,
                });
            }

            header
                .write_u64::<LittleEndian>(offset << 32 | len)
                .at_path(&header_path)?;
            header
                .write_u64::<LittleEndian>(extra(bytes)?)
                .at_path(&header_path)?;
            data.write_all(bytes).at_path(&data_path)?;

            offset += len;
            count += 1;
        }

        finish(header, &header_path)?;
        finish(data, &data_path)?;
        Ok(count)
    }

    /// Map an array previously produced by [`StoredStringArray::write`].
    ///
    /// Fails with [`Error::Corruption`] if the header is not a whole number of
    /// records or any record points outside the data file.
    pub fn open(prefix: &Path) -> Result<Self> {
        let header = MappedFile::open(&header_path(prefix))?;
        let data = MappedFile::open(&data_path(prefix))?;

        if header.len() % HEADER_RECORD_SIZE != 0 {
            return Err(Error::corruption(format!(
                "'{}' is {} bytes, not a multiple of {}",
                header_path(prefix).display(),
                header.len(),
                HEADER_RECORD_SIZE
            )));
        }

        let array = StoredStringArray { header, data };
        for id in 0..array.count() {
            let (offset, len) = array.offset_len(id);
            if offset + len > array.data.len() {
                return Err(Error::corruption(format!(
                    "'{}' entry {} spans {}..{} past data length {}",
                    header_path(prefix).display(),
                    id,
                    offset,
                    offset + len,
                    array.data.len()
                )));
            }
        }
        Ok(array)
    }

    /// Number of entries.
    #[inline]
    pub fn count(&self) -> usize {
        self.header.len() / HEADER_RECORD_SIZE
    }

    /// Bytes of entry `id`, or `None` if `id` is outside `[0, count())`.
    pub fn read(&self, id: u32) -> Option<&[u8]> {
        let id = id as usize;
        if id >= self.count() {
            return None;
        }
        Some(self.entry(id))
    }

    /// Extra value of entry `id`, or `None` if out of range.
    pub fn extra(&self, id: u32) -> Option<u64> {
        let id = id as usize;
        if id >= self.count() {
            return None;
        }
        Some(self.extra_at(id))
    }

    /// Binary search for `key`, returning its extra on an exact match.
    ///
    /// Entries must have been written in byte-sorted order; the order is not
    /// verified and an unsorted array gives unspecified results.
    pub fn bsearch(&self, key: &[u8]) -> Option<u64> {
        let mut lo = 0usize;
        let mut hi = self.count();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.entry(mid).cmp(key) {
                Ordering::Equal => return Some(self.extra_at(mid)),
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
            }
        }
        None
    }

    #[inline]
    fn offset_len(&self, id: usize) -> (usize, usize) {
        let start = id * HEADER_RECORD_SIZE;
        let packed = LittleEndian::read_u64(&self.header[start..start + 8]);
        ((packed >> 32) as usize, (packed & 0xFFFF_FFFF) as usize)
    }

    #[inline]
    fn extra_at(&self, id: usize) -> u64 {
        let start = id * HEADER_RECORD_SIZE + 8;
        LittleEndian::read_u64(&self.header[start..start + 8])
    }

    #[inline]
    fn entry(&self, id: usize) -> &[u8] {
        let (offset, len) = self.offset_len(id);
        &self.data[offset..offset + len]
    }
}

impl std::fmt::Debug for StoredStringArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredStringArray")
            .field("count", &self.count())
            .field("data_len", &self.data.len())
            .finish()
    }
}

fn finish(writer: BufWriter<File>, path: &Path) -> Result<()> {
    let file = writer
        .into_inner()
        .map_err(|e| Error::io_at(path, e.into_error()))?;
    file.sync_all().at_path(path)
}
