//! Index segments
//!
//! A segment is one independently built and queried partition of the index,
//! stored in its own `segment.<n>/` directory:
//!
//! ```text
//! segment.<n>/
//!   inverted.header, inverted.data   term dictionary, byte-sorted
//!   forward.header, forward.data     document paths in ordinal order
//!   postings                         little-endian u32 postings, one run per term
//! ```
//!
//! [`SegmentWriter`] is the build side: it buffers postings in memory under a
//! single lock and writes the files once in [`SegmentWriter::flush_to_disk`].
//! [`Segment`] is the query side: it maps the files read-only.

use byteorder::{LittleEndian, WriteBytesExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zearch_core::limits::{FORWARD_BASE_ORDINAL, MAX_BLOB_OFFSET, MAX_ORDINAL, POSTING_SIZE};
use zearch_core::{DocId, Error, IoResultExt, Posting, Result};
use zearch_storage::{MappedFile, StoredStringArray};

use crate::query::PostingsSource;

/// Prefix of the term dictionary files.
pub const INVERTED_NAME: &str = "inverted";
/// Prefix of the forward array files.
pub const FORWARD_NAME: &str = "forward";
/// Name of the postings blob.
pub const POSTINGS_NAME: &str = "postings";

const SEGMENT_DIR_PREFIX: &str = "segment.";

/// Directory name of the segment with number `n`.
pub fn segment_dir_name(n: usize) -> String {
    format!("{}{}", SEGMENT_DIR_PREFIX, n)
}

/// List `segment.<n>` sub-directories of `storage_dir`, ordered by `n`.
///
/// Entries whose suffix is not a decimal number are ignored.
pub fn discover_segments(storage_dir: &Path) -> Result<Vec<(usize, PathBuf)>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(storage_dir).at_path(storage_dir)? {
        let entry = entry.at_path(storage_dir)?;
        let name = entry.file_name();
        let Some(n) = name
            .to_str()
            .and_then(|s| s.strip_prefix(SEGMENT_DIR_PREFIX))
            .and_then(|s| s.parse::<usize>().ok())
        else {
            continue;
        };
        if entry.file_type().at_path(entry.path())?.is_dir() {
            found.push((n, entry.path()));
        }
    }
    found.sort_by_key(|(n, _)| *n);
    Ok(found)
}

// ============================================================================
// Build side
// ============================================================================

struct SegmentBuffer {
    inverted: HashMap<String, Vec<u32>>,
    forward: Vec<String>,
}

impl SegmentBuffer {
    fn new() -> Self {
        Self {
            inverted: HashMap::new(),
            forward: vec![String::new(); FORWARD_BASE_ORDINAL as usize],
        }
    }

    fn add_forward(&mut self, path: &str) -> Result<DocId> {
        let ordinal = self.forward.len() as u64;
        if ordinal > MAX_ORDINAL as u64 {
            return Err(Error::LimitExceeded {
                what: "segment ordinal",
                actual: ordinal,
                max: MAX_ORDINAL as u64,
            });
        }
        self.forward.push(path.to_owned());
        Ok(ordinal as DocId)
    }

    fn add_inverted(&mut self, term: &str, posting: Posting) {
        match self.inverted.get_mut(term) {
            Some(list) => list.push(posting.raw()),
            None => {
                self.inverted.insert(term.to_owned(), vec![posting.raw()]);
            }
        }
    }

    fn documents(&self) -> usize {
        self.forward.len() - FORWARD_BASE_ORDINAL as usize
    }
}

/// What a flush wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushStats {
    /// Documents in the segment, excluding reserved ordinals.
    pub documents: usize,
    /// Distinct terms in the dictionary.
    pub terms: usize,
    /// Size of the postings blob in bytes.
    pub postings_bytes: u64,
}

/// In-memory segment under construction.
///
/// Shared between indexing workers; every document is added inside one
/// critical section so that postings lists stay in ascending ordinal order.
pub struct SegmentWriter {
    dir: PathBuf,
    buffer: Mutex<SegmentBuffer>,
}

impl SegmentWriter {
    /// Create the segment directory and an empty buffer.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).at_path(&dir)?;
        info!(target: "zearch::segment", segment = %dir.display(), "Created segment");
        Ok(Self {
            dir,
            buffer: Mutex::new(SegmentBuffer::new()),
        })
    }

    /// Segment directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Documents added so far.
    pub fn document_count(&self) -> usize {
        self.buffer.lock().documents()
    }

    /// Assign the next ordinal to `path` and append one posting per
    /// `(term, weight)` pair, atomically with respect to other writers.
    ///
    /// Weights above the 10-bit field are clamped. Terms must be distinct.
    pub fn add_document<'t, I>(&self, path: &str, terms: I) -> Result<DocId>
    where
        I: IntoIterator<Item = (&'t str, u32)>,
    {
        let mut buffer = self.buffer.lock();
        let ordinal = buffer.add_forward(path)?;
        for (term, weight) in terms {
            buffer.add_inverted(term, Posting::new(ordinal, weight));
        }
        Ok(ordinal)
    }

    /// Write the buffered segment to its directory and release the buffer.
    ///
    /// Terms are written in byte order, which [`StoredStringArray::bsearch`]
    /// relies on. Files from an earlier flush are overwritten.
    pub fn flush_to_disk(&self) -> Result<FlushStats> {
        let buffer = std::mem::replace(&mut *self.buffer.lock(), SegmentBuffer::new());
        let documents = buffer.documents();

        let mut terms: Vec<(String, Vec<u32>)> = buffer.inverted.into_iter().collect();
        terms.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

        let postings_path = self.dir.join(POSTINGS_NAME);
        let mut postings =
            BufWriter::new(File::create(&postings_path).at_path(&postings_path)?);
        let mut offset: u64 = 0;

        // The dictionary writer hands back each term in iteration order, so the
        // matching postings list is simply the next one.
        let mut lists = terms.iter().map(|(_, list)| list);
        let term_count = StoredStringArray::write(
            &self.dir.join(INVERTED_NAME),
            terms.iter().map(|(term, _)| term),
            |_term| {
                let list = lists
                    .next()
                    .ok_or_else(|| Error::InvalidOperation("postings list missing".into()))?;
                let len = (list.len() * POSTING_SIZE) as u64;
                if offset + len > MAX_BLOB_OFFSET {
                    return Err(Error::LimitExceeded {
                        what: "postings blob size",
                        actual: offset + len,
                        max: MAX_BLOB_OFFSET,
                    });
                }
                for &raw in list {
                    postings
                        .write_u32::<LittleEndian>(raw)
                        .at_path(&postings_path)?;
                }
                let extra = offset << 32 | len;
                offset += len;
                Ok(extra)
            },
        )?;

        let file = postings
            .into_inner()
            .map_err(|e| Error::io_at(&postings_path, e.into_error()))?;
        file.sync_all().at_path(&postings_path)?;

        StoredStringArray::write(&self.dir.join(FORWARD_NAME), buffer.forward.iter(), |_| {
            Ok(0)
        })?;

        info!(
            target: "zearch::segment",
            segment = %self.dir.display(),
            documents,
            terms = term_count,
            postings_bytes = offset,
            "Flushed segment"
        );

        Ok(FlushStats {
            documents,
            terms: term_count,
            postings_bytes: offset,
        })
    }
}

impl std::fmt::Debug for SegmentWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentWriter")
            .field("dir", &self.dir)
            .field("documents", &self.document_count())
            .finish()
    }
}

// ============================================================================
// Query side
// ============================================================================

/// A flushed segment mapped read-only.
pub struct Segment {
    dir: PathBuf,
    dictionary: StoredStringArray,
    forward: StoredStringArray,
    postings: MappedFile,
}

impl Segment {
    /// Map the segment files in `dir`.
    ///
    /// Fails with [`Error::Corruption`] if a dictionary entry addresses bytes
    /// outside the postings blob or a partial posting.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let dictionary = StoredStringArray::open(&dir.join(INVERTED_NAME))?;
        let forward = StoredStringArray::open(&dir.join(FORWARD_NAME))?;
        let postings = MappedFile::open(&dir.join(POSTINGS_NAME))?;

        for id in 0..dictionary.count() as u32 {
            let (offset, len) = dictionary.extra(id).map(split_extra).unwrap_or((0, 0));
            if len % POSTING_SIZE != 0 || offset + len > postings.len() {
                return Err(Error::corruption(format!(
                    "'{}' dictionary entry {} addresses postings {}..{} (blob is {} bytes)",
                    dir.display(),
                    id,
                    offset,
                    offset + len,
                    postings.len()
                )));
            }
        }

        debug!(
            target: "zearch::segment",
            segment = %dir.display(),
            terms = dictionary.count(),
            documents = forward.count().saturating_sub(FORWARD_BASE_ORDINAL as usize),
            "Opened segment"
        );

        Ok(Self {
            dir,
            dictionary,
            forward,
            postings,
        })
    }

    /// Segment directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Raw postings of `term`, empty when the term is absent.
    pub fn find_postings_list(&self, term: &str) -> &[u8] {
        match self.dictionary.bsearch(term.as_bytes()) {
            Some(extra) => {
                let (offset, len) = split_extra(extra);
                &self.postings[offset..offset + len]
            }
            None => &[],
        }
    }

    /// Path stored for `ordinal`, or `None` for reserved, empty or
    /// out-of-range entries.
    pub fn fetch_forward(&self, ordinal: DocId) -> Option<&str> {
        if ordinal < FORWARD_BASE_ORDINAL {
            return None;
        }
        let bytes = self.forward.read(ordinal)?;
        if bytes.is_empty() {
            return None;
        }
        std::str::from_utf8(bytes).ok()
    }

    /// Documents in the segment, excluding reserved ordinals.
    pub fn document_count(&self) -> usize {
        self.forward
            .count()
            .saturating_sub(FORWARD_BASE_ORDINAL as usize)
    }

    /// Distinct terms in the dictionary.
    pub fn term_count(&self) -> usize {
        self.dictionary.count()
    }

    /// Term dictionary.
    pub fn dictionary(&self) -> &StoredStringArray {
        &self.dictionary
    }
}

impl PostingsSource for Segment {
    fn find_postings_list(&self, term: &str) -> &[u8] {
        Segment::find_postings_list(self, term)
    }
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment")
            .field("dir", &self.dir)
            .field("terms", &self.term_count())
            .field("documents", &self.document_count())
            .finish()
    }
}

#[inline]
fn split_extra(extra: u64) -> (usize, usize) {
    ((extra >> 32) as usize, (extra & 0xFFFF_FFFF) as usize)
}
