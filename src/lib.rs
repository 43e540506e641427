//! zearch - code search over memory-mapped inverted index segments
//!
//! Source trees are tokenized into weighted terms and written as immutable
//! segments. Queries intersect or union postings lists across segments and
//! return the best-scoring files.
//!
//! # Quick Start
//!
//! ```ignore
//! use zearch::{run_indexing, Index, IndexConfig};
//!
//! // Build the index (blocks until every segment is flushed)
//! run_indexing("/var/lib/zearch", &["/src/project"], &IndexConfig::default())?;
//!
//! // Query it
//! let index = Index::open("/var/lib/zearch")?;
//! let result = index.search("AtomicLong incrementAndGet", 100);
//! for hit in &result.hits {
//!     println!("{} {}", hit.score, hit.path);
//! }
//! ```
//!
//! # Architecture
//!
//! - `zearch-core`: errors, packed posting and document id types, format limits
//! - `zearch-storage`: memory-mapped files and the stored string array format
//! - `zearch-engine`: tokenizer, segments, query engine, indexing pipeline
//!
//! This crate re-exports the engine API.

pub use zearch_core::{CompositeId, DocId, Error, Posting, Result, NO_MORE};
pub use zearch_engine::*;
pub use zearch_storage::StoredStringArray;
