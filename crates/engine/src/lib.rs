//! Search engine for zearch
//!
//! This crate builds and queries the segmented index:
//! - Tokenizer: source-code tokens with declaration-keyword boost
//! - Segment: in-memory build, flush to disk, read-only mapped open
//! - Query: Term / And / Or iterators over postings
//! - Index: fan-out over segments, top-K search
//! - IndexHandle: reloadable shared index
//! - Indexer: worker pool, tree walk, segment rotation
//!
//! The engine is the only component that knows how path and content terms
//! are weighted; storage only sees opaque byte strings.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collector;
pub mod config;
pub mod handle;
pub mod index;
pub mod indexer;
pub mod query;
pub mod segment;
pub mod tokenizer;

pub use collector::{TopK, DEFAULT_TOP_K};
pub use config::{IndexConfig, CONFIG_FILE_NAME};
pub use handle::IndexHandle;
pub use index::{Hit, Index, IndexStats, SearchResult};
pub use indexer::{run_indexing, IndexingSummary};
pub use query::{and, or, parse_query, term, PostingsSource, Query};
pub use segment::{Segment, SegmentWriter};
pub use tokenizer::{tokenize, tokenize_query, Token, Tokenizer};
