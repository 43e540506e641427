//! Core types for zearch
//!
//! This crate defines the foundational types used throughout the system:
//! - Error: Error type hierarchy and `Result` alias
//! - Posting: packed `(ordinal, weight)` postings entry
//! - CompositeId: shard index plus ordinal, the externally visible document id
//! - Limits: fixed widths of the on-disk formats

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod types;

pub use error::{Error, IoResultExt, Result};
pub use types::{CompositeId, DocId, Posting, NO_MORE};
