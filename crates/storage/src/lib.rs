//! Storage layer for zearch
//!
//! This crate implements the read-only, memory-mapped file formats that
//! make up an on-disk segment:
//! - MappedFile: a whole file mapped read-only (empty files need no mapping)
//! - StoredStringArray: a header of fixed 16-byte records plus a data file of
//!   concatenated bytes, with O(1) lookup by ordinal and O(log n) lookup by key
//!
//! Readers never lock: files are written completely before they are mapped
//! and are never modified while mapped.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod mmap;
pub mod stored_array;

pub use mmap::MappedFile;
pub use stored_array::StoredStringArray;
