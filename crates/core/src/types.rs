//! Packed identifier and posting types
//!
//! - [`DocId`]: a segment-local document ordinal as seen by query iterators
//! - [`Posting`]: one `(ordinal, weight)` entry of a postings list
//! - [`CompositeId`]: shard index plus ordinal, the externally visible id

use crate::limits::{MAX_ORDINAL, MAX_SEGMENTS, MAX_WEIGHT, ORDINAL_BITS, ORDINAL_MASK, WEIGHT_BITS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Segment-local document id produced by query iterators.
pub type DocId = u32;

/// Sentinel returned by an exhausted iterator.
///
/// Compares greater than every real document id, so `min` over a set of
/// iterator positions yields `NO_MORE` only when all of them are exhausted.
pub const NO_MORE: DocId = DocId::MAX;

/// One entry of a postings list: `(ordinal << 10) | weight`.
///
/// Ordering of the raw value follows ordinal order, which is what the
/// binary searches over a postings run rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Posting(u32);

impl Posting {
    /// Pack an ordinal and a weight. The weight is clamped to [`MAX_WEIGHT`].
    ///
    /// # Panics
    ///
    /// Debug builds assert `ordinal <= MAX_ORDINAL`; callers enforce this
    /// when assigning ordinals.
    #[inline]
    pub fn new(ordinal: u32, weight: u32) -> Self {
        debug_assert!(ordinal <= MAX_ORDINAL, "ordinal {} out of range", ordinal);
        Posting(ordinal << WEIGHT_BITS | weight.min(MAX_WEIGHT))
    }

    /// Reinterpret a raw encoded value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Posting(raw)
    }

    /// Raw encoded value, as written to the postings blob.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Segment-local document ordinal.
    #[inline]
    pub const fn ordinal(self) -> DocId {
        self.0 >> WEIGHT_BITS
    }

    /// Term weight in `[0, 1023]`.
    #[inline]
    pub const fn weight(self) -> u32 {
        self.0 & MAX_WEIGHT
    }
}

/// Globally addressable document id: `(shard << 24) | ordinal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeId(u32);

impl CompositeId {
    /// Combine a shard index and a segment-local ordinal.
    ///
    /// # Panics
    ///
    /// Debug builds assert the shard is below [`MAX_SEGMENTS`] and the
    /// ordinal fits in 24 bits; `Index::open` refuses larger layouts.
    #[inline]
    pub fn new(shard: usize, ordinal: DocId) -> Self {
        debug_assert!(shard < MAX_SEGMENTS, "shard {} out of range", shard);
        debug_assert!(ordinal <= ORDINAL_MASK, "ordinal {} out of range", ordinal);
        CompositeId((shard as u32) << ORDINAL_BITS | (ordinal & ORDINAL_MASK))
    }

    /// Reinterpret a raw id, e.g. one received from a client.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        CompositeId(raw)
    }

    /// Raw packed value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Shard (segment position) this id belongs to.
    #[inline]
    pub const fn shard(self) -> usize {
        (self.0 >> ORDINAL_BITS) as usize
    }

    /// Ordinal within the shard.
    #[inline]
    pub const fn ordinal(self) -> DocId {
        self.0 & ORDINAL_MASK
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_posting_packs_ordinal_and_weight() {
        let p = Posting::new(4, 17);
        assert_eq!(p.raw(), 4 << 10 | 17);
        assert_eq!(p.ordinal(), 4);
        assert_eq!(p.weight(), 17);
    }

    #[test]
    fn test_posting_clamps_weight() {
        let p = Posting::new(9, 5000);
        assert_eq!(p.weight(), 1023);
        assert_eq!(p.ordinal(), 9);
    }

    #[test]
    fn test_posting_order_follows_ordinal() {
        assert!(Posting::new(1, 1023) < Posting::new(2, 0));
    }

    #[test]
    fn test_composite_id_splits() {
        let id = CompositeId::new(3, 150);
        assert_eq!(id.raw(), 3 << 24 | 150);
        assert_eq!(id.shard(), 3);
        assert_eq!(id.ordinal(), 150);
    }

    #[test]
    fn test_composite_id_serializes_as_number() {
        let id = CompositeId::new(1, 7);
        assert_eq!(serde_json::to_string(&id).unwrap(), (1u32 << 24 | 7).to_string());
    }

    #[test]
    fn test_no_more_is_greater_than_any_ordinal() {
        assert!(NO_MORE > MAX_ORDINAL);
    }

    proptest! {
        #[test]
        fn prop_composite_id_preserves_parts(shard in 0usize..256, ordinal in 0u32..=ORDINAL_MASK) {
            let id = CompositeId::new(shard, ordinal);
            prop_assert_eq!(id.shard(), shard);
            prop_assert_eq!(id.ordinal(), ordinal);
        }
    }
}
