//! Fixed limits of the on-disk formats
//!
//! These are properties of the packed integer layouts, not tuning knobs.
//! Changing any of them changes the on-disk format and requires a full
//! reindex: nothing in the files records which values were used.

/// Bits of a posting reserved for the term weight.
pub const WEIGHT_BITS: u32 = 10;

/// Largest weight a posting can carry; accumulated counts are clamped to it.
pub const MAX_WEIGHT: u32 = (1 << WEIGHT_BITS) - 1;

/// Largest segment-local ordinal that fits beside the weight in 32 bits.
pub const MAX_ORDINAL: u32 = (1 << (32 - WEIGHT_BITS)) - 1;

/// Bits of a composite id used for the ordinal; the shard sits above them.
pub const ORDINAL_BITS: u32 = 24;

/// Mask selecting the ordinal from a composite id.
pub const ORDINAL_MASK: u32 = (1 << ORDINAL_BITS) - 1;

/// Number of shards a composite id can address.
pub const MAX_SEGMENTS: usize = 1 << (32 - ORDINAL_BITS);

/// Reserved forward entries at the start of every segment.
///
/// The first document added to a segment receives this ordinal; the
/// entries below it are written as empty strings.
pub const FORWARD_BASE_ORDINAL: u32 = 100;

/// Size of one `StoredStringArray` header record:
/// `(data_offset << 32 | length)` followed by `extra`, both u64 LE.
pub const HEADER_RECORD_SIZE: usize = 16;

/// Size of one encoded posting.
pub const POSTING_SIZE: usize = 4;

/// Largest byte offset representable in a header record or dictionary extra.
pub const MAX_BLOB_OFFSET: u64 = u32::MAX as u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_and_ordinal_fill_32_bits() {
        assert_eq!(MAX_WEIGHT, 1023);
        assert_eq!((MAX_ORDINAL as u64) << WEIGHT_BITS | MAX_WEIGHT as u64, u32::MAX as u64);
    }

    #[test]
    fn test_posting_ordinal_fits_composite_id() {
        assert!(MAX_ORDINAL <= ORDINAL_MASK);
        assert_eq!(MAX_SEGMENTS, 256);
    }

    #[test]
    fn test_base_ordinal_is_addressable() {
        assert!(FORWARD_BASE_ORDINAL < MAX_ORDINAL);
    }
}
