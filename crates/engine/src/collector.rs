//! Bounded top-K hit collection

/// Default number of hits kept per search.
pub const DEFAULT_TOP_K: usize = 100;

/// Keeps the `limit` highest-scoring items seen, in descending score order.
///
/// Items with equal scores keep their insertion order, so for a stable
/// traversal the earlier document wins ties.
#[derive(Debug, Clone)]
pub struct TopK<T> {
    limit: usize,
    entries: Vec<(i64, T)>,
}

impl<T> TopK<T> {
    /// Create a collector keeping at most `limit` items.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: Vec::with_capacity(limit.min(1024)),
        }
    }

    /// Offer an item. Returns whether it was kept.
    pub fn push(&mut self, score: i64, item: T) -> bool {
        let pos = self.entries.partition_point(|(s, _)| *s >= score);
        if pos >= self.limit {
            return false;
        }
        self.entries.insert(pos, (score, item));
        self.entries.truncate(self.limit);
        true
    }

    /// Number of items kept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been kept.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lowest kept score once the collector is full.
    pub fn threshold(&self) -> Option<i64> {
        if self.entries.len() < self.limit {
            return None;
        }
        self.entries.last().map(|(s, _)| *s)
    }

    /// Kept items, highest score first.
    pub fn into_sorted_vec(self) -> Vec<(i64, T)> {
        self.entries
    }
}
