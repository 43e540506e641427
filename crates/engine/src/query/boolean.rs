use super::{PostingsSource, Query};
use zearch_core::{DocId, NO_MORE};

/// Intersection of sub-queries.
///
/// Sub-queries are ordered by ascending cost on prepare; the first one
/// proposes candidates and the rest confirm them.
#[derive(Debug)]
pub struct AndQuery<'s> {
    queries: Vec<Query<'s>>,
    doc_id: Option<DocId>,
}

impl<'s> AndQuery<'s> {
    /// Intersect `queries`. An empty list matches nothing.
    pub fn new(queries: Vec<Query<'s>>) -> Self {
        Self {
            queries,
            doc_id: None,
        }
    }

    /// Number of sub-queries.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Whether there are no sub-queries.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Prepare every sub-query, then order them cheapest first.
    pub fn prepare<S>(&mut self, source: &'s S)
    where
        S: PostingsSource + ?Sized,
    {
        for q in &mut self.queries {
            q.prepare(source);
        }
        self.queries.sort_by_key(|q| q.cost());
        self.doc_id = None;
    }

    /// Current document.
    pub fn doc_id(&self) -> Option<DocId> {
        self.doc_id
    }

    /// Cost of the cheapest sub-query.
    pub fn cost(&self) -> u32 {
        self.queries.iter().map(Query::cost).min().unwrap_or(0)
    }

    /// Sum of all sub-query scores.
    pub fn score(&self) -> i64 {
        match self.doc_id {
            Some(doc) if doc != NO_MORE => self.queries.iter().map(Query::score).sum(),
            _ => 0,
        }
    }

    /// Next document matched by every sub-query.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> DocId {
        if self.queries.is_empty() {
            self.doc_id = Some(NO_MORE);
            return NO_MORE;
        }
        if self.doc_id == Some(NO_MORE) {
            return NO_MORE;
        }
        let candidate = self.queries[0].next();
        let doc = self.next_anded_doc(candidate);
        self.doc_id = Some(doc);
        doc
    }

    /// First document `>= target` matched by every sub-query.
    pub fn advance(&mut self, target: DocId) -> DocId {
        if self.queries.is_empty() {
            self.doc_id = Some(NO_MORE);
            return NO_MORE;
        }
        if let Some(doc) = self.doc_id {
            if doc >= target {
                return doc;
            }
        }
        let candidate = self.queries[0].advance(target);
        let doc = self.next_anded_doc(candidate);
        self.doc_id = Some(doc);
        doc
    }

    /// Merge-join starting from a candidate the first sub-query sits on.
    ///
    /// Whenever a sub-query overshoots, the first one is advanced to the
    /// overshoot and the scan restarts, since earlier agreement no longer
    /// holds.
    fn next_anded_doc(&mut self, mut target: DocId) -> DocId {
        let mut i = 1;
        while i < self.queries.len() {
            if target == NO_MORE {
                return NO_MORE;
            }
            let doc = self.queries[i].advance(target);
            if doc == target {
                i += 1;
                continue;
            }
            target = self.queries[0].advance(doc);
            i = 1;
        }
        target
    }
}

/// Union of sub-queries.
#[derive(Debug)]
pub struct OrQuery<'s> {
    queries: Vec<Query<'s>>,
    doc_id: Option<DocId>,
}

impl<'s> OrQuery<'s> {
    /// Union of `queries`. An empty list matches nothing.
    pub fn new(queries: Vec<Query<'s>>) -> Self {
        Self {
            queries,
            doc_id: None,
        }
    }

    /// Number of sub-queries.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Whether there are no sub-queries.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Prepare every sub-query.
    pub fn prepare<S>(&mut self, source: &'s S)
    where
        S: PostingsSource + ?Sized,
    {
        for q in &mut self.queries {
            q.prepare(source);
        }
        self.doc_id = None;
    }

    /// Current document.
    pub fn doc_id(&self) -> Option<DocId> {
        self.doc_id
    }

    /// Sum of sub-query costs.
    pub fn cost(&self) -> u32 {
        self.queries
            .iter()
            .fold(0u32, |acc, q| acc.saturating_add(q.cost()))
    }

    /// Sum of the scores of sub-queries sitting on the current document.
    pub fn score(&self) -> i64 {
        match self.doc_id {
            Some(doc) if doc != NO_MORE => self
                .queries
                .iter()
                .filter(|q| q.doc_id() == Some(doc))
                .map(Query::score)
                .sum(),
            _ => 0,
        }
    }

    /// Smallest next document across sub-queries.
    ///
    /// Sub-queries on the current document (or not yet positioned) step
    /// forward; the others already sit past it.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> DocId {
        if self.doc_id == Some(NO_MORE) {
            return NO_MORE;
        }
        let current = self.doc_id;
        let mut min = NO_MORE;
        for q in &mut self.queries {
            let doc = match q.doc_id() {
                Some(doc) if Some(doc) != current => doc,
                _ => q.next(),
            };
            min = min.min(doc);
        }
        self.doc_id = Some(min);
        min
    }

    /// Smallest document `>= target` across sub-queries.
    pub fn advance(&mut self, target: DocId) -> DocId {
        if let Some(doc) = self.doc_id {
            if doc >= target {
                return doc;
            }
        }
        let mut min = NO_MORE;
        for q in &mut self.queries {
            min = min.min(q.advance(target));
        }
        self.doc_id = Some(min);
        min
    }
}
