//! Query engine
//!
//! A query is a small tree of iterators over postings lists. Each node walks
//! document ids of one segment in ascending order:
//!
//! ```text
//! prepare ──► not ready ──► positioned (ascending ids) ──► NO_MORE
//! ```
//!
//! [`Query::prepare`] binds the tree to a segment and resets every cursor, so
//! one tree instance is reused across all segments of an index.
//!
//! - [`TermQuery`]: one term's postings, cost = postings count.
//! - [`AndQuery`]: intersection, cheapest sub-query drives the merge-join.
//! - [`OrQuery`]: union, score sums the sub-queries on the current document.

mod boolean;
mod term;

pub use boolean::{AndQuery, OrQuery};
pub use term::TermQuery;

use crate::tokenizer::Tokenizer;
use zearch_core::DocId;

/// Anything that can hand out raw postings for a term.
///
/// The returned bytes are packed little-endian `u32` postings in ascending
/// ordinal order; an absent term yields an empty slice.
pub trait PostingsSource {
    /// Postings of `term`, empty when absent.
    fn find_postings_list(&self, term: &str) -> &[u8];
}

/// A query node.
///
/// `'s` is the lifetime of the postings the tree is prepared against.
#[derive(Debug)]
pub enum Query<'s> {
    /// Single term
    Term(TermQuery<'s>),
    /// Intersection of sub-queries
    And(AndQuery<'s>),
    /// Union of sub-queries
    Or(OrQuery<'s>),
}

impl<'s> Query<'s> {
    /// Bind the tree to `source` and reset it to the not-ready state.
    pub fn prepare<S>(&mut self, source: &'s S)
    where
        S: PostingsSource + ?Sized,
    {
        match self {
            Query::Term(q) => q.prepare(source),
            Query::And(q) => q.prepare(source),
            Query::Or(q) => q.prepare(source),
        }
    }

    /// Position at the first document `>= target` and return it.
    ///
    /// A node already at or past `target` stays where it is.
    pub fn advance(&mut self, target: DocId) -> DocId {
        match self {
            Query::Term(q) => q.advance(target),
            Query::And(q) => q.advance(target),
            Query::Or(q) => q.advance(target),
        }
    }

    /// Move to the next matching document, or `NO_MORE`.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> DocId {
        match self {
            Query::Term(q) => q.next(),
            Query::And(q) => q.next(),
            Query::Or(q) => q.next(),
        }
    }

    /// Current document, `None` before the first positioning.
    pub fn doc_id(&self) -> Option<DocId> {
        match self {
            Query::Term(q) => q.doc_id(),
            Query::And(q) => q.doc_id(),
            Query::Or(q) => q.doc_id(),
        }
    }

    /// Score of the current document; 0 when not positioned on one.
    pub fn score(&self) -> i64 {
        match self {
            Query::Term(q) => q.score(),
            Query::And(q) => q.score(),
            Query::Or(q) => q.score(),
        }
    }

    /// Estimated number of matches, used to order intersections.
    pub fn cost(&self) -> u32 {
        match self {
            Query::Term(q) => q.cost(),
            Query::And(q) => q.cost(),
            Query::Or(q) => q.cost(),
        }
    }
}

/// Query matching documents containing `text`, which is used verbatim.
pub fn term<'s>(text: impl Into<String>) -> Query<'s> {
    Query::Term(TermQuery::new(text))
}

/// Query matching documents matched by every sub-query.
pub fn and(queries: Vec<Query<'_>>) -> Query<'_> {
    Query::And(AndQuery::new(queries))
}

/// Query matching documents matched by any sub-query.
pub fn or(queries: Vec<Query<'_>>) -> Query<'_> {
    Query::Or(OrQuery::new(queries))
}

/// Build the default conjunctive query for a search string.
///
/// One term becomes a [`TermQuery`]; several are intersected. A string
/// without terms yields an empty intersection, which matches nothing.
pub fn parse_query<'s>(text: &str, tokenizer: &Tokenizer) -> Query<'s> {
    let mut terms: Vec<Query<'s>> = tokenizer.query_terms(text).into_iter().map(term).collect();
    if terms.len() == 1 {
        return terms.remove(0);
    }
    and(terms)
}


#[cfg(test)]
mod tests {
    use super::test_support::{drain, MemorySource};
    use super::*;

    #[test]
    fn test_parse_single_term() {
        let q = parse_query("Foo", &Tokenizer::default());
        match q {
            Query::Term(t) => assert_eq!(t.term(), "foo"),
            other => panic!("expected term, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_multiple_terms_is_and() {
        let q = parse_query("foo bar", &Tokenizer::default());
        assert!(matches!(q, Query::And(ref a) if a.len() == 2));
    }

    #[test]
    fn test_parse_empty_matches_nothing() {
        let source = MemorySource::default().with("foo", &[(1, 0)]);
        let mut q = parse_query(" {} ", &Tokenizer::default());
        q.prepare(&source);
        assert!(drain(&mut q).is_empty());
    }

    #[test]
    fn test_parse_truncates_like_indexing() {
        let source = MemorySource::default().with("abcd", &[(3, 0)]);
        let mut q = parse_query("ABCDEFG", &Tokenizer::new(4));
        q.prepare(&source);
        assert_eq!(drain(&mut q), vec![(3, 1)]);
    }

    #[test]
    fn test_nested_or_inside_and() {
        let source = MemorySource::default()
            .with("a", &[(1, 0), (5, 0), (9, 0)])
            .with("b", &[(5, 0)])
            .with("c", &[(9, 2)]);
        let mut q = and(vec![term("a"), or(vec![term("b"), term("c")])]);
        q.prepare(&source);
        assert_eq!(drain(&mut q), vec![(5, 2), (9, 4)]);
    }

    #[test]
    fn test_prepare_resets_between_sources() {
        let first = MemorySource::default().with("x", &[(1, 0), (2, 0)]);
        let second = MemorySource::default().with("x", &[(7, 0)]);
        let mut q = and(vec![term("x"), term("x")]);

        q.prepare(&first);
        assert_eq!(q.doc_id(), None);
        assert_eq!(drain(&mut q).len(), 2);
        assert_eq!(q.doc_id(), Some(zearch_core::NO_MORE));

        q.prepare(&second);
        assert_eq!(q.doc_id(), None);
        assert_eq!(drain(&mut q), vec![(7, 2)]);
    }
}
