//! Multi-segment index
//!
//! An [`Index`] is the ordered set of segments found in a storage directory.
//! A segment's position in that order is its shard index, which forms the
//! top byte of every [`CompositeId`] handed out by queries.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use zearch_core::limits::MAX_SEGMENTS;
use zearch_core::{CompositeId, Error, IoResultExt, Result, NO_MORE};

use crate::collector::TopK;
use crate::config::IndexConfig;
use crate::query::{parse_query, Query};
use crate::segment::{discover_segments, Segment};
use crate::tokenizer::Tokenizer;

/// Aggregate counts across segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexStats {
    /// Documents across all segments.
    pub documents: u64,
    /// Sum of per-segment dictionary sizes. Terms present in several
    /// segments are counted once per segment.
    pub approx_terms: u64,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Hit {
    /// Indexed file path.
    pub path: String,
    /// Composite document id, usable with [`Index::fetch_forward`].
    pub id: CompositeId,
    /// Query score.
    pub score: i64,
}

/// Outcome of [`Index::search`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchResult {
    /// Best hits, highest score first.
    pub hits: Vec<Hit>,
    /// Every document the query matched, not only the kept hits.
    pub files_matching: u64,
    /// Documents in the index.
    pub files_in_index: u64,
    /// Approximate distinct terms in the index.
    pub tokens_in_index: u64,
    /// Wall time of the search.
    pub took_seconds: f64,
}

/// Read-only index over all segments of a storage directory.
pub struct Index {
    dir: PathBuf,
    segments: Vec<Segment>,
    tokenizer: Tokenizer,
}

impl Index {
    /// Open the index in `dir`, reading `zearch.toml` there if present.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config = IndexConfig::load_or_default(dir)?;
        Self::open_with_config(dir, &config)
    }

    /// Open the index in `dir` with an explicit configuration.
    ///
    /// Any unreadable or malformed segment fails the whole open.
    pub fn open_with_config(dir: impl AsRef<Path>, config: &IndexConfig) -> Result<Self> {
        let dir = dir.as_ref();
        let started = Instant::now();
        if !std::fs::metadata(dir).at_path(dir)?.is_dir() {
            return Err(Error::InvalidOperation(format!(
                "'{}' is not a directory",
                dir.display()
            )));
        }

        let found = discover_segments(dir)?;
        if found.len() > MAX_SEGMENTS {
            return Err(Error::LimitExceeded {
                what: "segment count",
                actual: found.len() as u64,
                max: MAX_SEGMENTS as u64,
            });
        }

        let segments = found
            .into_iter()
            .map(|(_, path)| Segment::open(path))
            .collect::<Result<Vec<_>>>()?;

        let index = Self {
            dir: dir.to_path_buf(),
            segments,
            tokenizer: Tokenizer::new(config.max_token_len),
        };
        let stats = index.stats();
        info!(
            target: "zearch::index",
            dir = %dir.display(),
            segments = index.segments.len(),
            documents = stats.documents,
            terms = stats.approx_terms,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Opened index"
        );
        Ok(index)
    }

    /// Storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Segments in shard order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Tokenizer matching the one used at index time.
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Run `query` over every segment in order, calling `on_hit` for each
    /// matching document.
    pub fn execute_query<'s, F>(&'s self, query: &mut Query<'s>, mut on_hit: F)
    where
        F: FnMut(CompositeId, i64),
    {
        for (shard, segment) in self.segments.iter().enumerate() {
            query.prepare(segment);
            loop {
                let doc = query.next();
                if doc == NO_MORE {
                    break;
                }
                on_hit(CompositeId::new(shard, doc), query.score());
            }
        }
    }

    /// Path of the document behind `id`, or `None` if the shard or ordinal
    /// is out of range or reserved.
    pub fn fetch_forward(&self, id: CompositeId) -> Option<&str> {
        self.segments.get(id.shard())?.fetch_forward(id.ordinal())
    }

    /// Document and term counts summed over segments.
    pub fn stats(&self) -> IndexStats {
        self.segments
            .iter()
            .fold(IndexStats::default(), |acc, s| IndexStats {
                documents: acc.documents + s.document_count() as u64,
                approx_terms: acc.approx_terms + s.term_count() as u64,
            })
    }

    /// Parse `text`, run it, and return the `limit` best hits with paths.
    pub fn search(&self, text: &str, limit: usize) -> SearchResult {
        let started = Instant::now();
        let mut query = parse_query(text, &self.tokenizer);

        let mut matching = 0u64;
        let mut top = TopK::new(limit);
        self.execute_query(&mut query, |id, score| {
            matching += 1;
            if top.threshold().map_or(true, |t| score > t) {
                top.push(score, id);
            }
        });

        let hits = top
            .into_sorted_vec()
            .into_iter()
            .map(|(score, id)| Hit {
                path: self.fetch_forward(id).unwrap_or_default().to_owned(),
                id,
                score,
            })
            .collect();

        let stats = self.stats();
        SearchResult {
            hits,
            files_matching: matching,
            files_in_index: stats.documents,
            tokens_in_index: stats.approx_terms,
            took_seconds: started.elapsed().as_secs_f64(),
        }
    }

    /// Unmap all segments.
    pub fn close(self) {
        info!(
            target: "zearch::index",
            dir = %self.dir.display(),
            segments = self.segments.len(),
            "Closed index"
        );
    }
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("dir", &self.dir)
            .field("segments", &self.segments.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{and, or, term};
    use crate::segment::{segment_dir_name, SegmentWriter};
    use tempfile::TempDir;

    /// Build one segment per entry of `shards`, each a list of
    /// `(path, [(term, weight)])`.
    fn build(dir: &Path, shards: &[Vec<(&str, Vec<(&str, u32)>)>]) {
        for (n, docs) in shards.iter().enumerate() {
            let writer = SegmentWriter::create(dir.join(segment_dir_name(n))).unwrap();
            for (path, terms) in docs {
                writer
                    .add_document(path, terms.iter().map(|(t, w)| (*t, *w)))
                    .unwrap();
            }
            writer.flush_to_disk().unwrap();
        }
    }

    fn fixture() -> TempDir {
        let tmp = TempDir::new().unwrap();
        build(
            tmp.path(),
            &[
                vec![
                    ("a/Foo.java", vec![("foo", 10), ("shared", 1)]),
                    ("a/Bar.java", vec![("bar", 3), ("shared", 1)]),
                ],
                vec![("b/Foo.go", vec![("foo", 2), ("baz", 1)])],
            ],
        );
        tmp
    }

    #[test]
    fn test_open_and_stats() {
        let tmp = fixture();
        let index = Index::open(tmp.path()).unwrap();
        assert_eq!(index.segments().len(), 2);
        assert_eq!(
            index.stats(),
            IndexStats {
                documents: 3,
                approx_terms: 5,
            }
        );
        index.close();
    }

    #[test]
    fn test_execute_query_spans_segments() {
        let tmp = fixture();
        let index = Index::open(tmp.path()).unwrap();

        let mut query = term("foo");
        let mut hits = Vec::new();
        index.execute_query(&mut query, |id, score| hits.push((id, score)));

        assert_eq!(
            hits,
            vec![
                (CompositeId::new(0, 100), 11),
                (CompositeId::new(1, 100), 3),
            ]
        );
        assert_eq!(index.fetch_forward(hits[0].0), Some("a/Foo.java"));
        assert_eq!(index.fetch_forward(hits[1].0), Some("b/Foo.go"));
    }

    #[test]
    fn test_query_tree_reused_across_segments() {
        let tmp = fixture();
        let index = Index::open(tmp.path()).unwrap();

        let mut query = or(vec![term("shared"), term("baz")]);
        let mut ids = Vec::new();
        index.execute_query(&mut query, |id, _| ids.push(id));
        assert_eq!(
            ids,
            vec![
                CompositeId::new(0, 100),
                CompositeId::new(0, 101),
                CompositeId::new(1, 100),
            ]
        );

        let mut query = and(vec![term("foo"), term("shared")]);
        let mut ids = Vec::new();
        index.execute_query(&mut query, |id, _| ids.push(id));
        assert_eq!(ids, vec![CompositeId::new(0, 100)]);
    }

    #[test]
    fn test_fetch_forward_out_of_range() {
        let tmp = fixture();
        let index = Index::open(tmp.path()).unwrap();
        assert_eq!(index.fetch_forward(CompositeId::new(2, 100)), None);
        assert_eq!(index.fetch_forward(CompositeId::new(1, 101)), None);
        assert_eq!(index.fetch_forward(CompositeId::new(0, 5)), None);
    }

    #[test]
    fn test_search_ranks_and_counts() {
        let tmp = fixture();
        let index = Index::open(tmp.path()).unwrap();

        let result = index.search("FOO", 1);
        assert_eq!(result.files_matching, 2);
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].path, "a/Foo.java");
        assert_eq!(result.hits[0].score, 11);
        assert_eq!(result.files_in_index, 3);
        assert_eq!(result.tokens_in_index, 5);

        let result = index.search("nothing_here", 100);
        assert_eq!(result.files_matching, 0);
        assert!(result.hits.is_empty());
    }

    #[test]
    fn test_search_limit_keeps_earliest_of_tied_hits() {
        let tmp = fixture();
        let index = Index::open(tmp.path()).unwrap();

        let result = index.search("shared", 1);
        assert_eq!(result.files_matching, 2);
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].path, "a/Foo.java");
        assert_eq!(result.hits[0].score, 2);
    }

    #[test]
    fn test_search_result_json_field_names() {
        let tmp = fixture();
        let index = Index::open(tmp.path()).unwrap();
        let result = index.search("bar", 10);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["FilesMatching"], 1);
        assert_eq!(json["FilesInIndex"], 3);
        assert_eq!(json["TokensInIndex"], 5);
        assert!(json["TookSeconds"].is_f64());
        assert_eq!(json["Hits"][0]["Path"], "a/Bar.java");
        assert_eq!(json["Hits"][0]["Score"], 4);
        assert_eq!(json["Hits"][0]["Id"], 101);
    }

    #[test]
    fn test_empty_storage_dir() {
        let tmp = TempDir::new().unwrap();
        let index = Index::open(tmp.path()).unwrap();
        assert_eq!(index.stats(), IndexStats::default());
        assert_eq!(index.search("foo", 10).files_matching, 0);
    }

    #[test]
    fn test_missing_storage_dir_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            Index::open(tmp.path().join("nope")),
            Err(Error::SegmentIo { .. })
        ));
    }

    #[test]
    fn test_corrupt_segment_fails_open() {
        let tmp = fixture();
        std::fs::write(
            tmp.path().join("segment.1").join("inverted.header"),
            [0u8; 7],
        )
        .unwrap();
        assert!(matches!(
            Index::open(tmp.path()),
            Err(Error::Corruption(_))
        ));
    }
}
