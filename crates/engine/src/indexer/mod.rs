//! Concurrent indexing pipeline
//!
//! [`run_indexing`] walks the source roots and feeds every accepted file to
//! a worker pool. Each file goes to a random segment among the currently
//! open batch. Every `docs_per_rotation` files the batch is rotated:
//!
//! 1. stop the pool, letting it drain the queue
//! 2. flush the open segments in parallel
//! 3. create `segments_per_rotation` fresh segments
//! 4. start the pool again
//!
//! After the walk a last stop and flush persists the final batch.

mod accumulator;
mod walker;
mod workers;

use rand::rngs::ThreadRng;
use rand::Rng;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use zearch_core::limits::MAX_SEGMENTS;
use zearch_core::{Error, IoResultExt, Result};

use crate::config::{IndexConfig, CONFIG_FILE_NAME};
use crate::segment::{discover_segments, segment_dir_name, SegmentWriter};
use workers::{IndexJob, WorkerPool};

/// Outcome of an indexing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingSummary {
    /// Files added to a segment.
    pub files_indexed: u64,
    /// Accepted files that could not be indexed.
    pub files_skipped: u64,
    /// Segments written.
    pub segments: usize,
    /// Wall time of the run.
    pub elapsed: Duration,
}

/// Build a fresh index of `roots` in `storage_dir`.
///
/// Existing `segment.*` directories in `storage_dir` are removed first and
/// `config` is saved as `zearch.toml` there, so a later `Index::open`
/// tokenizes queries the same way. The
/// call returns once every file is indexed and every segment flushed. A
/// missing root or a failure to create or flush a segment aborts the run;
/// unreadable files are logged and skipped.
pub fn run_indexing<P>(
    storage_dir: impl AsRef<Path>,
    roots: &[P],
    config: &IndexConfig,
) -> Result<IndexingSummary>
where
    P: AsRef<Path>,
{
    let storage_dir = storage_dir.as_ref();
    let started = Instant::now();
    config.validate()?;

    for root in roots {
        let root = root.as_ref();
        std::fs::metadata(root).at_path(root)?;
    }

    std::fs::create_dir_all(storage_dir).at_path(storage_dir)?;
    config.write_to_file(&storage_dir.join(CONFIG_FILE_NAME))?;
    for (_, stale) in discover_segments(storage_dir)? {
        warn!(target: "zearch::indexer", segment = %stale.display(), "Removing stale segment");
        std::fs::remove_dir_all(&stale).at_path(&stale)?;
    }

    info!(
        target: "zearch::indexer",
        storage = %storage_dir.display(),
        roots = roots.len(),
        workers = config.worker_count(),
        "Indexing started"
    );

    let mut pipeline = Pipeline::start(storage_dir, config)?;
    for root in roots {
        walker::walk(root.as_ref(), config, &mut |path| pipeline.submit(path))?;
    }
    let mut summary = pipeline.finish()?;
    summary.elapsed = started.elapsed();

    info!(
        target: "zearch::indexer",
        files_indexed = summary.files_indexed,
        files_skipped = summary.files_skipped,
        segments = summary.segments,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Indexing finished"
    );
    Ok(summary)
}

/// Rotation state of one indexing run.
struct Pipeline<'c> {
    storage_dir: PathBuf,
    config: &'c IndexConfig,
    pool: WorkerPool,
    open: Vec<Arc<SegmentWriter>>,
    next_segment: usize,
    since_rotation: usize,
    unaddressable: u64,
    rng: ThreadRng,
}

impl<'c> Pipeline<'c> {
    fn start(storage_dir: &Path, config: &'c IndexConfig) -> Result<Self> {
        let mut pipeline = Self {
            storage_dir: storage_dir.to_path_buf(),
            config,
            pool: WorkerPool::new(config.worker_count(), config.clone()),
            open: Vec::new(),
            next_segment: 0,
            since_rotation: 0,
            unaddressable: 0,
            rng: rand::thread_rng(),
        };
        pipeline.open_batch()?;
        pipeline.pool.start()?;
        Ok(pipeline)
    }

    fn submit(&mut self, path: PathBuf) -> Result<()> {
        let Some(path) = path.to_str().map(str::to_owned) else {
            warn!(target: "zearch::indexer", path = %path.display(), "Skipping non UTF-8 path");
            self.unaddressable += 1;
            return Ok(());
        };

        if self.since_rotation == self.config.docs_per_rotation {
            self.rotate()?;
        }
        self.since_rotation += 1;

        let segment = Arc::clone(&self.open[self.rng.gen_range(0..self.open.len())]);
        self.pool.submit(IndexJob { path, segment });
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        self.stop_and_flush()?;
        self.open_batch()?;
        self.since_rotation = 0;
        self.pool.start()
    }

    fn finish(mut self) -> Result<IndexingSummary> {
        self.stop_and_flush()?;
        Ok(IndexingSummary {
            files_indexed: self.pool.indexed(),
            files_skipped: self.pool.skipped() + self.unaddressable,
            segments: self.next_segment,
            elapsed: Duration::ZERO,
        })
    }

    fn open_batch(&mut self) -> Result<()> {
        let end = self.next_segment + self.config.segments_per_rotation;
        if end > MAX_SEGMENTS {
            return Err(Error::LimitExceeded {
                what: "segment count",
                actual: end as u64,
                max: MAX_SEGMENTS as u64,
            });
        }
        self.open = (self.next_segment..end)
            .map(|n| {
                SegmentWriter::create(self.storage_dir.join(segment_dir_name(n))).map(Arc::new)
            })
            .collect::<Result<Vec<_>>>()?;
        self.next_segment = end;
        Ok(())
    }

    fn stop_and_flush(&mut self) -> Result<()> {
        self.pool.stop();
        if let Some(e) = self.pool.take_failure() {
            return Err(e);
        }
        let batch = std::mem::take(&mut self.open);
        batch
            .par_iter()
            .map(|segment| segment.flush_to_disk())
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Index;
    use crate::segment::Segment;
    use byteorder::{ByteOrder, LittleEndian};
    use proptest::prelude::*;
    use tempfile::TempDir;
    use zearch_core::Posting;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn config(docs_per_rotation: usize, segments_per_rotation: usize) -> IndexConfig {
        IndexConfig {
            docs_per_rotation,
            segments_per_rotation,
            workers: 4,
            ..IndexConfig::default()
        }
    }

    fn assert_postings_ascending(segment: &Segment) {
        let dict = segment.dictionary();
        for id in 0..dict.count() as u32 {
            let term = std::str::from_utf8(dict.read(id).unwrap()).unwrap();
            let ordinals: Vec<u32> = segment
                .find_postings_list(term)
                .chunks_exact(4)
                .map(|c| Posting::from_raw(LittleEndian::read_u32(c)).ordinal())
                .collect();
            assert!(
                ordinals.windows(2).all(|w| w[0] < w[1]),
                "postings of {:?} out of order: {:?}",
                term,
                ordinals
            );
        }
    }

    #[test]
    fn test_index_and_search() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "foo/Bar.java", "class Bar { void run() {} }");
        write(src.path(), "foo/Baz.java", "class Baz { Bar bar; }");
        write(src.path(), "foo/readme.txt", "bar bar bar");

        let summary = run_indexing(out.path(), &[src.path()], &config(15_000, 2)).unwrap();
        assert_eq!(summary.files_indexed, 2);
        assert_eq!(summary.files_skipped, 0);
        assert_eq!(summary.segments, 2);

        let index = Index::open(out.path()).unwrap();
        assert_eq!(index.stats().documents, 2);
        let result = index.search("bar", 10);
        assert_eq!(result.files_matching, 2);
        assert!(result.hits[0].path.ends_with("Bar.java"));
    }

    #[test]
    fn test_rotation_creates_segments() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        for i in 0..5 {
            write(src.path(), &format!("f{}.go", i), "package main");
        }

        let summary = run_indexing(out.path(), &[src.path()], &config(2, 1)).unwrap();
        assert_eq!(summary.files_indexed, 5);
        assert_eq!(summary.segments, 3);

        let index = Index::open(out.path()).unwrap();
        let per_segment: Vec<usize> = index
            .segments()
            .iter()
            .map(Segment::document_count)
            .collect();
        assert_eq!(per_segment, vec![2, 2, 1]);
        assert_eq!(index.search("main", 10).files_matching, 5);
    }

    #[test]
    fn test_stale_segments_are_replaced() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "a.c", "int first");
        run_indexing(out.path(), &[src.path()], &config(1, 1)).unwrap();
        write(src.path(), "b.c", "int second");
        run_indexing(out.path(), &[src.path()], &config(1, 1)).unwrap();

        std::fs::remove_file(src.path().join("a.c")).unwrap();
        std::fs::remove_file(src.path().join("b.c")).unwrap();
        write(src.path(), "c.c", "int third");
        let summary = run_indexing(out.path(), &[src.path()], &config(100, 1)).unwrap();
        assert_eq!(summary.segments, 1);

        let found = discover_segments(out.path()).unwrap();
        assert_eq!(found.len(), 1);
        let index = Index::open(out.path()).unwrap();
        assert_eq!(index.stats().documents, 1);
        assert_eq!(index.search("first", 10).files_matching, 0);
    }

    #[test]
    fn test_open_uses_config_of_the_build() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "Main.go", "func VeryLongIdentifierName() {}");

        let config = IndexConfig {
            max_token_len: 8,
            ..config(100, 1)
        };
        run_indexing(out.path(), &[src.path()], &config).unwrap();

        assert_eq!(
            IndexConfig::load_or_default(out.path()).unwrap(),
            config
        );
        let index = Index::open(out.path()).unwrap();
        assert_eq!(index.tokenizer().max_token_len(), 8);
        assert_eq!(index.search("VeryLongIdentifierName", 10).files_matching, 1);

        // a later default build replaces the saved config
        run_indexing(out.path(), &[src.path()], &IndexConfig::default()).unwrap();
        let index = Index::open(out.path()).unwrap();
        assert_eq!(index.tokenizer().max_token_len(), 64);
        assert_eq!(index.search("VeryLongIdentifierName", 10).files_matching, 1);
    }

    #[test]
    fn test_missing_root_aborts() {
        let out = TempDir::new().unwrap();
        let missing = out.path().join("nope");
        assert!(matches!(
            run_indexing(out.path(), &[missing], &IndexConfig::default()),
            Err(Error::SegmentIo { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let out = TempDir::new().unwrap();
        let bad = IndexConfig {
            docs_per_rotation: 0,
            ..IndexConfig::default()
        };
        let roots: [&Path; 0] = [];
        assert!(matches!(
            run_indexing(out.path(), &roots, &bad),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_too_many_segments() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        for i in 0..3 {
            write(src.path(), &format!("f{}.go", i), "package main");
        }
        let config = IndexConfig {
            docs_per_rotation: 1,
            segments_per_rotation: 128,
            ..IndexConfig::default()
        };
        assert!(matches!(
            run_indexing(out.path(), &[src.path()], &config),
            Err(Error::LimitExceeded { .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn prop_postings_ascending_under_concurrency(
            files in prop::collection::vec(
                prop::collection::vec(prop::sample::select(vec!["alpha", "beta", "gamma", "delta"]), 1..6),
                1..60,
            ),
            docs_per_rotation in 5usize..40,
        ) {
            let src = TempDir::new().unwrap();
            let out = TempDir::new().unwrap();
            for (i, words) in files.iter().enumerate() {
                write(src.path(), &format!("d{}/f{}.go", i % 3, i), &words.join(" "));
            }

            let summary = run_indexing(out.path(), &[src.path()], &config(docs_per_rotation, 2)).unwrap();
            prop_assert_eq!(summary.files_indexed, files.len() as u64);

            let index = Index::open(out.path()).unwrap();
            prop_assert_eq!(index.stats().documents, files.len() as u64);
            for segment in index.segments() {
                assert_postings_ascending(segment);
            }
        }
    }
}
