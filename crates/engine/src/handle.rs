//! Reloadable index handle
//!
//! Requests take a [`IndexHandle::snapshot`] at the start and keep using it
//! even if a reload swaps in a new index meanwhile. The replaced index is
//! unmapped when its last snapshot is dropped.

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use zearch_core::Result;

use crate::config::IndexConfig;
use crate::index::Index;

/// Shared, swappable reference to the live [`Index`].
pub struct IndexHandle {
    dir: PathBuf,
    config: IndexConfig,
    current: RwLock<Arc<Index>>,
}

impl IndexHandle {
    /// Open the index in `dir` and wrap it, reading `zearch.toml` if present.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config = IndexConfig::load_or_default(dir)?;
        Self::open_with_config(dir, config)
    }

    /// Open the index in `dir` with an explicit configuration.
    pub fn open_with_config(dir: impl AsRef<Path>, config: IndexConfig) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let index = Index::open_with_config(&dir, &config)?;
        Ok(Self {
            dir,
            config,
            current: RwLock::new(Arc::new(index)),
        })
    }

    /// The index to use for one request.
    pub fn snapshot(&self) -> Arc<Index> {
        Arc::clone(&self.current.read())
    }

    /// Open the storage directory again and swap the result in.
    ///
    /// On failure the current index stays live.
    pub fn reload(&self) -> Result<()> {
        let fresh = Arc::new(Index::open_with_config(&self.dir, &self.config)?);
        let old = std::mem::replace(&mut *self.current.write(), fresh);
        info!(
            target: "zearch::index",
            dir = %self.dir.display(),
            in_flight = Arc::strong_count(&old) - 1,
            "Reloaded index"
        );
        Ok(())
    }
}

impl std::fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHandle").field("dir", &self.dir).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{segment_dir_name, SegmentWriter};
    use tempfile::TempDir;

    fn write_segment(dir: &Path, n: usize, path: &str, term: &str) {
        let writer = SegmentWriter::create(dir.join(segment_dir_name(n))).unwrap();
        writer.add_document(path, [(term, 1)]).unwrap();
        writer.flush_to_disk().unwrap();
    }

    #[test]
    fn test_reload_picks_up_new_segments() {
        let tmp = TempDir::new().unwrap();
        write_segment(tmp.path(), 0, "a.go", "alpha");

        let handle = IndexHandle::open(tmp.path()).unwrap();
        let before = handle.snapshot();
        assert_eq!(before.stats().documents, 1);

        write_segment(tmp.path(), 1, "b.go", "beta");
        handle.reload().unwrap();

        let after = handle.snapshot();
        assert_eq!(after.stats().documents, 2);
        assert_eq!(after.search("beta", 10).files_matching, 1);

        // the old snapshot still serves its own view
        assert_eq!(before.stats().documents, 1);
        assert_eq!(before.search("beta", 10).files_matching, 0);
    }

    #[test]
    fn test_failed_reload_keeps_current() {
        let tmp = TempDir::new().unwrap();
        write_segment(tmp.path(), 0, "a.go", "alpha");
        let handle = IndexHandle::open(tmp.path()).unwrap();

        std::fs::create_dir(tmp.path().join(segment_dir_name(1))).unwrap();
        assert!(handle.reload().is_err());
        assert_eq!(handle.snapshot().search("alpha", 10).files_matching, 1);
    }
}
