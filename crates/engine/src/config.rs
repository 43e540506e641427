//! Index configuration via `zearch.toml`
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the stock behavior. The rotation thresholds are tuning constants with no
//! deeper meaning; they bound how much postings data sits in memory between
//! flushes.

use serde::{Deserialize, Serialize};
use std::path::Path;
use zearch_core::limits::MAX_SEGMENTS;
use zearch_core::{Error, Result};

/// Config file name placed in the storage directory.
pub const CONFIG_FILE_NAME: &str = "zearch.toml";

/// Default truncation cap for tokens.
pub const DEFAULT_MAX_TOKEN_LEN: usize = 64;

/// Index build and query configuration loaded from `zearch.toml`.
///
/// # Example
///
/// ```toml
/// max_token_len = 64
/// docs_per_rotation = 15000
/// segments_per_rotation = 2
/// extensions = ["java", "go", "rs"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Tokens longer than this are truncated, at index and query time alike.
    pub max_token_len: usize,
    /// Content tokens shorter than this are not indexed.
    pub min_content_term_len: usize,
    /// Documents submitted between two segment rotations.
    pub docs_per_rotation: usize,
    /// Segments opened per rotation; documents are spread randomly over them.
    pub segments_per_rotation: usize,
    /// Worker threads; 0 means the available parallelism.
    pub workers: usize,
    /// File extensions (without the dot) the walker picks up.
    pub extensions: Vec<String>,
    /// Weight of the extension term and the scale of file-name prefix terms.
    pub filename_weight: u32,
    /// Weight of each directory component of a path.
    pub directory_weight: u32,
    /// Extra count per occurrence of a token following a declaration keyword.
    pub keyword_boost: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_token_len: DEFAULT_MAX_TOKEN_LEN,
            min_content_term_len: 3,
            docs_per_rotation: 15_000,
            segments_per_rotation: 2,
            workers: 0,
            extensions: ["java", "c", "cpp", "go", "pl", "pm", "scala"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            filename_weight: 200,
            directory_weight: 1,
            keyword_boost: 10,
        }
    }
}

impl IndexConfig {
    /// Check that the values can drive an indexing run.
    pub fn validate(&self) -> Result<()> {
        if self.max_token_len == 0 {
            return Err(Error::InvalidConfig("max_token_len must be positive".into()));
        }
        if self.docs_per_rotation == 0 {
            return Err(Error::InvalidConfig(
                "docs_per_rotation must be positive".into(),
            ));
        }
        if self.segments_per_rotation == 0 || self.segments_per_rotation > MAX_SEGMENTS {
            return Err(Error::InvalidConfig(format!(
                "segments_per_rotation must be in 1..={}, got {}",
                MAX_SEGMENTS, self.segments_per_rotation
            )));
        }
        if self.extensions.is_empty() {
            return Err(Error::InvalidConfig("extensions must not be empty".into()));
        }
        Ok(())
    }

    /// Number of indexing worker threads to run.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Whether a file with this extension (no leading dot) is indexed.
    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e == ext)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# zearch index configuration
#
# Tokens longer than this are truncated (applied to queries too).
max_token_len = 64

# Content tokens shorter than this are not indexed.
min_content_term_len = 3

# Segment rotation: after this many documents, open segments are flushed
# and a fresh batch of segments_per_rotation segments is started.
docs_per_rotation = 15000
segments_per_rotation = 2

# Indexing threads (0 = one per available CPU).
workers = 0

# File extensions to index, without the leading dot.
extensions = ["java", "c", "cpp", "go", "pl", "pm", "scala"]

# Path scoring.
filename_weight = 200
directory_weight = 1

# Extra weight for identifiers following function/func/sub/class.
keyword_boost = 10
"#
    }

    /// Read, parse and validate config from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io_at(path, e))?;
        let config: IndexConfig = toml::from_str(&content).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `zearch.toml` from a storage directory, falling back to defaults
    /// when the file does not exist.
    pub fn load_or_default(storage_dir: &Path) -> Result<Self> {
        let path = storage_dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Serialize this config to TOML and write it to the given path,
    /// replacing any previous file. The stock config is written with its
    /// comments.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = if *self == Self::default() {
            Self::default_toml().to_owned()
        } else {
            toml::to_string_pretty(self)
                .map_err(|e| Error::InvalidConfig(format!("Failed to serialize config: {}", e)))?
        };
        std::fs::write(path, content).map_err(|e| Error::io_at(path, e))
    }
}
