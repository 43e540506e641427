//! Per-document term weights
//!
//! Weights come from three places:
//!
//! - content tokens: `1 + boost * keyword_boost` per occurrence, for tokens of
//!   at least `min_content_term_len` bytes;
//! - each directory component of the path: `directory_weight`;
//! - file-name prefixes of three or more bytes: `filename_weight / remaining`
//!   where `remaining` counts the bytes left after the prefix plus one, so the
//!   full name gets the whole `filename_weight`; the bare extension gets
//!   `filename_weight` too.
//!
//! Counts saturate and are clamped to the 10-bit posting weight on output.

use std::collections::HashMap;
use std::path::{Component, Path};
use zearch_core::limits::MAX_WEIGHT;

use crate::config::IndexConfig;
use crate::tokenizer::Tokenizer;

/// Scratch map reused across the files one worker indexes.
#[derive(Debug)]
pub(crate) struct Accumulator {
    counts: HashMap<String, u32>,
    tokenizer: Tokenizer,
    min_content_term_len: usize,
    keyword_boost: u32,
    directory_weight: u32,
    filename_weight: u32,
}

impl Accumulator {
    pub(crate) fn new(config: &IndexConfig) -> Self {
        Self {
            counts: HashMap::new(),
            tokenizer: Tokenizer::new(config.max_token_len),
            min_content_term_len: config.min_content_term_len,
            keyword_boost: config.keyword_boost,
            directory_weight: config.directory_weight,
            filename_weight: config.filename_weight,
        }
    }

    fn add(&mut self, term: String, n: u32) {
        if term.is_empty() {
            return;
        }
        let count = self.counts.entry(term).or_insert(0);
        *count = count.saturating_add(n);
    }

    /// Accumulate the tokens of a file's content.
    pub(crate) fn add_content(&mut self, text: &str) {
        for token in self.tokenizer.tokens(text) {
            if token.term.len() >= self.min_content_term_len {
                let n = 1 + token.boost * self.keyword_boost;
                self.add(token.term, n);
            }
        }
    }

    /// Accumulate directory components, file-name prefixes and extension.
    pub(crate) fn add_path(&mut self, path: &Path) {
        if let Some(parent) = path.parent() {
            for component in parent.components() {
                if let Component::Normal(c) = component {
                    if let Some(c) = c.to_str() {
                        let term = self.tokenizer.normalize(c);
                        self.add(term, self.directory_weight);
                    }
                }
            }
        }

        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            let len = stem.len();
            for end in 3..=len {
                if !stem.is_char_boundary(end) {
                    continue;
                }
                let remaining = (len - end + 1) as u32;
                let term = self.tokenizer.normalize(&stem[..end]);
                self.add(term, self.filename_weight / remaining);
            }
        }

        if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
            let term = self.tokenizer.normalize(ext);
            self.add(term, self.filename_weight);
        }
    }

    /// Accumulated `(term, weight)` pairs with weights clamped.
    pub(crate) fn terms(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.counts
            .iter()
            .map(|(term, &count)| (term.as_str(), count.min(MAX_WEIGHT)))
    }

    /// Distinct terms accumulated.
    pub(crate) fn len(&self) -> usize {
        self.counts.len()
    }

    /// Forget the current document, keeping the allocation.
    pub(crate) fn clear(&mut self) {
        self.counts.clear();
    }
}
