//! Source-code tokenizer
//!
//! A token is a maximal run of ASCII letters, digits, `_` and `:`, lowercased
//! and truncated to a configurable length. Runs made only of decimal digits
//! are dropped. Everything else, including non-ASCII bytes, separates tokens.
//!
//! Each token carries a boost: after one of the declaration keywords
//! (`function`, `func`, `sub`, `class`) every following token on the same
//! line has boost 1, marking it as a probable declared name. The keyword
//! itself has boost 0 and the flag clears at `\n` or `\r`.

use crate::config::DEFAULT_MAX_TOKEN_LEN;
use std::collections::HashSet;

/// Keywords that introduce a declared name.
const KEYWORDS: &[&str] = &["function", "func", "sub", "class"];

#[inline]
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b':'
}

#[inline]
fn is_keyword(raw: &[u8]) -> bool {
    KEYWORDS.iter().any(|k| raw.eq_ignore_ascii_case(k.as_bytes()))
}

/// One emitted token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lowercased, truncated term.
    pub term: String,
    /// 1 if the token follows a declaration keyword on the same line, else 0.
    pub boost: u32,
}

/// Tokenizer configured with a truncation length.
///
/// The same length must be used when indexing and when parsing queries,
/// otherwise long terms silently stop matching.
#[derive(Debug, Clone, Copy)]
pub struct Tokenizer {
    max_token_len: usize,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKEN_LEN)
    }
}

impl Tokenizer {
    /// Create a tokenizer truncating tokens to `max_token_len` bytes.
    pub fn new(max_token_len: usize) -> Self {
        Self {
            max_token_len: max_token_len.max(1),
        }
    }

    /// Truncation length in bytes.
    pub fn max_token_len(&self) -> usize {
        self.max_token_len
    }

    /// Lazily tokenize `text`. Clone the iterator to restart from the
    /// current position.
    pub fn tokens<'a>(&self, text: &'a str) -> Tokens<'a> {
        Tokens {
            input: text.as_bytes(),
            pos: 0,
            max_token_len: self.max_token_len,
            keyword_line: false,
        }
    }

    /// Terms of a query string, deduplicated, in first-seen order. Boost is
    /// ignored for queries.
    pub fn query_terms(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.tokens(text)
            .map(|t| t.term)
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }

    /// Lowercase and truncate a term produced outside the tokenizer, such as
    /// a path component.
    pub fn normalize(&self, raw: &str) -> String {
        let mut end = raw.len().min(self.max_token_len);
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        raw[..end].to_ascii_lowercase()
    }
}

/// Iterator over the tokens of one input.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    input: &'a [u8],
    pos: usize,
    max_token_len: usize,
    keyword_line: bool,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let input = self.input;
        loop {
            while self.pos < input.len() && !is_token_byte(input[self.pos]) {
                if matches!(input[self.pos], b'\n' | b'\r') {
                    self.keyword_line = false;
                }
                self.pos += 1;
            }
            if self.pos >= input.len() {
                return None;
            }

            let start = self.pos;
            while self.pos < input.len() && is_token_byte(input[self.pos]) {
                self.pos += 1;
            }
            let raw = &input[start..self.pos];

            if raw.iter().all(u8::is_ascii_digit) {
                continue;
            }

            // Token bytes are ASCII, so byte truncation is char-safe.
            let term: String = raw
                .iter()
                .take(self.max_token_len)
                .map(|b| b.to_ascii_lowercase() as char)
                .collect();

            if is_keyword(raw) {
                self.keyword_line = true;
                return Some(Token { term, boost: 0 });
            }
            return Some(Token {
                term,
                boost: self.keyword_line as u32,
            });
        }
    }
}

/// Tokenize with the default truncation length.
pub fn tokenize(text: &str) -> Tokens<'_> {
    Tokenizer::default().tokens(text)
}

/// Query terms with the default truncation length.
///
/// # Example
///
/// ```
/// use zearch_engine::tokenizer::tokenize_query;
///
/// assert_eq!(tokenize_query("AtomicLong incrementAndGet"), vec!["atomiclong", "incrementandget"]);
/// ```
pub fn tokenize_query(text: &str) -> Vec<String> {
    Tokenizer::default().query_terms(text)
}
