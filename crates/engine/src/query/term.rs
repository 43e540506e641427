use super::PostingsSource;
use byteorder::{ByteOrder, LittleEndian};
use zearch_core::limits::POSTING_SIZE;
use zearch_core::{DocId, Posting, NO_MORE};

/// Iterator over one term's postings.
#[derive(Debug)]
pub struct TermQuery<'s> {
    term: String,
    postings: &'s [u8],
    cursor: usize,
    doc_id: Option<DocId>,
}

impl<'s> TermQuery<'s> {
    /// Query for `term`, unbound until prepared.
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            postings: &[],
            cursor: 0,
            doc_id: None,
        }
    }

    /// The term looked up.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Look up the term in `source` and reset the cursor.
    pub fn prepare<S>(&mut self, source: &'s S)
    where
        S: PostingsSource + ?Sized,
    {
        self.postings = source.find_postings_list(&self.term);
        self.cursor = 0;
        self.doc_id = None;
    }

    #[inline]
    fn len(&self) -> usize {
        self.postings.len() / POSTING_SIZE
    }

    #[inline]
    fn posting_at(&self, i: usize) -> Posting {
        let start = i * POSTING_SIZE;
        Posting::from_raw(LittleEndian::read_u32(&self.postings[start..start + POSTING_SIZE]))
    }

    #[inline]
    fn doc_at_cursor(&self) -> DocId {
        if self.cursor < self.len() {
            self.posting_at(self.cursor).ordinal()
        } else {
            NO_MORE
        }
    }

    /// Current document.
    pub fn doc_id(&self) -> Option<DocId> {
        self.doc_id
    }

    /// Number of postings.
    pub fn cost(&self) -> u32 {
        self.len() as u32
    }

    /// `1 + weight` of the current posting, 0 when not on a document.
    pub fn score(&self) -> i64 {
        match self.doc_id {
            Some(doc) if doc != NO_MORE => 1 + self.posting_at(self.cursor).weight() as i64,
            _ => 0,
        }
    }

    /// Step to the next posting. The first call lands on the first one.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> DocId {
        match self.doc_id {
            None => {}
            Some(NO_MORE) => return NO_MORE,
            Some(_) => self.cursor += 1,
        }
        let doc = self.doc_at_cursor();
        self.doc_id = Some(doc);
        doc
    }

    /// Lower-bound search for the first posting with ordinal `>= target`,
    /// starting from the cursor.
    pub fn advance(&mut self, target: DocId) -> DocId {
        if let Some(doc) = self.doc_id {
            if doc >= target {
                return doc;
            }
        }
        if target == NO_MORE {
            self.cursor = self.len();
            self.doc_id = Some(NO_MORE);
            return NO_MORE;
        }

        let mut lo = self.cursor;
        let mut hi = self.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.posting_at(mid).ordinal() < target {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        self.cursor = lo;
        let doc = self.doc_at_cursor();
        self.doc_id = Some(doc);
        doc
    }
}
