//! Candidate types for the choice window.
//!
//! This module provides:
//! - `Candidate`: one phrase text with its script variant
//! - `CandidateList`: paged list; the page resets on every rebuild

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::phrase::PhraseKind;

/// Upper bound on candidates gathered for one span.
pub const MAX_CHOICE: usize = 567;

/// A single choice offered for a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
    pub kind: PhraseKind,
}

impl Candidate {
    pub fn new<T: Into<String>>(text: T, kind: PhraseKind) -> Self {
        Candidate {
            text: text.into(),
            kind,
        }
    }
}

/// A paginated list of candidates.
#[derive(Debug, Clone)]
pub struct CandidateList {
    candidates: Vec<Candidate>,

    /// Number of candidates per page
    page_size: usize,

    /// Current page index (0-based)
    current_page: usize,
}

impl CandidateList {
    pub fn new() -> Self {
        Self::with_page_size(10)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            candidates: Vec::new(),
            page_size: page_size.max(1),
            current_page: 0,
        }
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        if self.current_page >= self.num_pages() {
            self.current_page = 0;
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Replace the candidates and go back to the first page.
    pub fn set_candidates(&mut self, candidates: Vec<Candidate>) {
        self.candidates = candidates;
        self.current_page = 0;
    }

    /// Append unless the same text is already listed.
    pub fn push_unique(&mut self, candidate: Candidate) -> bool {
        if self.contains(&candidate.text) {
            return false;
        }
        self.push(candidate)
    }

    /// Append without deduplication. Returns false once the list is full.
    pub fn push(&mut self, candidate: Candidate) -> bool {
        if self.candidates.len() >= MAX_CHOICE {
            return false;
        }
        self.candidates.push(candidate);
        true
    }

    pub fn contains(&self, text: &str) -> bool {
        self.candidates.iter().any(|c| c.text == text)
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// `ceil(len / page_size)`.
    pub fn num_pages(&self) -> usize {
        self.candidates.len().div_ceil(self.page_size)
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    fn current_page_range(&self) -> Range<usize> {
        let start = self.current_page * self.page_size;
        let end = (start + self.page_size).min(self.candidates.len());
        start.min(end)..end
    }

    pub fn current_page_candidates(&self) -> &[Candidate] {
        &self.candidates[self.current_page_range()]
    }

    /// Global index of the `slot`-th entry on the current page.
    pub fn index_on_page(&self, slot: usize) -> Option<usize> {
        let range = self.current_page_range();
        (slot < range.len()).then(|| range.start + slot)
    }

    /// Move to the previous page. Returns true if the page changed.
    pub fn page_up(&mut self) -> bool {
        if self.current_page > 0 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    /// Move to the next page. Returns true if the page changed.
    pub fn page_down(&mut self) -> bool {
        if self.current_page + 1 < self.num_pages() {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    /// Previous page, wrapping from the first to the last.
    pub fn page_up_wrapping(&mut self) {
        if !self.page_up() {
            self.current_page = self.num_pages().saturating_sub(1);
        }
    }

    /// Next page, wrapping from the last to the first.
    pub fn page_down_wrapping(&mut self) {
        if !self.page_down() {
            self.current_page = 0;
        }
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
        self.current_page = 0;
    }
}

impl Default for CandidateList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(n: usize, page: usize) -> CandidateList {
        let mut l = CandidateList::with_page_size(page);
        for i in 0..n {
            l.push(Candidate::new(format!("c{i}"), PhraseKind::Word));
        }
        l
    }

    #[test]
    fn paging() {
        let mut l = list(23, 10);
        assert_eq!(l.num_pages(), 3);
        assert_eq!(l.current_page_candidates().len(), 10);
        assert!(l.page_down());
        assert!(l.page_down());
        assert_eq!(l.current_page_candidates().len(), 3);
        assert_eq!(l.index_on_page(2), Some(22));
        assert_eq!(l.index_on_page(3), None);
        assert!(!l.page_down());
        l.page_down_wrapping();
        assert_eq!(l.current_page(), 0);
        l.page_up_wrapping();
        assert_eq!(l.current_page(), 2);
    }

    #[test]
    fn rebuild_resets_page() {
        let mut l = list(23, 10);
        l.page_down();
        l.set_candidates(vec![Candidate::new("x", PhraseKind::Word)]);
        assert_eq!(l.current_page(), 0);
        assert_eq!(l.num_pages(), 1);
    }

    #[test]
    fn dedup_and_capacity() {
        let mut l = CandidateList::new();
        assert!(l.push_unique(Candidate::new("測", PhraseKind::Word)));
        assert!(!l.push_unique(Candidate::new("測", PhraseKind::Word)));
        let mut full = list(MAX_CHOICE, 10);
        assert!(!full.push(Candidate::new("extra", PhraseKind::Word)));
        assert_eq!(full.len(), MAX_CHOICE);
        assert_eq!(CandidateList::new().num_pages(), 0);
    }
}
