//! Span selection and candidate lists.
//!
//! Opening the choice window collects the *available spans* around the
//! cursor: every phrase length that has a static or learned entry. With the
//! forward bias the spans start at the cursor and grow to the right; with the
//! rearward bias they end at the cursor and grow to the left, so the span
//! start moves while its end stays pinned. The longest span is offered first.
//!
//! Public API:
//! - `Chooser::open` / `Chooser::close`
//! - `first` / `last` / `next` / `prev` to walk the spans
//! - `select` to confirm a candidate, learn it and record the interval

use tracing::{debug, warn};

use crate::candidate::{Candidate, CandidateList};
use crate::codec::Phone;
use crate::composition::Composition;
use crate::error::{Result, TaigiError};
use crate::phrase::PhraseKind;
use crate::tree::{NodeId, PhraseTree};
use crate::userphrase::UserPhraseStore;

/// One available span length and its tree node, if the tree has it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Avail {
    pub len: usize,
    pub node: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct Chooser {
    selecting: bool,
    rearward: bool,
    avail: Vec<Avail>,
    current: usize,
    old_cursor: usize,
    list: CandidateList,
}

fn has_user_phrase(store: &UserPhraseStore, phones: &[Phone]) -> bool {
    [PhraseKind::Word, PhraseKind::Romanized]
        .into_iter()
        .any(|kind| !store.lookup_or_empty(kind, phones).is_empty())
}

/// Start of the segment containing phone `cursor`, searching from the last
/// segment.
fn seek_phrase_head(composition: &Composition, cursor: usize) -> usize {
    composition
        .segments()
        .iter()
        .rev()
        .find(|s| !(s.from > cursor || s.to < cursor))
        .map_or(0, |s| s.from)
}

impl Chooser {
    pub fn new(page_size: usize) -> Self {
        Self {
            list: CandidateList::with_page_size(page_size),
            ..Default::default()
        }
    }

    pub fn is_selecting(&self) -> bool {
        self.selecting
    }

    pub fn list(&self) -> &CandidateList {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut CandidateList {
        &mut self.list
    }

    pub fn avail(&self) -> &[Avail] {
        &self.avail
    }

    /// Length of the span currently offered.
    pub fn current_len(&self) -> Option<usize> {
        self.selecting
            .then(|| self.avail.get(self.current).map(|a| a.len))
            .flatten()
    }

    fn set_avail_info(
        &mut self,
        composition: &Composition,
        tree: &PhraseTree,
        store: &UserPhraseStore,
        begin: usize,
        end: usize,
    ) {
        let phones = composition.phones();
        let breaks = composition.symbol_breaks();
        let n = phones.len();
        self.avail.clear();

        let (head, mut head_tmp, tail, mut tail_tmp);
        if self.rearward {
            let mut h = end;
            for i in (begin..=end).rev() {
                if breaks[i] {
                    break;
                }
                h = i;
            }
            head = h;
            head_tmp = end;
            tail = end;
            tail_tmp = end;
        } else {
            let mut t = begin;
            for (i, &brk) in breaks.iter().enumerate().take(n).skip(begin) {
                t = i;
                if brk {
                    break;
                }
            }
            head = begin;
            head_tmp = begin;
            tail = t;
            tail_tmp = begin;
        }

        while head <= head_tmp && tail_tmp <= tail {
            let len = tail_tmp - head_tmp + 1;
            let node = tree.find_phrase(&phones, head_tmp, tail_tmp + 1);
            if node.is_some() || has_user_phrase(store, &phones[head_tmp..=tail_tmp]) {
                self.avail.push(Avail { len, node });
            }
            if self.rearward {
                if head_tmp == 0 {
                    break;
                }
                head_tmp -= 1;
            } else {
                tail_tmp += 1;
            }
        }
    }

    fn set_choice_info(&mut self, composition: &Composition, tree: &PhraseTree, store: &UserPhraseStore) {
        let Avail { len, node } = self.avail[self.current];
        let phones = composition.phones();
        let cursor = composition.phone_cursor();
        let mut list = CandidateList::with_page_size(self.list.page_size());

        if len == 1 {
            let phone = phones[cursor];
            let alt = composition.phone_alts()[cursor];
            let mut singles = vec![phone];
            if alt != phone {
                singles.push(alt);
            }
            for p in singles {
                if let Some(node) = tree.find_phrase(&[p], 0, 1) {
                    for phrase in tree.phrases(node) {
                        list.push_unique(Candidate::new(phrase.text, phrase.kind));
                    }
                }
            }
            for kind in [PhraseKind::Word, PhraseKind::Romanized] {
                for record in store.lookup_or_empty(kind, &[phone]) {
                    list.push_unique(Candidate::new(record.phrase, kind));
                }
            }
        } else {
            if let Some(node) = node {
                for phrase in tree.phrases(node) {
                    list.push_unique(Candidate::new(phrase.text, phrase.kind));
                }
            }
            let span = &phones[cursor..cursor + len];
            for record in store.lookup_or_empty(PhraseKind::Word, span) {
                list.push_unique(Candidate::new(record.phrase, PhraseKind::Word));
            }
            for record in store.lookup_or_empty(PhraseKind::Romanized, span) {
                list.push(Candidate::new(record.phrase, PhraseKind::Romanized));
            }
        }

        debug_assert!(!list.is_empty(), "available span of length {len} has no candidates");
        self.list = list;
    }

    /// Recompute the cursor for span `current`. With the rearward bias the
    /// span end is pinned at the original cursor.
    fn change_current(&mut self, composition: &mut Composition, current: usize) {
        if self.rearward {
            let len = self.avail[current].len;
            let mut end = composition.phone_index(self.old_cursor);
            if self.old_cursor == composition.len() {
                end = end.saturating_sub(1);
            }
            let start = (end + 1).saturating_sub(len);
            composition.set_cursor(composition.buffer_index(start));
        }
        self.current = current;
    }

    /// Enter selection for the span at the cursor.
    pub fn open(
        &mut self,
        composition: &mut Composition,
        tree: &PhraseTree,
        store: &UserPhraseStore,
        rearward: bool,
    ) -> Result<()> {
        if composition.is_empty() {
            return Err(TaigiError::InvalidSpan);
        }
        self.rearward = rearward;
        self.old_cursor = composition.cursor();
        if composition.cursor() == composition.len() {
            composition.set_cursor(composition.len() - 1);
        }
        if composition.is_symbol_at(composition.cursor()) {
            composition.set_cursor(self.old_cursor);
            return Err(TaigiError::InvalidSpan);
        }
        let end = composition.phone_cursor();
        let begin = if rearward {
            seek_phrase_head(composition, end)
        } else {
            end
        };

        self.set_avail_info(composition, tree, store, begin, end);
        if self.avail.is_empty() {
            self.close(composition);
            return Err(TaigiError::InvalidSpan);
        }
        self.selecting = true;
        self.change_current(composition, self.avail.len() - 1);
        self.set_choice_info(composition, tree, store);
        debug!(spans = self.avail.len(), choices = self.list.len(), "opened choices");
        Ok(())
    }

    /// Leave selection and put the cursor back where it was.
    pub fn close(&mut self, composition: &mut Composition) {
        if self.selecting || !self.avail.is_empty() {
            composition.set_cursor(self.old_cursor);
        }
        self.selecting = false;
        self.avail.clear();
        self.current = 0;
        self.list.clear();
    }

    pub fn has_next(&self) -> bool {
        self.selecting && self.current > 0
    }

    pub fn has_prev(&self) -> bool {
        self.selecting && self.current + 1 < self.avail.len()
    }

    /// Longest span.
    pub fn first(&mut self, composition: &mut Composition, tree: &PhraseTree, store: &UserPhraseStore) -> Result<()> {
        if !self.selecting {
            return Err(TaigiError::NotSelecting);
        }
        self.change_current(composition, self.avail.len() - 1);
        self.set_choice_info(composition, tree, store);
        Ok(())
    }

    /// Shortest span.
    pub fn last(&mut self, composition: &mut Composition, tree: &PhraseTree, store: &UserPhraseStore) -> Result<()> {
        if !self.selecting {
            return Err(TaigiError::NotSelecting);
        }
        self.change_current(composition, 0);
        self.set_choice_info(composition, tree, store);
        Ok(())
    }

    /// Next shorter span.
    pub fn next(&mut self, composition: &mut Composition, tree: &PhraseTree, store: &UserPhraseStore) -> Result<()> {
        if !self.has_next() {
            return Err(TaigiError::InvalidSpan);
        }
        self.change_current(composition, self.current - 1);
        self.set_choice_info(composition, tree, store);
        Ok(())
    }

    /// Next longer span.
    pub fn prev(&mut self, composition: &mut Composition, tree: &PhraseTree, store: &UserPhraseStore) -> Result<()> {
        if !self.has_prev() {
            return Err(TaigiError::InvalidSpan);
        }
        self.change_current(composition, self.current + 1);
        self.set_choice_info(composition, tree, store);
        Ok(())
    }

    /// Confirm candidate `index` (global index) and learn it. Learning
    /// failures are logged and do not fail the selection.
    pub fn select(
        &mut self,
        composition: &mut Composition,
        tree: &PhraseTree,
        store: &mut UserPhraseStore,
        index: usize,
    ) -> Result<Candidate> {
        if !self.selecting {
            return Err(TaigiError::NotSelecting);
        }
        let candidate = self
            .list
            .get(index)
            .cloned()
            .ok_or(TaigiError::IndexOutOfRange {
                index,
                total: self.list.len(),
            })?;
        let len = self.avail[self.current].len;
        let from = composition.phone_cursor();
        let to = from + len;

        let phones = composition.phones()[from..to].to_vec();
        let learned = store
            .begin()
            .and_then(|_| store.update(tree, candidate.kind, &phones, &candidate.text));
        if let Err(e) = store.end().and(learned) {
            warn!(phrase = %candidate.text, "selection not learned: {e}");
        }

        composition.select(from, to, candidate.text.clone(), candidate.kind);
        self.close(composition);
        composition.phrase(tree, store);
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::sequence_from_text;
    use crate::phrase::Phrase;
    use crate::tree::TreeBuilder;

    fn fixture() -> (PhraseTree, Vec<Phone>) {
        let p = sequence_from_text("it4 pue3 tsu2").unwrap();
        let mut b = TreeBuilder::new();
        b.insert(&p[0..1], Phrase::new("一", 900, PhraseKind::Word)).unwrap();
        b.insert(&p[1..2], Phrase::new("輩", 300, PhraseKind::Word)).unwrap();
        b.insert(&p[1..2], Phrase::new("背", 200, PhraseKind::Word)).unwrap();
        b.insert(&p[2..3], Phrase::new("子", 600, PhraseKind::Word)).unwrap();
        b.insert(&p[0..2], Phrase::new("一輩", 40, PhraseKind::Word)).unwrap();
        b.insert(&p[1..3], Phrase::new("輩子", 50, PhraseKind::Word)).unwrap();
        b.insert(&p[0..3], Phrase::new("一輩子", 70, PhraseKind::Word)).unwrap();
        (b.build(), p)
    }

    fn line(tree: &PhraseTree, store: &UserPhraseStore, phones: &[Phone]) -> Composition {
        let mut c = Composition::new();
        for &p in phones {
            c.insert_phone(p, p);
        }
        c.phrase(tree, store);
        c
    }

    #[test]
    fn forward_spans_from_cursor() {
        let (tree, p) = fixture();
        let store = UserPhraseStore::new_in_memory();
        let mut c = line(&tree, &store, &p);
        c.set_cursor(0);
        let mut ch = Chooser::new(10);
        ch.open(&mut c, &tree, &store, false).unwrap();
        let lens: Vec<usize> = ch.avail().iter().map(|a| a.len).collect();
        assert_eq!(lens, [1, 2, 3]);
        assert_eq!(ch.current_len(), Some(3));
        assert_eq!(c.cursor(), 0);
        assert!(!ch.has_prev());
        ch.next(&mut c, &tree, &store).unwrap();
        assert_eq!(ch.list().get(0).unwrap().text, "一輩");
        ch.last(&mut c, &tree, &store).unwrap();
        assert!(!ch.has_next());
        assert!(ch.next(&mut c, &tree, &store).is_err());
    }

    #[test]
    fn rearward_pins_span_end() {
        let (tree, p) = fixture();
        let store = UserPhraseStore::new_in_memory();
        let mut c = line(&tree, &store, &p);
        let mut ch = Chooser::new(10);
        ch.open(&mut c, &tree, &store, true).unwrap();
        assert_eq!(ch.current_len(), Some(3));
        assert_eq!(c.cursor(), 0);
        ch.next(&mut c, &tree, &store).unwrap();
        assert_eq!(c.cursor(), 1);
        assert_eq!(ch.list().get(0).unwrap().text, "輩子");
        ch.next(&mut c, &tree, &store).unwrap();
        assert_eq!(c.cursor(), 2);
        assert_eq!(ch.list().get(0).unwrap().text, "子");
        ch.close(&mut c);
        assert_eq!(c.cursor(), 3);
    }

    #[test]
    fn select_records_interval_and_learns() {
        let (tree, p) = fixture();
        let mut store = UserPhraseStore::new_in_memory();
        let mut c = line(&tree, &store, &p);
        c.set_cursor(1);
        let mut ch = Chooser::new(10);
        ch.open(&mut c, &tree, &store, false).unwrap();
        assert_eq!(ch.current_len(), Some(2));
        let picked = ch.select(&mut c, &tree, &mut store, 0).unwrap();
        assert_eq!(picked.text, "輩子");
        assert!(!ch.is_selecting());
        assert_eq!(c.cursor(), 1);
        assert_eq!(c.preedit(), "一輩子");
        assert_eq!(c.selected().len(), 1);
        assert_eq!(store.lookup(PhraseKind::Word, &p[1..3]).unwrap().len(), 1);
    }

    #[test]
    fn single_syllable_lists_alternates() {
        let (tree, p) = fixture();
        let store = UserPhraseStore::new_in_memory();
        let mut c = Composition::new();
        c.insert_phone(p[1], p[2]);
        c.phrase(&tree, &store);
        let mut ch = Chooser::new(10);
        ch.open(&mut c, &tree, &store, false).unwrap();
        let texts: Vec<&str> = ch.list().candidates().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["輩", "背", "子"]);
    }

    #[test]
    fn errors() {
        let (tree, p) = fixture();
        let mut store = UserPhraseStore::new_in_memory();
        let mut ch = Chooser::new(10);
        let mut empty = Composition::new();
        assert!(ch.open(&mut empty, &tree, &store, false).is_err());

        let mut c = line(&tree, &store, &p);
        assert!(matches!(
            ch.select(&mut c, &tree, &mut store, 0),
            Err(TaigiError::NotSelecting)
        ));
        ch.open(&mut c, &tree, &store, false).unwrap();
        let total = ch.list().len();
        assert!(matches!(
            ch.select(&mut c, &tree, &mut store, total),
            Err(TaigiError::IndexOutOfRange { .. })
        ));
        assert!(ch.is_selecting());
    }
}
