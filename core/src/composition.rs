//! Line buffer of finished syllables and literal symbols.
//!
//! Positions come in two coordinate spaces:
//! - buffer index: position among all items, symbols included (the cursor
//!   lives here)
//! - phone index: position among phonetic items only (intervals,
//!   breakpoints and the phone sequence live here)
//!
//! Phrasing runs after every edit and splits the phone sequence into
//! segments: user-selected intervals are kept as they are, the rest is cut
//! greedily into the longest known phrases from the left. Segments never
//! cross a symbol or a user breakpoint.

use tracing::trace;

use crate::codec::{text_from_code, Phone};
use crate::phrase::PhraseKind;
use crate::tree::PhraseTree;
use crate::userphrase::{UserPhraseStore, MAX_PHRASE_LEN};

/// Capacity of the line buffer.
pub const MAX_PHONE_SEQ_LEN: usize = 50;
/// Largest allowed `max_composed_length`.
pub const MAX_CHI_SYMBOL_LEN: usize = MAX_PHONE_SEQ_LEN - MAX_PHRASE_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Phonetic { phone: Phone, phone_alt: Phone },
    Symbol(String),
}

/// A run of phones `[from, to)` shown as one phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub from: usize,
    pub to: usize,
    pub text: String,
    pub kind: PhraseKind,
}

impl Interval {
    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.to == self.from
    }

    pub fn intersects(&self, from: usize, to: usize) -> bool {
        !(from >= self.to || to <= self.from)
    }
}

/// Best phrase for `phones[from..to]` from the tree and the user store.
pub fn best_phrase(
    tree: &PhraseTree,
    store: &UserPhraseStore,
    phones: &[Phone],
    from: usize,
    to: usize,
) -> Option<(String, PhraseKind)> {
    let from_tree = tree
        .find_phrase(phones, from, to)
        .and_then(|node| tree.first_phrase(node))
        .map(|p| (p.text, p.kind, p.freq));
    let span = &phones[from..to];
    let from_user = [PhraseKind::Word, PhraseKind::Romanized]
        .into_iter()
        .flat_map(|kind| store.lookup_or_empty(kind, span))
        .max_by_key(|r| r.user_freq)
        .map(|r| (r.phrase, r.kind, r.user_freq));
    match (from_tree, from_user) {
        (Some(t), Some(u)) if u.2 > t.2 => Some((u.0, u.1)),
        (Some(t), _) => Some((t.0, t.1)),
        (None, Some(u)) => Some((u.0, u.1)),
        (None, None) => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct Composition {
    items: Vec<Item>,
    cursor: usize,
    selected: Vec<Interval>,
    /// `breakpoints[i]`: phrasing may not join phone `i - 1` and phone `i`.
    breakpoints: Vec<bool>,
    segments: Vec<Interval>,
    pieces: Vec<String>,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= MAX_PHONE_SEQ_LEN
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // ========== Cursor ==========

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.items.len());
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn move_right(&mut self) -> bool {
        if self.cursor >= self.items.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn is_symbol_at(&self, index: usize) -> bool {
        matches!(self.items.get(index), Some(Item::Symbol(_)))
    }

    // ========== Coordinates ==========

    pub fn phones(&self) -> Vec<Phone> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Item::Phonetic { phone, .. } => Some(*phone),
                Item::Symbol(_) => None,
            })
            .collect()
    }

    pub fn phone_alts(&self) -> Vec<Phone> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Item::Phonetic { phone_alt, .. } => Some(*phone_alt),
                Item::Symbol(_) => None,
            })
            .collect()
    }

    pub fn phone_count(&self) -> usize {
        self.breakpoints.len()
    }

    /// Number of phonetic items before buffer index `index`.
    pub fn phone_index(&self, index: usize) -> usize {
        self.items[..index.min(self.items.len())]
            .iter()
            .filter(|item| matches!(item, Item::Phonetic { .. }))
            .count()
    }

    /// Buffer index of the `phone`-th phonetic item, or the buffer length.
    pub fn buffer_index(&self, phone: usize) -> usize {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| matches!(item, Item::Phonetic { .. }))
            .nth(phone)
            .map_or(self.items.len(), |(i, _)| i)
    }

    /// Phone cursor: phone index of the cursor.
    pub fn phone_cursor(&self) -> usize {
        self.phone_index(self.cursor)
    }

    /// `breaks[k]`: a symbol directly follows phone `k`.
    pub fn symbol_breaks(&self) -> Vec<bool> {
        let mut breaks = vec![false; self.phone_count()];
        let mut phones = 0;
        for item in &self.items {
            match item {
                Item::Phonetic { .. } => phones += 1,
                Item::Symbol(_) => {
                    if phones > 0 {
                        breaks[phones - 1] = true;
                    }
                }
            }
        }
        breaks
    }

    // ========== Editing ==========

    pub fn insert_phone(&mut self, phone: Phone, phone_alt: Phone) {
        let p = self.phone_cursor();
        self.selected.retain(|s| !(s.from < p && p < s.to));
        for s in &mut self.selected {
            if s.from >= p {
                s.from += 1;
                s.to += 1;
            }
        }
        self.breakpoints.insert(p, false);
        self.items.insert(self.cursor, Item::Phonetic { phone, phone_alt });
        self.cursor += 1;
    }

    pub fn insert_symbol<S: Into<String>>(&mut self, text: S) {
        let p = self.phone_cursor();
        self.selected.retain(|s| !(s.from < p && p < s.to));
        self.items.insert(self.cursor, Item::Symbol(text.into()));
        self.cursor += 1;
    }

    fn remove_item(&mut self, index: usize) {
        if let Item::Phonetic { .. } = self.items[index] {
            let p = self.phone_index(index);
            self.selected.retain(|s| !(s.from <= p && p < s.to));
            for s in &mut self.selected {
                if s.from > p {
                    s.from -= 1;
                    s.to -= 1;
                }
            }
            self.breakpoints.remove(p);
        }
        self.items.remove(index);
    }

    /// Backspace: remove the item before the cursor.
    pub fn remove_before_cursor(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.remove_item(self.cursor);
        true
    }

    /// Delete: remove the item under the cursor.
    pub fn remove_at_cursor(&mut self) -> bool {
        if self.cursor >= self.items.len() {
            return false;
        }
        self.remove_item(self.cursor);
        true
    }

    /// Toggle the user breakpoint before the phone at the cursor.
    pub fn toggle_breakpoint(&mut self) -> bool {
        let count = self.phone_count();
        let mut p = self.phone_cursor();
        if p >= count {
            p = count.saturating_sub(1);
        }
        if p == 0 {
            return false;
        }
        self.breakpoints[p] = !self.breakpoints[p];
        true
    }

    pub fn breakpoint(&self, phone: usize) -> bool {
        self.breakpoints.get(phone).copied().unwrap_or(false)
    }

    /// Record a user selection `[from, to)`, dropping overlapping ones.
    pub fn select(&mut self, from: usize, to: usize, text: String, kind: PhraseKind) {
        self.selected.retain(|s| !s.intersects(from, to));
        if to <= from {
            return;
        }
        for b in &mut self.breakpoints[(from + 1).min(to)..to] {
            *b = false;
        }
        self.selected.push(Interval { from, to, text, kind });
    }

    pub fn selected(&self) -> &[Interval] {
        &self.selected
    }

    pub fn segments(&self) -> &[Interval] {
        &self.segments
    }

    // ========== Phrasing ==========

    fn crosses_break(&self, breaks: &[bool], from: usize, to: usize) -> bool {
        (from + 1..to).any(|i| self.breakpoints[i] || breaks[i - 1])
    }

    fn crosses_selection(&self, from: usize, to: usize) -> bool {
        self.selected.iter().any(|s| s.intersects(from, to))
    }

    /// Re-segment the phone sequence and refresh the display pieces.
    pub fn phrase(&mut self, tree: &PhraseTree, store: &UserPhraseStore) {
        let phones = self.phones();
        let breaks = self.symbol_breaks();
        let n = phones.len();
        let mut segments = Vec::new();
        let mut i = 0;
        while i < n {
            if let Some(sel) = self.selected.iter().find(|s| s.from == i) {
                segments.push(sel.clone());
                i = sel.to;
                continue;
            }
            let longest = MAX_PHRASE_LEN.min(n - i);
            let found = (1..=longest).rev().find_map(|len| {
                let to = i + len;
                if self.crosses_break(&breaks, i, to) || self.crosses_selection(i, to) {
                    return None;
                }
                best_phrase(tree, store, &phones, i, to).map(|(text, kind)| Interval {
                    from: i,
                    to,
                    text,
                    kind,
                })
            });
            let segment = found.unwrap_or_else(|| Interval {
                from: i,
                to: i + 1,
                text: text_from_code(phones[i]),
                kind: PhraseKind::Romanized,
            });
            i = segment.to;
            segments.push(segment);
        }

        let mut pieces = vec![String::new(); n];
        for seg in &segments {
            match seg.kind.split_syllables(&seg.text, seg.len()) {
                Some(parts) => {
                    for (slot, part) in pieces[seg.from..seg.to].iter_mut().zip(parts) {
                        *slot = part;
                    }
                }
                None => pieces[seg.from] = seg.text.clone(),
            }
        }
        trace!(segments = segments.len(), "phrased line");
        self.segments = segments;
        self.pieces = pieces;
    }

    /// Display text of buffer items `range`.
    fn text_of(&self, range: std::ops::Range<usize>) -> String {
        let mut phone = self.phone_index(range.start);
        let mut out = String::new();
        for item in &self.items[range] {
            match item {
                Item::Symbol(s) => out.push_str(s),
                Item::Phonetic { .. } => {
                    if let Some(piece) = self.pieces.get(phone) {
                        out.push_str(piece);
                    }
                    phone += 1;
                }
            }
        }
        out
    }

    /// Display text of the whole line.
    pub fn preedit(&self) -> String {
        self.text_of(0..self.items.len())
    }

    /// Byte offset in [`preedit`](Self::preedit) of buffer index `index`.
    pub fn byte_offset(&self, index: usize) -> usize {
        self.text_of(0..index.min(self.items.len())).len()
    }

    /// Number of leading items auto-commit releases: a leading symbol, or the
    /// first segment when it starts the line, else one item.
    pub fn release_count(&self) -> usize {
        if self.is_symbol_at(0) {
            return 1;
        }
        self.segments
            .first()
            .filter(|s| s.from == 0)
            .map_or(1, |s| s.len())
            .min(self.items.len())
    }

    /// Remove the first `count` items and return their display text.
    pub fn release_front(&mut self, count: usize) -> String {
        let count = count.min(self.items.len());
        let text = self.text_of(0..count);
        for _ in 0..count {
            self.remove_item(0);
        }
        self.cursor = self.cursor.saturating_sub(count);
        text
    }

    /// Multi-syllable segments worth learning: `(phones, text, kind)`.
    /// User selections are left out; they were learned when chosen.
    pub fn learnable(&self) -> Vec<(Vec<Phone>, String, PhraseKind)> {
        let phones = self.phones();
        self.segments
            .iter()
            .filter(|s| s.len() >= 2 && !self.selected.contains(s))
            .map(|s| (phones[s.from..s.to].to_vec(), s.text.clone(), s.kind))
            .collect()
    }
}
