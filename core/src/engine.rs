//! IME engine: key processing and the keyboardless API.
//!
//! One `ImeEngine` owns a session: the syllable slot, the line buffer, the
//! choice window and the user phrase store. The static tree is shared
//! through an `Arc` so several engines can read one dictionary.
//!
//! Every key runs to completion and leaves the engine consistent. Learning
//! failures are logged and never fail a key.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::candidate::Candidate;
use crate::choice::Chooser;
use crate::codec::{KeyboardLayout, Phone};
use crate::composition::Composition;
use crate::context::ImeContext;
use crate::error::{Result, TaigiError};
use crate::phrase::PhraseKind;
use crate::slot::{Slot, SlotOutcome};
use crate::tree::PhraseTree;
use crate::userphrase::UserPhraseStore;
use crate::Config;

/// Full-width form of a printable ASCII char; space maps to U+3000.
fn fullwidth(c: char) -> char {
    match c {
        ' ' => '\u{3000}',
        '!'..='~' => char::from_u32(u32::from(c) + 0xFEE0).unwrap_or(c),
        _ => c,
    }
}

/// Key event types that the IME can process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// Character input (letters, tone digits, punctuation)
    Char(char),
    Space,
    Enter,
    Backspace,
    Delete,
    Escape,
    Left,
    Right,
    Home,
    End,
    /// Close the choice window
    Up,
    /// Open the choice window, or move to the next shorter span
    Down,
    PageUp,
    PageDown,
    /// Toggle a phrase break at the cursor
    Tab,
    /// Digit key 0-9
    Number(u8),
    Ctrl(char),
    /// Toggle literal (non-phonetic) input
    ShiftLock,
}

/// Result of processing a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResult {
    /// Key consumed
    Absorb,
    /// Key consumed and text was committed; read `commit_string()`
    Commit,
    /// Key is not for the IME; pass it to the application
    Ignore,
    /// Key rejected in the current state
    Error,
    /// A finished syllable has no dictionary entry
    NoSuchSyllable,
}

pub struct ImeEngine {
    tree: Arc<PhraseTree>,
    store: UserPhraseStore,
    config: Config,
    slot: Slot,
    composition: Composition,
    chooser: Chooser,
    context: ImeContext,
    committed: bool,
    literal: bool,
}

impl ImeEngine {
    pub fn new(
        tree: Arc<PhraseTree>,
        store: UserPhraseStore,
        config: Config,
        layout: KeyboardLayout,
    ) -> Self {
        let chooser = Chooser::new(config.candidates_per_page);
        Self {
            tree,
            store,
            config,
            slot: Slot::new(layout),
            composition: Composition::new(),
            chooser,
            context: ImeContext::new(),
            committed: false,
            literal: false,
        }
    }

    pub fn context(&self) -> &ImeContext {
        &self.context
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable configuration; takes effect from the next key or choice window.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn layout(&self) -> KeyboardLayout {
        self.slot.layout()
    }

    /// Switch layout; drops the syllable being typed.
    pub fn set_layout(&mut self, layout: KeyboardLayout) {
        self.slot.set_layout(layout);
        self.refresh();
    }

    pub fn tree(&self) -> &PhraseTree {
        &self.tree
    }

    pub fn store(&self) -> &UserPhraseStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut UserPhraseStore {
        &mut self.store
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    pub fn is_selecting(&self) -> bool {
        self.chooser.is_selecting()
    }

    /// Drop all session state. Learned phrases are kept.
    pub fn reset(&mut self) {
        self.slot.clear();
        self.composition.clear();
        self.chooser.close(&mut self.composition);
        self.context = ImeContext::new();
        self.committed = false;
        self.literal = false;
    }

    // ========== Key processing ==========

    /// Process one key and refresh the context.
    pub fn process_key(&mut self, key: KeyEvent) -> KeyResult {
        self.context.commit_text.clear();
        self.committed = false;

        let result = match key {
            KeyEvent::Char(c) => self.handle_char(c),
            KeyEvent::Number(n) => match char::from_digit(u32::from(n), 10) {
                Some(c) => self.handle_char(c),
                None => KeyResult::Error,
            },
            KeyEvent::Space => self.handle_space(),
            KeyEvent::Enter => self.handle_enter(),
            KeyEvent::Backspace => self.handle_backspace(),
            KeyEvent::Delete => self.handle_delete(),
            KeyEvent::Escape => self.handle_escape(),
            KeyEvent::Left | KeyEvent::Right | KeyEvent::Home | KeyEvent::End => {
                self.handle_motion(key)
            }
            KeyEvent::Up => self.handle_up(),
            KeyEvent::Down => self.handle_down(),
            KeyEvent::PageUp | KeyEvent::PageDown => self.handle_page(key == KeyEvent::PageDown),
            KeyEvent::Tab => self.handle_tab(),
            KeyEvent::Ctrl(_) => KeyResult::Ignore,
            KeyEvent::ShiftLock => {
                self.literal = !self.literal;
                self.slot.clear();
                KeyResult::Absorb
            }
        };

        self.refresh();
        if self.committed {
            KeyResult::Commit
        } else {
            result
        }
    }

    fn is_idle(&self) -> bool {
        self.composition.is_empty() && !self.slot.is_entering()
    }

    fn handle_char(&mut self, c: char) -> KeyResult {
        if self.chooser.is_selecting() {
            return match self.config.selection_key_index(c) {
                Some(slot) => self.choose_on_page(slot),
                None => KeyResult::Absorb,
            };
        }
        if self.literal {
            return self.insert_literal(c);
        }
        if self.composition.is_full() {
            return KeyResult::Error;
        }

        let tree = &self.tree;
        let store = &self.store;
        let exists = |phone: Phone| {
            tree.has_single(phone)
                || [PhraseKind::Word, PhraseKind::Romanized]
                    .into_iter()
                    .any(|kind| !store.lookup_or_empty(kind, &[phone]).is_empty())
        };
        match self.slot.input(c, &exists) {
            SlotOutcome::Absorb => KeyResult::Absorb,
            SlotOutcome::NoWord => KeyResult::NoSuchSyllable,
            SlotOutcome::Commit { phone, phone_alt } => {
                self.composition.insert_phone(phone, phone_alt);
                self.after_insert();
                KeyResult::Absorb
            }
            SlotOutcome::KeyError => {
                if self.slot.is_entering() || !c.is_ascii_graphic() || c.is_ascii_lowercase() {
                    return KeyResult::Error;
                }
                self.insert_symbol(c);
                KeyResult::Absorb
            }
        }
    }

    fn insert_literal(&mut self, c: char) -> KeyResult {
        if self.composition.is_empty() {
            self.commit(c.to_string());
            return KeyResult::Commit;
        }
        if self.composition.is_full() {
            return KeyResult::Error;
        }
        self.insert_symbol(c);
        KeyResult::Absorb
    }

    fn insert_symbol(&mut self, c: char) {
        let text = if self.config.full_width {
            fullwidth(c).to_string()
        } else {
            c.to_string()
        };
        self.composition.insert_symbol(text);
        self.after_insert();
    }

    fn handle_space(&mut self) -> KeyResult {
        if self.chooser.is_selecting() {
            self.chooser.list_mut().page_down_wrapping();
            return KeyResult::Absorb;
        }
        if self.slot.is_entering() {
            return self.handle_char(' ');
        }
        if self.composition.is_empty() {
            return KeyResult::Ignore;
        }
        if self.config.space_as_selection {
            return self.open_choices();
        }
        if self.composition.is_full() {
            return KeyResult::Error;
        }
        self.insert_symbol(' ');
        KeyResult::Absorb
    }

    fn handle_enter(&mut self) -> KeyResult {
        if self.chooser.is_selecting() {
            return KeyResult::Absorb;
        }
        if self.composition.is_empty() {
            if self.slot.is_entering() {
                self.slot.clear();
                return KeyResult::Absorb;
            }
            return KeyResult::Ignore;
        }
        self.commit_line();
        KeyResult::Commit
    }

    fn handle_backspace(&mut self) -> KeyResult {
        if self.chooser.is_selecting() {
            self.chooser.close(&mut self.composition);
            return KeyResult::Absorb;
        }
        if self.slot.is_entering() {
            self.slot.remove_last();
            return KeyResult::Absorb;
        }
        if self.composition.is_empty() {
            return KeyResult::Ignore;
        }
        if self.composition.remove_before_cursor() {
            self.rephrase();
        }
        KeyResult::Absorb
    }

    fn handle_delete(&mut self) -> KeyResult {
        if self.chooser.is_selecting() || self.slot.is_entering() {
            return KeyResult::Absorb;
        }
        if self.composition.is_empty() {
            return KeyResult::Ignore;
        }
        if self.composition.remove_at_cursor() {
            self.rephrase();
        }
        KeyResult::Absorb
    }

    fn handle_escape(&mut self) -> KeyResult {
        if self.chooser.is_selecting() {
            self.chooser.close(&mut self.composition);
            return KeyResult::Absorb;
        }
        if self.is_idle() {
            return KeyResult::Ignore;
        }
        self.slot.clear();
        if self.config.esc_clean_all_buf {
            self.composition.clear();
        }
        KeyResult::Absorb
    }

    fn handle_motion(&mut self, key: KeyEvent) -> KeyResult {
        if self.chooser.is_selecting() {
            match key {
                KeyEvent::Left => self.chooser.list_mut().page_up_wrapping(),
                KeyEvent::Right => self.chooser.list_mut().page_down_wrapping(),
                _ => {}
            }
            return KeyResult::Absorb;
        }
        if self.slot.is_entering() {
            return KeyResult::Absorb;
        }
        if self.composition.is_empty() {
            return KeyResult::Ignore;
        }
        match key {
            KeyEvent::Left => {
                self.composition.move_left();
            }
            KeyEvent::Right => {
                self.composition.move_right();
            }
            KeyEvent::Home => self.composition.set_cursor(0),
            _ => self.composition.set_cursor(self.composition.len()),
        }
        KeyResult::Absorb
    }

    fn handle_up(&mut self) -> KeyResult {
        if self.chooser.is_selecting() {
            self.chooser.close(&mut self.composition);
            return KeyResult::Absorb;
        }
        if self.is_idle() {
            KeyResult::Ignore
        } else {
            KeyResult::Absorb
        }
    }

    fn handle_down(&mut self) -> KeyResult {
        if self.chooser.is_selecting() {
            let moved = if self.chooser.has_next() {
                self.cand_list_next()
            } else {
                self.cand_list_first()
            };
            return match moved {
                Ok(()) => KeyResult::Absorb,
                Err(_) => KeyResult::Error,
            };
        }
        if self.slot.is_entering() {
            return KeyResult::Absorb;
        }
        if self.composition.is_empty() {
            return KeyResult::Ignore;
        }
        self.open_choices()
    }

    fn handle_page(&mut self, down: bool) -> KeyResult {
        if self.chooser.is_selecting() {
            let list = self.chooser.list_mut();
            if down {
                list.page_down_wrapping();
            } else {
                list.page_up_wrapping();
            }
            return KeyResult::Absorb;
        }
        if self.is_idle() {
            KeyResult::Ignore
        } else {
            KeyResult::Absorb
        }
    }

    fn handle_tab(&mut self) -> KeyResult {
        if self.chooser.is_selecting() || self.slot.is_entering() {
            return KeyResult::Absorb;
        }
        if self.composition.is_empty() {
            return KeyResult::Ignore;
        }
        if self.composition.toggle_breakpoint() {
            self.rephrase();
        }
        KeyResult::Absorb
    }

    fn open_choices(&mut self) -> KeyResult {
        match self.cand_open() {
            Ok(()) => KeyResult::Absorb,
            Err(e) => {
                debug!("no choices at cursor: {e}");
                KeyResult::Error
            }
        }
    }

    fn choose_on_page(&mut self, slot: usize) -> KeyResult {
        match self.chooser.list().index_on_page(slot) {
            Some(index) => match self.cand_choose_by_index(index) {
                Ok(()) => KeyResult::Absorb,
                Err(_) => KeyResult::Error,
            },
            None => KeyResult::Absorb,
        }
    }

    // ========== Line maintenance ==========

    fn rephrase(&mut self) {
        self.composition.phrase(&self.tree, &self.store);
    }

    fn commit(&mut self, text: String) {
        self.context.commit_text.push_str(&text);
        self.committed = true;
        if let Err(e) = self.store.increase_lifetime() {
            warn!("lifetime not advanced: {e}");
        }
    }

    /// Rephrase, then release leading phrases while the line is too long.
    fn after_insert(&mut self) {
        self.rephrase();
        let mut released = String::new();
        while self.composition.len() > self.config.max_composed_length {
            let count = self.composition.release_count();
            released.push_str(&self.composition.release_front(count));
            self.rephrase();
        }
        if !released.is_empty() {
            debug!(text = %released, "auto-committed");
            self.commit(released);
        }
    }

    fn learn_line(&mut self) {
        for (phones, text, kind) in self.composition.learnable() {
            let learned = self
                .store
                .begin()
                .and_then(|_| self.store.update(&self.tree, kind, &phones, &text));
            if let Err(e) = self.store.end().and(learned) {
                warn!(phrase = %text, "phrase not learned: {e}");
            }
        }
    }

    fn commit_line(&mut self) {
        if self.config.auto_learn {
            self.learn_line();
        }
        let text = self.composition.preedit();
        self.composition.clear();
        self.slot.clear();
        self.commit(text);
    }

    fn refresh(&mut self) {
        let ctx = &mut self.context;
        ctx.preedit_text = self.composition.preedit();
        ctx.preedit_cursor = self.composition.byte_offset(self.composition.cursor());
        ctx.slot_text = self.slot.display();
        match self.chooser.current_len() {
            Some(len) => {
                let list = self.chooser.list();
                ctx.candidates = list
                    .current_page_candidates()
                    .iter()
                    .map(|c| c.text.clone())
                    .collect();
                ctx.candidate_page = list.current_page();
                ctx.candidate_pages = list.num_pages();
                ctx.auxiliary_text = format!("{}/{}", list.current_page() + 1, list.num_pages());
                let start = self.composition.cursor();
                let last = self.composition.phone_cursor() + len.max(1) - 1;
                ctx.span = Some((start, self.composition.buffer_index(last) + 1));
            }
            None => {
                ctx.candidates.clear();
                ctx.candidate_page = 0;
                ctx.candidate_pages = 0;
                ctx.auxiliary_text.clear();
                ctx.span = None;
            }
        }
    }

    // ========== Keyboardless API ==========

    /// Open the choice window at the cursor. A partly typed syllable is
    /// dropped first. Opening an already open window is a no-op.
    pub fn cand_open(&mut self) -> Result<()> {
        if self.chooser.is_selecting() {
            return Ok(());
        }
        self.slot.clear();
        if self.composition.is_empty() {
            self.refresh();
            return Err(TaigiError::InvalidSpan);
        }
        self.chooser
            .list_mut()
            .set_page_size(self.config.candidates_per_page);
        let opened = self.chooser.open(
            &mut self.composition,
            &self.tree,
            &self.store,
            self.config.phrase_choice_rearward,
        );
        self.refresh();
        opened
    }

    pub fn cand_close(&mut self) -> Result<()> {
        self.chooser.close(&mut self.composition);
        self.refresh();
        Ok(())
    }

    /// Choose candidate `index` across all pages.
    pub fn cand_choose_by_index(&mut self, index: usize) -> Result<()> {
        let chosen: Result<Candidate> = self
            .chooser
            .select(&mut self.composition, &self.tree, &mut self.store, index);
        self.refresh();
        chosen.map(|c| debug!(text = %c.text, "chose candidate"))
    }

    pub fn cand_total_choice(&self) -> usize {
        if self.chooser.is_selecting() {
            self.chooser.list().len()
        } else {
            0
        }
    }

    pub fn cand_total_page(&self) -> usize {
        if self.chooser.is_selecting() {
            self.chooser.list().num_pages()
        } else {
            0
        }
    }

    pub fn cand_current_page(&self) -> usize {
        self.chooser.list().current_page()
    }

    pub fn cand_choice_per_page(&self) -> usize {
        self.chooser.list().page_size()
    }

    pub fn cand_string_by_index(&self, index: usize) -> Option<&str> {
        if !self.chooser.is_selecting() {
            return None;
        }
        self.chooser.list().get(index).map(|c| c.text.as_str())
    }

    pub fn cand_list_has_next(&self) -> bool {
        self.chooser.has_next()
    }

    pub fn cand_list_has_prev(&self) -> bool {
        self.chooser.has_prev()
    }

    pub fn cand_list_first(&mut self) -> Result<()> {
        let moved = self
            .chooser
            .first(&mut self.composition, &self.tree, &self.store);
        self.refresh();
        moved
    }

    pub fn cand_list_last(&mut self) -> Result<()> {
        let moved = self
            .chooser
            .last(&mut self.composition, &self.tree, &self.store);
        self.refresh();
        moved
    }

    pub fn cand_list_next(&mut self) -> Result<()> {
        let moved = self
            .chooser
            .next(&mut self.composition, &self.tree, &self.store);
        self.refresh();
        moved
    }

    pub fn cand_list_prev(&mut self) -> Result<()> {
        let moved = self
            .chooser
            .prev(&mut self.composition, &self.tree, &self.store);
        self.refresh();
        moved
    }

    /// Commit the whole line. Fails when the line is empty or the choice
    /// window is open.
    pub fn commit_preedit(&mut self) -> Result<()> {
        if self.chooser.is_selecting() || self.composition.is_empty() {
            return Err(TaigiError::KeyIgnored);
        }
        self.context.commit_text.clear();
        self.commit_line();
        self.refresh();
        Ok(())
    }

    /// Drop the line without committing. Fails while the choice window is
    /// open.
    pub fn clean_preedit(&mut self) -> Result<()> {
        if self.chooser.is_selecting() {
            return Err(TaigiError::KeyIgnored);
        }
        self.composition.clear();
        self.slot.clear();
        self.refresh();
        Ok(())
    }

    /// Drop the syllable being typed.
    pub fn clean_bopomofo(&mut self) -> Result<()> {
        self.slot.clear();
        self.refresh();
        Ok(())
    }

    /// True if the last key committed text.
    pub fn commit_check(&self) -> bool {
        self.committed
    }

    pub fn commit_string(&self) -> &str {
        &self.context.commit_text
    }

    pub fn preedit_string(&self) -> String {
        self.composition.preedit()
    }

    /// Units of the syllable being typed.
    pub fn bopomofo_string(&self) -> String {
        self.slot.display()
    }

    /// Cursor as a buffer index.
    pub fn cursor(&self) -> usize {
        self.composition.cursor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::sequence_from_text;
    use crate::phrase::Phrase;
    use crate::tree::TreeBuilder;
    use proptest::prelude::*;

    fn engine() -> ImeEngine {
        let mut b = TreeBuilder::new();
        let add = |b: &mut TreeBuilder, syl: &str, text: &str, freq: u32| {
            let kind = PhraseKind::detect(text);
            b.insert(&sequence_from_text(syl).unwrap(), Phrase::new(text, freq, kind))
                .unwrap();
        };
        add(&mut b, "tsiah8", "食", 500);
        add(&mut b, "tsiah8", "tsia̍h", 100);
        add(&mut b, "png7", "飯", 300);
        add(&mut b, "tsiah8 png7", "食飯", 80);
        add(&mut b, "tsiah8 png7", "tsia̍h-pn̄g", 20);
        let tree = Arc::new(b.build());
        ImeEngine::new(
            tree,
            UserPhraseStore::new_in_memory(),
            Config::default(),
            KeyboardLayout::Tailo,
        )
    }

    fn type_str(e: &mut ImeEngine, keys: &str) -> Vec<KeyResult> {
        keys.chars()
            .map(|c| {
                let key = match c {
                    ' ' => KeyEvent::Space,
                    c => KeyEvent::Char(c),
                };
                e.process_key(key)
            })
            .collect()
    }

    #[test]
    fn types_and_commits() {
        let mut e = engine();
        type_str(&mut e, "tsiah8");
        assert_eq!(e.preedit_string(), "食");
        assert_eq!(e.bopomofo_string(), "");
        type_str(&mut e, "png");
        assert_eq!(e.bopomofo_string(), "png");
        assert_eq!(e.context().slot_text, "png");
        type_str(&mut e, "7");
        assert_eq!(e.preedit_string(), "食飯");
        assert_eq!(e.process_key(KeyEvent::Enter), KeyResult::Commit);
        assert_eq!(e.commit_string(), "食飯");
        assert!(e.commit_check());
        assert_eq!(e.store().lifetime(), 1);
        assert_eq!(e.process_key(KeyEvent::Enter), KeyResult::Ignore);
        assert!(!e.commit_check());
    }

    #[test]
    fn unknown_syllable() {
        let mut e = engine();
        let results = type_str(&mut e, "ka2");
        assert_eq!(results.last(), Some(&KeyResult::NoSuchSyllable));
        assert_eq!(e.preedit_string(), "");
        assert_eq!(e.bopomofo_string(), "");
    }

    #[test]
    fn symbols_and_rejects() {
        let mut e = engine();
        type_str(&mut e, "tsiah8");
        assert_eq!(e.process_key(KeyEvent::Char(',')), KeyResult::Absorb);
        assert_eq!(e.preedit_string(), "食,");
        assert_eq!(e.process_key(KeyEvent::Char('f')), KeyResult::Error);
        e.config_mut().set_full_width(true);
        e.process_key(KeyEvent::Char('.'));
        assert_eq!(e.preedit_string(), "食,．");
    }

    #[test]
    fn romanized_choice() {
        let mut e = engine();
        type_str(&mut e, "tsiah8png7");
        e.process_key(KeyEvent::Home);
        assert_eq!(e.process_key(KeyEvent::Down), KeyResult::Absorb);
        assert_eq!(e.cand_total_choice(), 2);
        assert_eq!(e.cand_string_by_index(1), Some("tsia̍h-pn̄g"));
        assert_eq!(e.context().span, Some((0, 2)));
        e.cand_choose_by_index(1).unwrap();
        assert_eq!(e.preedit_string(), "tsia̍h-pn̄g");
        assert!(!e.is_selecting());
        let learned = e
            .store()
            .lookup(PhraseKind::Romanized, &sequence_from_text("tsiah8 png7").unwrap())
            .unwrap();
        assert_eq!(learned.len(), 1);
    }

    #[test]
    fn selection_learns_without_auto_learn() {
        let mut e = engine();
        e.config_mut().set_auto_learn(false);
        type_str(&mut e, "tsiah8png7");
        e.process_key(KeyEvent::Home);
        e.process_key(KeyEvent::Down);
        e.cand_choose_by_index(1).unwrap();
        let phones = sequence_from_text("tsiah8 png7").unwrap();
        assert_eq!(e.store().lookup(PhraseKind::Romanized, &phones).unwrap().len(), 1);
    }

    #[test]
    fn commit_does_not_relearn_selection() {
        let mut e = engine();
        type_str(&mut e, "tsiah8png7");
        e.process_key(KeyEvent::Home);
        e.process_key(KeyEvent::Down);
        e.cand_choose_by_index(0).unwrap();
        let phones = sequence_from_text("tsiah8 png7").unwrap();
        let chosen = e.store().get(PhraseKind::Word, &phones, "食飯").unwrap().unwrap();

        assert_eq!(e.process_key(KeyEvent::Enter), KeyResult::Commit);
        let committed = e.store().get(PhraseKind::Word, &phones, "食飯").unwrap().unwrap();
        assert_eq!(committed.user_freq, chosen.user_freq);
        assert_eq!(committed.time, chosen.time);
    }

    #[test]
    fn span_stops_before_symbol() {
        let mut e = engine();
        type_str(&mut e, "tsiah8png7");
        e.process_key(KeyEvent::Char(','));
        type_str(&mut e, "tsiah8");
        assert_eq!(e.preedit_string(), "食飯,食");
        e.process_key(KeyEvent::Home);
        e.process_key(KeyEvent::Down);
        assert_eq!(e.chooser.current_len(), Some(2));
        assert_eq!(e.context().span, Some((0, 2)));
    }

    #[test]
    fn fullwidth_ascii() {
        let text: String = ",. a~".chars().map(fullwidth).collect();
        assert_eq!(text, "，．\u{3000}ａ～");
        assert_eq!(fullwidth('食'), '食');
    }

    #[test]
    fn escape_and_backspace() {
        let mut e = engine();
        type_str(&mut e, "tsiah8ts");
        assert_eq!(e.process_key(KeyEvent::Backspace), KeyResult::Absorb);
        assert_eq!(e.bopomofo_string(), "t");
        e.process_key(KeyEvent::Escape);
        assert_eq!(e.bopomofo_string(), "");
        assert_eq!(e.preedit_string(), "食");
        e.process_key(KeyEvent::Backspace);
        assert_eq!(e.preedit_string(), "");
        assert_eq!(e.process_key(KeyEvent::Escape), KeyResult::Ignore);
    }

    #[test]
    fn literal_mode() {
        let mut e = engine();
        e.process_key(KeyEvent::ShiftLock);
        assert_eq!(e.process_key(KeyEvent::Char('a')), KeyResult::Commit);
        assert_eq!(e.commit_string(), "a");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn same_keys_same_state(keys in proptest::collection::vec(
            proptest::sample::select(vec![
                KeyEvent::Char('t'), KeyEvent::Char('s'), KeyEvent::Char('i'),
                KeyEvent::Char('a'), KeyEvent::Char('h'), KeyEvent::Char('8'),
                KeyEvent::Char('p'), KeyEvent::Char('n'), KeyEvent::Char('g'),
                KeyEvent::Char('7'), KeyEvent::Char(','), KeyEvent::Space,
                KeyEvent::Backspace, KeyEvent::Left, KeyEvent::Down,
                KeyEvent::Tab, KeyEvent::Char('1'), KeyEvent::Enter,
            ]),
            0..40,
        )) {
            let mut a = engine();
            let mut b = engine();
            for &k in &keys {
                let ra = a.process_key(k);
                let rb = b.process_key(k);
                prop_assert_eq!(ra, rb);
                prop_assert_eq!(a.context(), b.context());
                if a.is_selecting() {
                    prop_assert!(a.cand_total_choice() > 0);
                }
            }
        }
    }
}
