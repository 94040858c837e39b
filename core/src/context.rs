//! IME context for platform communication.
//!
//! The `ImeContext` struct is a plain data snapshot the engine refreshes
//! after every key. Platform code reads the fields to redraw the preedit,
//! the choice window and the syllable being typed.

/// IME context for platform communication.
///
/// # Fields
///
/// - `preedit_text`: line being composed (displayed with underline)
/// - `preedit_cursor`: cursor position within the preedit (byte offset)
/// - `slot_text`: units of the syllable being typed
/// - `commit_text`: text to commit to the application (consume and clear)
/// - `candidates`: candidates on the current choice page
/// - `candidate_page` / `candidate_pages`: paging position
/// - `auxiliary_text`: hint text, e.g. the page indicator
/// - `span`: buffer range `[start, end)` the choice window covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImeContext {
    pub preedit_text: String,

    /// Byte offset into `preedit_text`
    pub preedit_cursor: usize,

    pub slot_text: String,

    pub commit_text: String,

    pub candidates: Vec<String>,

    pub candidate_page: usize,

    pub candidate_pages: usize,

    pub auxiliary_text: String,

    pub span: Option<(usize, usize)>,
}

impl ImeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all state except `commit_text` (the platform consumes it first).
    pub fn clear(&mut self) {
        self.preedit_text.clear();
        self.preedit_cursor = 0;
        self.slot_text.clear();
        self.candidates.clear();
        self.candidate_page = 0;
        self.candidate_pages = 0;
        self.auxiliary_text.clear();
        self.span = None;
    }

    /// Take the commit text, leaving it empty.
    pub fn take_commit(&mut self) -> String {
        std::mem::take(&mut self.commit_text)
    }

    /// Check if there's any visible state (preedit, slot or candidates).
    pub fn has_visible_state(&self) -> bool {
        !self.preedit_text.is_empty() || !self.slot_text.is_empty() || !self.candidates.is_empty()
    }

    pub fn has_commit(&self) -> bool {
        !self.commit_text.is_empty()
    }
}
