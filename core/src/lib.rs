//! libtaigi-core
//!
//! Phoneme codec, static phrase tree, user phrase learning and the
//! composition engine shared by the `libtaigi` crate.
//!
//! The static dictionary is a bincode node array plus a phrase text blob;
//! learned phrases live in redb (or in memory for tests).
//!
//! Public API:
//! - `Phone` / `KeyboardLayout` - packed syllable codes and key tables
//! - `Slot` - per-syllable key state machine
//! - `PhraseTree` / `TreeBuilder` - static dictionary reader and writer
//! - `UserPhraseStore` - learned phrases and the frequency model
//! - `Composition` / `Chooser` - line buffer, phrasing and choice window
//! - `ImeEngine` - key processing and the keyboardless API
//! - `Config` - configuration shared by every layout
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Result, TaigiError};

pub mod codec;
pub use codec::{
    sequence_from_text, text_from_code, text_from_sequence, KeyboardLayout, Phone, Scheme,
    NO_PHONE,
};

pub mod slot;
pub use slot::{Slot, SlotOutcome};

pub mod phrase;
pub use phrase::{Phrase, PhraseKind};

pub mod tree;
pub use tree::{PhraseTree, TreeBuilder};

pub mod userphrase;
pub use userphrase::{UserPhraseRecord, UserPhraseStore, MAX_PHRASE_LEN};

pub mod learning;
pub use learning::{update_freq, UserUpdate};

pub mod candidate;
pub use candidate::{Candidate, CandidateList, MAX_CHOICE};

pub mod composition;
pub use composition::{Composition, Interval, MAX_CHI_SYMBOL_LEN, MAX_PHONE_SEQ_LEN};

pub mod choice;
pub use choice::Chooser;

pub mod context;
pub use context::ImeContext;

pub mod engine;
pub use engine::{ImeEngine, KeyEvent, KeyResult};

pub const MIN_CAND_PER_PAGE: usize = 1;
pub const MAX_CAND_PER_PAGE: usize = 10;
pub const SELECT_KEY_COUNT: usize = 10;

/// Configuration shared by every keyboard layout.
///
/// Layout-specific options (keyboard layout, data paths) belong in
/// `TaigiConfig` in the `libtaigi` crate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Candidates shown per page (1-10)
    pub candidates_per_page: usize,

    /// Items the line may hold before the leading phrase is committed
    /// automatically (0-39)
    pub max_composed_length: usize,

    /// Offer spans ending at the cursor instead of starting at it
    pub phrase_choice_rearward: bool,

    /// Exactly ten keys; the first picks the first candidate on the page
    pub select_keys: String,

    /// Space opens the choice window when no syllable is being typed
    pub space_as_selection: bool,

    /// Escape clears the whole line, not only the syllable being typed
    pub esc_clean_all_buf: bool,

    /// Insert symbols in full width
    pub full_width: bool,

    /// Learn phrases on commit
    pub auto_learn: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            candidates_per_page: MAX_CAND_PER_PAGE,
            max_composed_length: MAX_CHI_SYMBOL_LEN,
            phrase_choice_rearward: false,
            select_keys: "1234567890".to_string(),
            space_as_selection: false,
            esc_clean_all_buf: false,
            full_width: false,
            auto_learn: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. Out-of-range values fall back to
    /// their defaults.
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: Config =
            toml::from_str(content).map_err(|e| TaigiError::InvalidConfig(e.to_string()))?;
        Ok(raw.sanitized())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TaigiError::InvalidConfig(e.to_string()))
    }

    /// Copy of `self` with every invalid field reset to its default.
    pub fn sanitized(self) -> Self {
        let mut out = Config::default();
        out.set_candidates_per_page(self.candidates_per_page);
        out.set_max_composed_length(self.max_composed_length);
        out.set_select_keys(&self.select_keys);
        out.phrase_choice_rearward = self.phrase_choice_rearward;
        out.space_as_selection = self.space_as_selection;
        out.esc_clean_all_buf = self.esc_clean_all_buf;
        out.full_width = self.full_width;
        out.auto_learn = self.auto_learn;
        out
    }

    // ========== Validating setters ==========

    /// Ignored unless `n` is in 1..=10.
    pub fn set_candidates_per_page(&mut self, n: usize) {
        if (MIN_CAND_PER_PAGE..=MAX_CAND_PER_PAGE).contains(&n) {
            self.candidates_per_page = n;
        }
    }

    /// Ignored unless `n` is in 0..=39.
    pub fn set_max_composed_length(&mut self, n: usize) {
        if n <= MAX_CHI_SYMBOL_LEN {
            self.max_composed_length = n;
        }
    }

    pub fn set_phrase_choice_rearward(&mut self, rearward: bool) {
        self.phrase_choice_rearward = rearward;
    }

    pub fn set_space_as_selection(&mut self, enabled: bool) {
        self.space_as_selection = enabled;
    }

    pub fn set_esc_clean_all_buf(&mut self, enabled: bool) {
        self.esc_clean_all_buf = enabled;
    }

    pub fn set_full_width(&mut self, enabled: bool) {
        self.full_width = enabled;
    }

    pub fn toggle_full_width(&mut self) {
        self.full_width = !self.full_width;
    }

    pub fn set_auto_learn(&mut self, enabled: bool) {
        self.auto_learn = enabled;
    }

    // ========== Selection Keys Management ==========

    /// Set the selection keys. Ignored unless `keys` has exactly ten
    /// distinct characters.
    ///
    /// # Example
    /// ```
    /// # use libtaigi_core::Config;
    /// let mut config = Config::default();
    /// config.set_select_keys("asdfghjkl;");
    /// assert_eq!(config.select_keys, "asdfghjkl;");
    /// config.set_select_keys("asdf");
    /// assert_eq!(config.select_keys, "asdfghjkl;");
    /// ```
    pub fn set_select_keys(&mut self, keys: &str) {
        let chars: Vec<char> = keys.chars().collect();
        let distinct = chars
            .iter()
            .enumerate()
            .all(|(i, c)| !chars[..i].contains(c));
        if chars.len() == SELECT_KEY_COUNT && distinct {
            self.select_keys = keys.to_string();
        }
    }

    /// Position of `ch` among the selection keys.
    pub fn selection_key_index(&self, ch: char) -> Option<usize> {
        self.select_keys.chars().position(|c| c == ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.candidates_per_page, 10);
        assert_eq!(config.max_composed_length, 39);
        assert_eq!(config.select_keys, "1234567890");
        assert!(!config.phrase_choice_rearward);
        assert!(!config.space_as_selection);
        assert!(!config.esc_clean_all_buf);
        assert!(config.auto_learn);
    }

    #[test]
    fn setters_ignore_invalid_values() {
        let mut config = Config::default();
        for valid in [MIN_CAND_PER_PAGE, MAX_CAND_PER_PAGE] {
            config.set_candidates_per_page(valid);
            for invalid in [MIN_CAND_PER_PAGE - 1, MAX_CAND_PER_PAGE + 1] {
                config.set_candidates_per_page(invalid);
                assert_eq!(config.candidates_per_page, valid);
            }
        }

        config.set_max_composed_length(16);
        config.set_max_composed_length(MAX_CHI_SYMBOL_LEN + 1);
        assert_eq!(config.max_composed_length, 16);

        config.set_select_keys("asdfghjkl");
        config.set_select_keys("asdfghjkl;'");
        config.set_select_keys("aadfghjkl;");
        assert_eq!(config.select_keys, "1234567890");
        assert_eq!(config.selection_key_index('0'), Some(9));
    }

    #[test]
    fn toml_round_trip_and_sanitize() {
        let mut config = Config::default();
        config.set_phrase_choice_rearward(true);
        config.set_candidates_per_page(5);
        let text = config.to_toml_string().unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), config);

        let loaded = Config::from_toml_str("candidates_per_page = 99\nfull_width = true").unwrap();
        assert_eq!(loaded.candidates_per_page, 10);
        assert!(loaded.full_width);
        assert!(Config::from_toml_str("candidates_per_page = \"x\"").is_err());
    }
}
