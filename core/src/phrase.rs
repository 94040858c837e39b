//! Phrase records and the word / romanized variants.

use serde::{Deserialize, Serialize};

/// Script variant of a phrase.
///
/// The two variants count their length differently: a word phrase has one
/// character per syllable, a romanized phrase has one hyphen-separated part
/// per syllable (`tsia̍h-pn̄g` is two syllables).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PhraseKind {
    #[default]
    Word,
    Romanized,
}

impl PhraseKind {
    /// Guess the variant from the text: anything containing Latin letters is
    /// romanized.
    pub fn detect(text: &str) -> Self {
        if text.chars().any(|c| c.is_ascii_alphabetic()) {
            PhraseKind::Romanized
        } else {
            PhraseKind::Word
        }
    }

    /// Number of syllables the text spells.
    pub fn syllable_count(self, text: &str) -> usize {
        match self {
            PhraseKind::Word => text.chars().count(),
            PhraseKind::Romanized => text.split('-').filter(|p| !p.is_empty()).count(),
        }
    }

    /// Split the text into one display piece per syllable, or `None` if the
    /// text does not have exactly `len` syllables.
    pub fn split_syllables(self, text: &str, len: usize) -> Option<Vec<String>> {
        let pieces: Vec<String> = match self {
            PhraseKind::Word => text.chars().map(String::from).collect(),
            PhraseKind::Romanized => {
                let parts: Vec<&str> = text.split('-').filter(|p| !p.is_empty()).collect();
                let last = parts.len().saturating_sub(1);
                parts
                    .iter()
                    .enumerate()
                    .map(|(i, p)| if i < last { format!("{p}-") } else { (*p).to_string() })
                    .collect()
            }
        };
        (pieces.len() == len).then_some(pieces)
    }
}

/// A phrase as stored in the dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phrase {
    pub text: String,
    pub freq: u32,
    pub kind: PhraseKind,
}

impl Phrase {
    pub fn new<T: Into<String>>(text: T, freq: u32, kind: PhraseKind) -> Self {
        Self {
            text: text.into(),
            freq,
            kind,
        }
    }
}
