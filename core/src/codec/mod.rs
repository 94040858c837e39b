//! Phoneme codec: keys, unit indices, packed codes and syllable text.
//!
//! A [`Phone`] packs one syllable into an integer so phrase lookups compare
//! integers instead of strings. Two phonetic schemes share the code space:
//!
//! - Tâi-lô letters and tone numbers (see [`lomaji`])
//! - Bopomofo consonant / medial / rhyme / tone (tagged with `BOPOMOFO_TAG`)
//!
//! Zero is never a valid code and terminates phone sequences.
//!
//! Public API:
//! - `unit_index_from_key` - key -> unit index for a layout and unit class
//! - `code_from_unit_indices` - pack unit indices plus tone
//! - `text_from_code` - render a code as syllable text
//! - `sequence_from_text` - parse whitespace or hyphen separated syllables

pub mod layout;
pub mod lomaji;

pub use layout::KeyboardLayout;

use crate::error::{Result, TaigiError};

/// Packed syllable code. `0` means "no phone".
pub type Phone = u64;

pub const NO_PHONE: Phone = 0;

const BOPOMOFO_TAG: Phone = 1 << 62;

const CONSONANTS: [char; 21] = [
    'ㄅ', 'ㄆ', 'ㄇ', 'ㄈ', 'ㄉ', 'ㄊ', 'ㄋ', 'ㄌ', 'ㄍ', 'ㄎ', 'ㄏ', 'ㄐ', 'ㄑ', 'ㄒ', 'ㄓ',
    'ㄔ', 'ㄕ', 'ㄖ', 'ㄗ', 'ㄘ', 'ㄙ',
];
const MEDIALS: [char; 3] = ['ㄧ', 'ㄨ', 'ㄩ'];
const RHYMES: [char; 13] = [
    'ㄚ', 'ㄛ', 'ㄜ', 'ㄝ', 'ㄞ', 'ㄟ', 'ㄠ', 'ㄡ', 'ㄢ', 'ㄣ', 'ㄤ', 'ㄥ', 'ㄦ',
];
/// Tone marks by tone index; tone 1 is written without a mark.
const TONE_MARKS: [&str; 6] = ["", "", "ˊ", "ˇ", "ˋ", "˙"];
/// Tone index for the key-table tone positions `˙ˊˇˋ`.
const KEY_TONES: [u8; 4] = [5, 2, 3, 4];

const BOPOMOFO_SHIFT: [u32; 4] = [9, 7, 3, 0];
const BOPOMOFO_MASK: [Phone; 4] = [0x1F, 0x3, 0xF, 0x7];
const BOPOMOFO_LIMIT: [u8; 4] = [21, 3, 13, 5];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Tailo,
    Bopomofo,
}

/// Phonetic unit tables a key can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitClass {
    /// Tâi-lô letter
    Letter,
    Consonant,
    Medial,
    Rhyme,
    Tone,
}

impl Scheme {
    /// Unit at key-table position `pos`.
    fn unit_at(self, pos: usize) -> (UnitClass, u8) {
        match self {
            Scheme::Tailo => {
                if pos < lomaji::LETTERS.len() {
                    (UnitClass::Letter, pos as u8 + 1)
                } else {
                    (UnitClass::Tone, (pos - lomaji::LETTERS.len()) as u8 + 1)
                }
            }
            Scheme::Bopomofo => match pos {
                0..=20 => (UnitClass::Consonant, pos as u8 + 1),
                21..=23 => (UnitClass::Medial, (pos - 20) as u8),
                24..=36 => (UnitClass::Rhyme, (pos - 23) as u8),
                _ => (UnitClass::Tone, KEY_TONES[(pos - 37).min(3)]),
            },
        }
    }

    pub fn of(code: Phone) -> Scheme {
        if code & BOPOMOFO_TAG != 0 {
            Scheme::Bopomofo
        } else {
            Scheme::Tailo
        }
    }
}

/// Index of `key` within `class` for `layout`, using the `search_ordinal`-th
/// occurrence of the key in the layout table. Returns 0 if not found.
pub fn unit_index_from_key(
    key: char,
    class: UnitClass,
    layout: KeyboardLayout,
    search_ordinal: usize,
) -> u8 {
    match layout.key_position(key, search_ordinal) {
        Some(pos) => match layout.scheme().unit_at(pos) {
            (c, idx) if c == class => idx,
            _ => 0,
        },
        None => 0,
    }
}

/// Pack unit indices and a tone into a code; 0 rejects the input.
///
/// For Tâi-lô `units` are letter indices in order. For Bopomofo `units` is
/// `[consonant, medial, rhyme]` where 0 marks an empty position.
pub fn code_from_unit_indices(scheme: Scheme, units: &[u8], tone: u8) -> Phone {
    match scheme {
        Scheme::Tailo => lomaji::pack(units, tone),
        Scheme::Bopomofo => {
            if units.len() != 3 || units.iter().all(|&u| u == 0) {
                return 0;
            }
            let mut code = BOPOMOFO_TAG;
            for (i, &idx) in units.iter().chain(std::iter::once(&tone)).enumerate() {
                if idx > BOPOMOFO_LIMIT[i] {
                    return 0;
                }
                code |= Phone::from(idx) << BOPOMOFO_SHIFT[i];
            }
            code
        }
    }
}

/// Split a Bopomofo code into `[consonant, medial, rhyme, tone]`.
pub fn bopomofo_indices(code: Phone) -> [u8; 4] {
    let mut out = [0u8; 4];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = ((code >> BOPOMOFO_SHIFT[i]) & BOPOMOFO_MASK[i]) as u8;
    }
    out
}

/// Render a code as syllable text. Unknown or zero codes render empty.
pub fn text_from_code(code: Phone) -> String {
    if code == NO_PHONE {
        return String::new();
    }
    match Scheme::of(code) {
        Scheme::Tailo => lomaji::render(code),
        Scheme::Bopomofo => {
            let [c, m, r, t] = bopomofo_indices(code);
            let mut out = String::new();
            for (class, idx) in [(UnitClass::Consonant, c), (UnitClass::Medial, m), (UnitClass::Rhyme, r)] {
                if let Some(ch) = bopomofo_symbol(class, idx) {
                    out.push(ch);
                }
            }
            out.push_str(tone_mark(t));
            out
        }
    }
}

/// Bopomofo symbol for a consonant, medial or rhyme index.
pub fn bopomofo_symbol(class: UnitClass, idx: u8) -> Option<char> {
    let table: &[char] = match class {
        UnitClass::Consonant => &CONSONANTS,
        UnitClass::Medial => &MEDIALS,
        UnitClass::Rhyme => &RHYMES,
        UnitClass::Tone | UnitClass::Letter => return None,
    };
    table.get((idx as usize).checked_sub(1)?).copied()
}

/// Bopomofo tone mark; tone 1 and unknown tones are unmarked.
pub fn tone_mark(tone: u8) -> &'static str {
    TONE_MARKS.get(tone as usize).copied().unwrap_or("")
}

fn parse_bopomofo(token: &str) -> Option<Phone> {
    let mut units = [0u8; 3];
    let mut tone = 0u8;
    let mut last_class = 0usize;
    for ch in token.chars() {
        if tone != 0 {
            return None;
        }
        let (class, idx) = if let Some(p) = CONSONANTS.iter().position(|&c| c == ch) {
            (0, p + 1)
        } else if let Some(p) = MEDIALS.iter().position(|&c| c == ch) {
            (1, p + 1)
        } else if let Some(p) = RHYMES.iter().position(|&c| c == ch) {
            (2, p + 1)
        } else if let Some(p) = TONE_MARKS.iter().skip(2).position(|m| m.starts_with(ch)) {
            tone = p as u8 + 2;
            continue;
        } else {
            return None;
        };
        if units[class] != 0 || class < last_class {
            return None;
        }
        units[class] = idx as u8;
        last_class = class;
    }
    if tone == 0 {
        tone = 1;
    }
    match code_from_unit_indices(Scheme::Bopomofo, &units, tone) {
        0 => None,
        code => Some(code),
    }
}

/// Parse one syllable written in Tâi-lô (numbered or diacritic) or Bopomofo.
pub fn phone_from_text(token: &str) -> Option<Phone> {
    let first = token.chars().next()?;
    if ('\u{3105}'..='\u{3129}').contains(&first) {
        parse_bopomofo(token)
    } else {
        lomaji::parse(token)
    }
}

/// Split a run of syllables separated by whitespace or hyphens into codes.
pub fn sequence_from_text(text: &str) -> Result<Vec<Phone>> {
    let mut seq = Vec::new();
    for token in text
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|t| !t.is_empty())
    {
        match phone_from_text(token) {
            Some(code) => seq.push(code),
            None => return Err(TaigiError::MalformedSyllable(token.to_string())),
        }
    }
    if seq.is_empty() {
        return Err(TaigiError::MalformedSyllable(text.to_string()));
    }
    Ok(seq)
}

/// Render a phone sequence as space separated syllables.
pub fn text_from_sequence(seq: &[Phone]) -> String {
    seq.iter()
        .map(|&p| text_from_code(p))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tailo_keys_map_to_units() {
        let l = KeyboardLayout::Tailo;
        assert_eq!(unit_index_from_key('a', UnitClass::Letter, l, 1), 1);
        assert_eq!(unit_index_from_key('c', UnitClass::Letter, l, 1), 17);
        assert_eq!(unit_index_from_key('8', UnitClass::Tone, l, 1), 8);
        assert_eq!(unit_index_from_key('8', UnitClass::Letter, l, 1), 0);
        assert_eq!(unit_index_from_key('x', UnitClass::Letter, l, 1), 0);
    }

    #[test]
    fn standard_keys_map_to_units() {
        let l = KeyboardLayout::Standard;
        // h = ㄘ, k = ㄜ, 4 = ˋ
        assert_eq!(unit_index_from_key('h', UnitClass::Consonant, l, 1), 20);
        assert_eq!(unit_index_from_key('k', UnitClass::Rhyme, l, 1), 3);
        assert_eq!(unit_index_from_key('4', UnitClass::Tone, l, 1), 4);
        assert_eq!(unit_index_from_key('7', UnitClass::Tone, l, 1), 5);
        assert_eq!(unit_index_from_key('u', UnitClass::Medial, l, 1), 1);
        assert_eq!(unit_index_from_key('h', UnitClass::Rhyme, l, 1), 0);
    }

    #[test]
    fn bopomofo_text() {
        let code = code_from_unit_indices(Scheme::Bopomofo, &[20, 0, 3], 4);
        assert_eq!(text_from_code(code), "ㄘㄜˋ");
        assert_eq!(phone_from_text("ㄘㄜˋ"), Some(code));
        let first = code_from_unit_indices(Scheme::Bopomofo, &[0, 1, 0], 1);
        assert_eq!(text_from_code(first), "ㄧ");
        assert_eq!(phone_from_text("ㄧ"), Some(first));
        assert_eq!(phone_from_text("ㄜㄘ"), None);
    }

    #[test]
    fn bopomofo_rejects_out_of_range() {
        assert_eq!(code_from_unit_indices(Scheme::Bopomofo, &[22, 0, 0], 1), 0);
        assert_eq!(code_from_unit_indices(Scheme::Bopomofo, &[0, 0, 0], 1), 0);
        assert_eq!(code_from_unit_indices(Scheme::Bopomofo, &[1, 0, 0], 6), 0);
        assert_eq!(code_from_unit_indices(Scheme::Bopomofo, &[1, 0], 1), 0);
    }

    #[test]
    fn schemes_do_not_collide() {
        let tailo = code_from_unit_indices(Scheme::Tailo, &[1], 1);
        let bpmf = code_from_unit_indices(Scheme::Bopomofo, &[0, 0, 1], 1);
        assert_ne!(tailo, bpmf);
        assert_eq!(Scheme::of(tailo), Scheme::Tailo);
        assert_eq!(Scheme::of(bpmf), Scheme::Bopomofo);
    }

    #[test]
    fn sequence_parsing() {
        let seq = sequence_from_text("tsia\u{30D}h-pn\u{304}g").unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(text_from_sequence(&seq), "tsia\u{30D}h pn\u{304}g");
        assert_eq!(sequence_from_text("tsiah8 png7").unwrap(), seq);
        assert!(matches!(
            sequence_from_text("tsiah8 qq"),
            Err(TaigiError::MalformedSyllable(t)) if t == "qq"
        ));
        assert!(sequence_from_text("  ").is_err());
    }

    #[test]
    fn slot_symbols() {
        assert_eq!(bopomofo_symbol(UnitClass::Consonant, 1), Some('ㄅ'));
        assert_eq!(bopomofo_symbol(UnitClass::Rhyme, 13), Some('ㄦ'));
        assert_eq!(bopomofo_symbol(UnitClass::Medial, 0), None);
        assert_eq!(tone_mark(4), "ˋ");
        assert_eq!(tone_mark(1), "");
    }

    proptest! {
        #[test]
        fn tailo_round_trip(letters in prop::collection::vec(1u8..=17, 1..=lomaji::MAX_LETTERS), tone in 0u8..=9) {
            let code = code_from_unit_indices(Scheme::Tailo, &letters, tone);
            prop_assert_ne!(code, 0);
            prop_assert_eq!(phone_from_text(&text_from_code(code)), Some(code));
        }

        #[test]
        fn bopomofo_round_trip(c in 0u8..=21, m in 0u8..=3, r in 0u8..=13, tone in 1u8..=5) {
            prop_assume!(c != 0 || m != 0 || r != 0);
            let code = code_from_unit_indices(Scheme::Bopomofo, &[c, m, r], tone);
            prop_assert_ne!(code, 0);
            prop_assert_eq!(phone_from_text(&text_from_code(code)), Some(code));
        }
    }
}
