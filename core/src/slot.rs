//! Per-syllable input slot.
//!
//! The slot collects phonetic units for the syllable being typed and turns
//! them into a [`Phone`] when an end key (tone key or space) arrives. Each
//! keyboard layout has its own input function; the layouts that fold
//! several Bopomofo symbols onto one key (HSU, ET26, DACHEN-CP26) carry fixed
//! substitution tables that reinterpret already-typed units.

use crate::codec::{
    bopomofo_symbol, code_from_unit_indices, lomaji, tone_mark, unit_index_from_key,
    KeyboardLayout, Phone, Scheme, UnitClass,
};

const CONSONANT: usize = 0;
const MEDIAL: usize = 1;
const RHYME: usize = 2;
const TONE: usize = 3;

const CLASSES: [UnitClass; 3] = [UnitClass::Consonant, UnitClass::Medial, UnitClass::Rhyme];

/// Result of feeding one key to the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOutcome {
    /// Key consumed, syllable still open
    Absorb,
    /// Syllable finished
    Commit { phone: Phone, phone_alt: Phone },
    /// Key is not a phonetic unit here
    KeyError,
    /// Syllable finished but no such syllable exists; slot cleared
    NoWord,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    layout: KeyboardLayout,
    letters: Vec<u8>,
    pho: [u8; 4],
    /// Consonant before a fuzzy rewrite, used for the alternate phone.
    alt_consonant: Option<u8>,
}

impl Slot {
    pub fn new(layout: KeyboardLayout) -> Self {
        Self {
            layout,
            ..Default::default()
        }
    }

    pub fn layout(&self) -> KeyboardLayout {
        self.layout
    }

    pub fn set_layout(&mut self, layout: KeyboardLayout) {
        self.clear();
        self.layout = layout;
    }

    /// True when any unit of the current syllable has been typed.
    pub fn is_entering(&self) -> bool {
        !self.letters.is_empty() || self.pho.iter().any(|&p| p != 0)
    }

    pub fn clear(&mut self) {
        self.letters.clear();
        self.pho = [0; 4];
        self.alt_consonant = None;
    }

    /// Drop the most recently typed unit.
    pub fn remove_last(&mut self) {
        if self.layout.scheme() == Scheme::Tailo {
            self.letters.pop();
            return;
        }
        if let Some(i) = (0..4).rev().find(|&i| self.pho[i] != 0) {
            self.pho[i] = 0;
            if i == CONSONANT {
                self.alt_consonant = None;
            }
        }
    }

    /// Text of the units typed so far.
    pub fn display(&self) -> String {
        if self.layout.scheme() == Scheme::Tailo {
            return self
                .letters
                .iter()
                .filter_map(|&l| lomaji::letter_at(l))
                .collect();
        }
        let mut out: String = CLASSES
            .iter()
            .zip(self.pho.iter())
            .filter_map(|(&class, &idx)| bopomofo_symbol(class, idx))
            .collect();
        if self.pho[TONE] != 0 {
            out.push_str(tone_mark(self.pho[TONE]));
        }
        out
    }

    /// Feed one key. `exists` reports whether a phone has at least one
    /// single-syllable entry.
    pub fn input(&mut self, key: char, exists: &dyn Fn(Phone) -> bool) -> SlotOutcome {
        match self.layout {
            KeyboardLayout::Tailo => self.tailo_input(key, exists),
            KeyboardLayout::Hsu => self.hsu_input(key, exists),
            KeyboardLayout::DvorakHsu => self.hsu_input(dvorak_to_qwerty(key), exists),
            KeyboardLayout::Eten26 => self.et26_input(key, exists),
            KeyboardLayout::DachenCp26 => self.dachen_cp26_input(key, exists),
            _ => self.default_input(key, exists),
        }
    }

    // ========== Tâi-lô ==========

    fn tailo_input(&mut self, key: char, exists: &dyn Fn(Phone) -> bool) -> SlotOutcome {
        let tone = unit_index_from_key(key, UnitClass::Tone, self.layout, 1);
        if (tone != 0 || key == ' ') && !self.letters.is_empty() {
            let tone = if tone == 0 {
                lomaji::unmarked_tone(&self.letters)
            } else {
                tone
            };
            let phone = code_from_unit_indices(Scheme::Tailo, &self.letters, tone);
            return self.finish(phone, phone, exists);
        }
        let letter = unit_index_from_key(key, UnitClass::Letter, self.layout, 1);
        if letter == 0 || self.letters.len() >= lomaji::MAX_LETTERS {
            return SlotOutcome::KeyError;
        }
        self.letters.push(letter);
        SlotOutcome::Absorb
    }

    // ========== Bopomofo ==========

    fn has_body(&self) -> bool {
        self.pho[CONSONANT] != 0 || self.pho[MEDIAL] != 0 || self.pho[RHYME] != 0
    }

    fn finish(&mut self, phone: Phone, alt: Phone, exists: &dyn Fn(Phone) -> bool) -> SlotOutcome {
        self.clear();
        let primary_ok = phone != 0 && exists(phone);
        let alt_ok = alt != 0 && exists(alt);
        match (primary_ok, alt_ok) {
            (true, _) => SlotOutcome::Commit {
                phone,
                phone_alt: if alt_ok { alt } else { phone },
            },
            (false, true) => SlotOutcome::Commit {
                phone: alt,
                phone_alt: alt,
            },
            (false, false) => SlotOutcome::NoWord,
        }
    }

    fn end_key(&mut self, key: char, search: usize, exists: &dyn Fn(Phone) -> bool) -> SlotOutcome {
        let tone = if key == ' ' {
            1
        } else {
            match unit_index_from_key(key, UnitClass::Tone, self.layout, search) {
                0 => 1,
                t => t,
            }
        };
        let body = [self.pho[CONSONANT], self.pho[MEDIAL], self.pho[RHYME]];
        let phone = code_from_unit_indices(Scheme::Bopomofo, &body, tone);
        let alt = match self.alt_consonant {
            Some(c) => code_from_unit_indices(Scheme::Bopomofo, &[c, body[1], body[2]], tone),
            None => phone,
        };
        self.finish(phone, alt, exists)
    }

    /// First matching unit class for `key`, with the search ordinal policy of
    /// the folded layouts. Returns `(class, index)`, class 3 when not found.
    fn search_units(&self, key: char, rhyme_wanted: impl Fn(usize, u8) -> bool) -> (usize, u8) {
        let mut search = 1;
        let mut inx = 0;
        let mut class = 0;
        while class < 3 {
            inx = unit_index_from_key(key, CLASSES[class], self.layout, search);
            if inx == 0 {
                class += 1;
                continue;
            }
            if rhyme_wanted(class, inx) {
                search = 2;
                class += 1;
                continue;
            }
            break;
        }
        (class, inx)
    }

    fn default_input(&mut self, key: char, exists: &dyn Fn(Phone) -> bool) -> SlotOutcome {
        let is_end_key =
            key == ' ' || unit_index_from_key(key, UnitClass::Tone, self.layout, 1) != 0;
        if is_end_key {
            if self.has_body() {
                return self.end_key(key, 1, exists);
            }
        } else {
            self.pho[TONE] = 0;
        }
        for (class, &unit) in CLASSES.iter().enumerate() {
            let inx = unit_index_from_key(key, unit, self.layout, 1);
            if inx != 0 {
                self.pho[class] = inx;
                return SlotOutcome::Absorb;
            }
        }
        SlotOutcome::KeyError
    }

    fn not_a_unit(key: char) -> SlotOutcome {
        if key.is_ascii_alphabetic() {
            SlotOutcome::NoWord
        } else {
            SlotOutcome::KeyError
        }
    }

    fn hsu_input(&mut self, key: char, exists: &dyn Fn(Phone) -> bool) -> SlotOutcome {
        if matches!(key, 's' | 'd' | 'f' | 'j' | ' ') && self.has_body() {
            let pho = &mut self.pho;
            if pho[MEDIAL] == 0 && pho[RHYME] == 0 {
                match pho[CONSONANT] {
                    // ㄐㄑㄒ -> ㄓㄔㄕ
                    12..=14 => pho[CONSONANT] += 3,
                    // ㄏ -> ㄛ, ㄍ -> ㄜ, ㄇ -> ㄢ, ㄋ -> ㄣ, ㄎ -> ㄤ, ㄌ -> ㄦ
                    c @ (11 | 9 | 3 | 7 | 10 | 8) => {
                        pho[CONSONANT] = 0;
                        pho[RHYME] = match c {
                            11 => 2,
                            9 => 3,
                            3 => 9,
                            7 => 10,
                            10 => 11,
                            _ => 13,
                        };
                    }
                    _ => {}
                }
            }
            self.hsu_fuzzy();
            let search = if key == 'j' { 3 } else { 2 };
            return self.end_key(key, search, exists);
        }

        let medial_present = self.pho[MEDIAL] != 0;
        let body_started = self.pho[CONSONANT] != 0 || medial_present;
        let (class, inx) = self.search_units(key, |class, inx| match class {
            0 => (inx == 3 || (7..=11).contains(&inx) || inx == 20) && body_started,
            // ㄧ vs ㄝ on the same key
            1 => inx == 1 && medial_present,
            _ => false,
        });

        self.hsu_fuzzy();
        let pho = &mut self.pho;
        // ㄐㄑㄒ must be followed by ㄧㄩ
        if class == MEDIAL && inx == 2 && (12..=14).contains(&pho[CONSONANT]) {
            pho[CONSONANT] += 3;
        }
        if class == RHYME && pho[MEDIAL] == 0 && (12..=14).contains(&pho[CONSONANT]) {
            pho[CONSONANT] += 3;
        }
        if class == 3 {
            return Self::not_a_unit(key);
        }
        pho[class] = inx;
        SlotOutcome::Absorb
    }

    /// ㄍㄧ and ㄍㄩ are read as ㄐㄧ and ㄐㄩ.
    fn hsu_fuzzy(&mut self) {
        if self.pho[CONSONANT] == 9 && matches!(self.pho[MEDIAL], 1 | 3) {
            self.pho[CONSONANT] = 12;
            self.alt_consonant = Some(9);
        }
    }

    fn et26_input(&mut self, key: char, exists: &dyn Fn(Phone) -> bool) -> SlotOutcome {
        if matches!(key, 'd' | 'f' | 'j' | 'k' | ' ') && self.has_body() {
            let pho = &mut self.pho;
            if pho[MEDIAL] == 0 && pho[RHYME] == 0 {
                match pho[CONSONANT] {
                    // ㄐㄒ -> ㄓㄕ
                    12 | 14 => pho[CONSONANT] += 3,
                    // ㄆ -> ㄡ, ㄇ -> ㄢ, ㄋ -> ㄣ, ㄊ -> ㄤ, ㄌ -> ㄥ, ㄏ -> ㄦ
                    c @ (2 | 3 | 7 | 6 | 8 | 11) => {
                        pho[CONSONANT] = 0;
                        pho[RHYME] = match c {
                            2 => 8,
                            3 => 9,
                            7 => 10,
                            6 => 11,
                            8 => 12,
                            _ => 13,
                        };
                    }
                    _ => {}
                }
            }
            return self.end_key(key, 2, exists);
        }

        let body_started = self.pho[CONSONANT] != 0 || self.pho[MEDIAL] != 0;
        let (class, inx) = self.search_units(key, |class, inx| {
            class == 0
                && (matches!(inx, 2 | 3 | 11 | 19 | 20) || (6..=8).contains(&inx))
                && body_started
        });

        let pho = &mut self.pho;
        if class == MEDIAL {
            if inx == 2 {
                if matches!(pho[CONSONANT], 12 | 14) {
                    pho[CONSONANT] += 3;
                }
            } else if pho[CONSONANT] == 9 {
                // ㄍ -> ㄑ
                pho[CONSONANT] = 13;
            }
        }
        if class == RHYME && pho[MEDIAL] == 0 && matches!(pho[CONSONANT], 12 | 14) {
            pho[CONSONANT] += 3;
        }
        if class == 3 {
            return Self::not_a_unit(key);
        }
        pho[class] = inx;
        SlotOutcome::Absorb
    }

    fn dachen_cp26_input(&mut self, key: char, exists: &dyn Fn(Phone) -> bool) -> SlotOutcome {
        if matches!(key, 'e' | 'r' | 'd' | 'y' | ' ') && self.has_body() {
            return self.end_key(key, 2, exists);
        }

        let (class, inx) = self.search_units(key, |_, _| false);
        let body_started = self.pho[CONSONANT] != 0 || self.pho[MEDIAL] != 0;
        let pho = &mut self.pho;
        let toggled = match key {
            // ㄅ/ㄆ, ㄉ/ㄊ, ㄓ/ㄔ
            'q' => switch_between(&mut pho[CONSONANT], 1, 2),
            'w' => switch_between(&mut pho[CONSONANT], 5, 6),
            't' => switch_between(&mut pho[CONSONANT], 15, 16),
            // ㄖ -> ㄝ, ㄙ -> ㄥ after a consonant or medial
            'b' if body_started => {
                pho[RHYME] = 4;
                true
            }
            'n' if body_started => {
                pho[RHYME] = 12;
                true
            }
            // ㄧ / ㄚ / ㄧㄚ
            'u' => {
                if pho[MEDIAL] == 1 && pho[RHYME] != 1 {
                    pho[MEDIAL] = 0;
                    pho[RHYME] = 1;
                    true
                } else if pho[MEDIAL] != 1 && pho[RHYME] == 1 {
                    pho[MEDIAL] = 1;
                    true
                } else if pho[MEDIAL] == 1 && pho[RHYME] == 1 {
                    pho[MEDIAL] = 0;
                    pho[RHYME] = 0;
                    true
                } else if pho[MEDIAL] != 0 {
                    pho[RHYME] = 1;
                    true
                } else {
                    false
                }
            }
            // ㄩ / ㄡ
            'm' => {
                if pho[MEDIAL] == 3 && pho[RHYME] != 8 {
                    pho[MEDIAL] = 0;
                    pho[RHYME] = 8;
                    true
                } else if pho[MEDIAL] != 3 && pho[RHYME] == 8 {
                    pho[MEDIAL] = 3;
                    pho[RHYME] = 0;
                    true
                } else if pho[MEDIAL] != 0 {
                    pho[RHYME] = 8;
                    true
                } else {
                    false
                }
            }
            // ㄛ/ㄞ, ㄟ/ㄢ, ㄠ/ㄤ, ㄣ/ㄦ
            'i' => switch_between(&mut pho[RHYME], 2, 5),
            'o' => switch_between(&mut pho[RHYME], 6, 9),
            'l' => switch_between(&mut pho[RHYME], 7, 11),
            'p' => switch_between(&mut pho[RHYME], 10, 13),
            _ => false,
        };
        if toggled {
            return SlotOutcome::Absorb;
        }
        if class == 3 {
            return Self::not_a_unit(key);
        }
        pho[class] = inx;
        SlotOutcome::Absorb
    }
}

fn switch_between(slot: &mut u8, a: u8, b: u8) -> bool {
    if *slot == a {
        *slot = b;
        true
    } else if *slot == b {
        *slot = a;
        true
    } else {
        false
    }
}

/// Map a Dvorak key to the QWERTY key at the same position.
fn dvorak_to_qwerty(key: char) -> char {
    const DVORAK: &str = "',.pyfgcrl/=aoeuidhtns-;qjkxbmwvz";
    const QWERTY: &str = "qwertyuiop[]asdfghjkl;'zxcvbnm,./";
    DVORAK
        .chars()
        .position(|c| c == key)
        .and_then(|p| QWERTY.chars().nth(p))
        .unwrap_or(key)
}
