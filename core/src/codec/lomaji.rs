//! Tâi-lô syllable packing and rendering.
//!
//! A Tâi-lô syllable is a run of up to `MAX_LETTERS` letter units followed by
//! a tone number. Letters are packed 5 bits each, first letter highest, and
//! the tone takes the low 4 bits:
//!
//! ```text
//! tsiah8  ->  t s i a h | 8
//!             15 14 6 1 5  (letter indices)
//! ```
//!
//! Rendering prefers the diacritic orthography (`tsia̍h`) and falls back to
//! the numbered form (`tsiah8`) whenever the marked form would not decode
//! back to the same code.

use unicode_normalization::UnicodeNormalization;

use super::Phone;

/// Letter units in index order (index = position + 1).
pub const LETTERS: [char; 17] = [
    'a', 'b', 'e', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 's', 't', 'u', 'c',
];

pub const MAX_LETTERS: usize = 10;
pub const MAX_TONE: u8 = 9;

const LETTER_BITS: u32 = 5;
const TONE_BITS: u32 = 4;

/// Vowel priority for placing the tone mark.
const MARK_PRIORITY: [char; 7] = ['a', 'e', 'i', 'o', 'u', 'm', 'n'];

pub fn letter_index(c: char) -> u8 {
    LETTERS
        .iter()
        .position(|&l| l == c)
        .map(|p| p as u8 + 1)
        .unwrap_or(0)
}

pub fn letter_at(index: u8) -> Option<char> {
    if index == 0 {
        return None;
    }
    LETTERS.get(index as usize - 1).copied()
}

/// Pack letter indices and a tone. Returns 0 when anything is out of range.
pub fn pack(letters: &[u8], tone: u8) -> Phone {
    if letters.is_empty() || letters.len() > MAX_LETTERS || tone > MAX_TONE {
        return 0;
    }
    let mut body: Phone = 0;
    for &l in letters {
        if l == 0 || l as usize > LETTERS.len() {
            return 0;
        }
        body = (body << LETTER_BITS) | Phone::from(l);
    }
    (body << TONE_BITS) | Phone::from(tone)
}

/// Split a packed code into (letters, tone).
pub fn unpack(code: Phone) -> (Vec<u8>, u8) {
    let tone = (code & 0xF) as u8;
    let mut body = code >> TONE_BITS;
    let mut letters = Vec::new();
    while body != 0 {
        letters.push((body & 0x1F) as u8);
        body >>= LETTER_BITS;
    }
    letters.reverse();
    (letters, tone)
}

fn is_checked_final(last: char) -> bool {
    matches!(last, 'p' | 't' | 'k' | 'h')
}

/// Tone implied by a syllable written without any mark.
pub fn unmarked_tone(letters: &[u8]) -> u8 {
    match letters.last().and_then(|&l| letter_at(l)) {
        Some(c) if is_checked_final(c) => 4,
        _ => 1,
    }
}

fn combining_mark(tone: u8, vowel: char) -> Option<char> {
    match (tone, vowel) {
        (2, _) => Some('\u{0301}'),
        (3, _) => Some('\u{0300}'),
        (5, _) => Some('\u{0302}'),
        (6, 'm') => Some('\u{0306}'),
        (6, _) => Some('\u{030C}'),
        (7, _) => Some('\u{0304}'),
        (8, _) => Some('\u{030D}'),
        (9, 'm') => None,
        (9, _) => Some('\u{030B}'),
        _ => None,
    }
}

fn tone_of_mark(mark: char) -> Option<u8> {
    match mark {
        '\u{0301}' => Some(2),
        '\u{0300}' => Some(3),
        '\u{0302}' => Some(5),
        '\u{030C}' | '\u{0306}' => Some(6),
        '\u{0304}' => Some(7),
        '\u{030D}' => Some(8),
        '\u{030B}' => Some(9),
        _ => None,
    }
}

fn letters_text(letters: &[u8]) -> String {
    letters.iter().filter_map(|&l| letter_at(l)).collect()
}

/// Numbered form, e.g. `tsiah8`.
pub fn numbered(code: Phone) -> String {
    let (letters, tone) = unpack(code);
    format!("{}{}", letters_text(&letters), tone)
}

fn marked(letters: &[u8], tone: u8) -> Option<String> {
    let plain = letters_text(letters);
    if tone == 0 {
        return None;
    }
    if tone == 1 || tone == 4 {
        return Some(plain);
    }
    let (pos, vowel) = MARK_PRIORITY
        .iter()
        .find_map(|&v| plain.find(v).map(|p| (p, v)))?;
    let mark = combining_mark(tone, vowel)?;
    let mut out = String::with_capacity(plain.len() + 2);
    out.push_str(&plain[..=pos]);
    out.push(mark);
    out.push_str(&plain[pos + 1..]);
    Some(out.nfc().collect())
}

/// Render a code in diacritic orthography, or numbered form if the
/// diacritic form is ambiguous.
pub fn render(code: Phone) -> String {
    let (letters, tone) = unpack(code);
    match marked(&letters, tone) {
        Some(text) if parse(&text) == Some(code) => text,
        _ => numbered(code),
    }
}

/// Parse one syllable in numbered or diacritic form.
pub fn parse(token: &str) -> Option<Phone> {
    let lowered: String = token.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }
    let mut letters = Vec::new();
    let mut tone: Option<u8> = None;
    let mut digit: Option<u8> = None;
    for c in lowered.nfd() {
        if let Some(d) = c.to_digit(10) {
            if digit.is_some() {
                return None;
            }
            digit = Some(d as u8);
            continue;
        }
        if digit.is_some() {
            return None;
        }
        if let Some(t) = tone_of_mark(c) {
            if tone.is_some() {
                return None;
            }
            tone = Some(t);
            continue;
        }
        match letter_index(c) {
            0 => return None,
            idx => letters.push(idx),
        }
    }
    let tone = match (digit, tone) {
        (Some(_), Some(_)) => return None,
        (Some(d), None) => d,
        (None, Some(t)) => t,
        (None, None) => unmarked_tone(&letters),
    };
    match pack(&letters, tone) {
        0 => None,
        code => Some(code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(s: &str) -> Vec<u8> {
        s.chars().map(letter_index).collect()
    }

    #[test]
    fn pack_unpack() {
        let code = pack(&letters("tsiah"), 8);
        assert_ne!(code, 0);
        assert_eq!(unpack(code), (letters("tsiah"), 8));
    }

    #[test]
    fn pack_rejects_out_of_range() {
        assert_eq!(pack(&[], 1), 0);
        assert_eq!(pack(&[18], 1), 0);
        assert_eq!(pack(&[0, 1], 1), 0);
        assert_eq!(pack(&letters("a"), 10), 0);
        assert_eq!(pack(&[1; MAX_LETTERS + 1], 1), 0);
    }

    #[test]
    fn render_diacritics() {
        assert_eq!(render(pack(&letters("tsiah"), 8)), "tsia\u{030D}h");
        assert_eq!(render(pack(&letters("pn"), 7)), "pn\u{0304}");
        assert_eq!(render(pack(&letters("ho"), 2)), "hó");
        assert_eq!(render(pack(&letters("lang"), 5)), "lâng");
        assert_eq!(render(pack(&letters("tsit"), 4)), "tsit");
        assert_eq!(render(pack(&letters("gua"), 2)), "guá");
    }

    #[test]
    fn render_falls_back_to_numbered() {
        // An unmarked checked syllable reads as tone 4, so tone 1 needs a digit.
        assert_eq!(render(pack(&letters("tsit"), 1)), "tsit1");
        assert_eq!(render(pack(&letters("a"), 4)), "a4");
        assert_eq!(render(pack(&letters("hm"), 9)), "hm9");
        assert_eq!(render(pack(&letters("a"), 0)), "a0");
    }

    #[test]
    fn parse_forms() {
        let code = pack(&letters("tsiah"), 8);
        assert_eq!(parse("tsiah8"), Some(code));
        assert_eq!(parse("tsia̍h"), Some(code));
        assert_eq!(parse("TSIAH8"), Some(code));
        assert_eq!(parse("tsit"), Some(pack(&letters("tsit"), 4)));
        assert_eq!(parse("tsui"), Some(pack(&letters("tsui"), 1)));
        assert_eq!(parse("x1"), None);
        assert_eq!(parse("a12"), None);
        assert_eq!(parse("á2"), None);
        assert_eq!(parse(""), None);
    }
}
