//! Static name tables for keyboard layouts and scripted key input.
//!
//! ## Layout names
//!
//! Front ends name layouts in several ways: the snake_case names used in
//! `TaigiConfig`, the `KB_*` identifiers common in Bopomofo IME settings,
//! and a few short aliases. All of them resolve through one table.
//!
//! ## Key scripts
//!
//! Tests and the REPL describe key presses as plain text. Ordinary
//! characters become `KeyEvent::Char` (space becomes `KeyEvent::Space`);
//! named keys are written in angle brackets:
//!
//! ```text
//! hk4<H><D>3<E>     type ㄘㄜˋ, Home, open choices, pick the third, Enter
//! ```

use libtaigi_core::{KeyEvent, KeyboardLayout};
use phf::phf_map;

static LAYOUT_NAMES: phf::Map<&'static str, KeyboardLayout> = phf_map! {
    "tailo" => KeyboardLayout::Tailo,
    "tl" => KeyboardLayout::Tailo,
    "lomaji" => KeyboardLayout::Tailo,
    "standard" => KeyboardLayout::Standard,
    "default" => KeyboardLayout::Standard,
    "kb_default" => KeyboardLayout::Standard,
    "hsu" => KeyboardLayout::Hsu,
    "kb_hsu" => KeyboardLayout::Hsu,
    "ibm" => KeyboardLayout::Ibm,
    "kb_ibm" => KeyboardLayout::Ibm,
    "gin_yieh" => KeyboardLayout::GinYieh,
    "kb_gin_yieh" => KeyboardLayout::GinYieh,
    "eten" => KeyboardLayout::Eten,
    "kb_et" => KeyboardLayout::Eten,
    "eten26" => KeyboardLayout::Eten26,
    "kb_et26" => KeyboardLayout::Eten26,
    "dvorak" => KeyboardLayout::Dvorak,
    "kb_dvorak" => KeyboardLayout::Dvorak,
    "dvorak_hsu" => KeyboardLayout::DvorakHsu,
    "kb_dvorak_hsu" => KeyboardLayout::DvorakHsu,
    "dachen_cp26" => KeyboardLayout::DachenCp26,
    "kb_dachen_cp26" => KeyboardLayout::DachenCp26,
    "carpalx" => KeyboardLayout::Carpalx,
    "kb_carpalx" => KeyboardLayout::Carpalx,
};

static NAMED_KEYS: phf::Map<&'static str, KeyEvent> = phf_map! {
    "E" => KeyEvent::Enter,
    "B" => KeyEvent::Backspace,
    "DC" => KeyEvent::Delete,
    "EE" => KeyEvent::Escape,
    "L" => KeyEvent::Left,
    "R" => KeyEvent::Right,
    "H" => KeyEvent::Home,
    "EN" => KeyEvent::End,
    "U" => KeyEvent::Up,
    "D" => KeyEvent::Down,
    "PU" => KeyEvent::PageUp,
    "PD" => KeyEvent::PageDown,
    "T" => KeyEvent::Tab,
    "SL" => KeyEvent::ShiftLock,
};

/// Resolve a layout name, case-insensitively.
pub fn layout_from_name(name: &str) -> Option<KeyboardLayout> {
    let key = name.trim().to_ascii_lowercase().replace('-', "_");
    LAYOUT_NAMES.get(key.as_str()).copied()
}

/// Turn a key script into key events.
///
/// `<N0>`..`<N9>` are number keys and `<C-x>` is Ctrl+x. An unknown or
/// unterminated `<...>` is typed literally.
pub fn parse_key_sequence(script: &str) -> Vec<KeyEvent> {
    let mut keys = Vec::new();
    let mut rest = script;
    while let Some(c) = rest.chars().next() {
        if c == '<' {
            if let Some(end) = rest.find('>') {
                if let Some(key) = named_key(&rest[1..end]) {
                    keys.push(key);
                    rest = &rest[end + 1..];
                    continue;
                }
            }
        }
        keys.push(match c {
            ' ' => KeyEvent::Space,
            c => KeyEvent::Char(c),
        });
        rest = &rest[c.len_utf8()..];
    }
    keys
}

fn named_key(name: &str) -> Option<KeyEvent> {
    if let Some(&key) = NAMED_KEYS.get(name) {
        return Some(key);
    }
    if let Some(ctrl) = name.strip_prefix("C-") {
        let mut chars = ctrl.chars();
        return match (chars.next(), chars.next()) {
            (Some(c), None) => Some(KeyEvent::Ctrl(c)),
            _ => None,
        };
    }
    let digit = name.strip_prefix('N')?;
    match digit.parse::<u8>() {
        Ok(n) if n <= 9 && digit.len() == 1 => Some(KeyEvent::Number(n)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_layout_has_its_own_name() {
        for layout in KeyboardLayout::ALL {
            assert_eq!(layout_from_name(layout.name()), Some(layout));
        }
        assert_eq!(layout_from_name("KB_ET26"), Some(KeyboardLayout::Eten26));
        assert_eq!(layout_from_name("Dvorak-HSU"), Some(KeyboardLayout::DvorakHsu));
        assert_eq!(layout_from_name("pinyin"), None);
    }

    #[test]
    fn key_scripts() {
        assert_eq!(
            parse_key_sequence("hk4<H><D><N3> <E>"),
            vec![
                KeyEvent::Char('h'),
                KeyEvent::Char('k'),
                KeyEvent::Char('4'),
                KeyEvent::Home,
                KeyEvent::Down,
                KeyEvent::Number(3),
                KeyEvent::Space,
                KeyEvent::Enter,
            ]
        );
        assert_eq!(parse_key_sequence("<C-a>"), vec![KeyEvent::Ctrl('a')]);
        assert_eq!(
            parse_key_sequence("<x"),
            vec![KeyEvent::Char('<'), KeyEvent::Char('x')]
        );
        assert_eq!(
            parse_key_sequence("<N12>"),
            "<N12>".chars().map(KeyEvent::Char).collect::<Vec<_>>()
        );
    }
}
