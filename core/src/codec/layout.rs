//! Keyboard layouts and their key tables.
//!
//! Every Bopomofo layout is one 41-character string. Position `p` in the
//! string stands for the `p`-th phonetic symbol in the order
//! `ㄅ..ㄙ` (21 consonants), `ㄧㄨㄩ` (medials), `ㄚ..ㄦ` (13 rhymes) and
//! `˙ˊˇˋ` (tones). Keys that appear more than once are disambiguated by a
//! search ordinal (the n-th occurrence).
//!
//! The Tâi-lô layout maps the 17 letters and the tone digits directly.

use serde::{Deserialize, Serialize};

use super::Scheme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyboardLayout {
    #[default]
    Tailo,
    Standard,
    Hsu,
    Ibm,
    GinYieh,
    Eten,
    Eten26,
    Dvorak,
    DvorakHsu,
    DachenCp26,
    Carpalx,
}

const TAILO_KEYS: &str = "abeghijklmnopstuc123456789";

const STANDARD_KEYS: &str = "1qaz2wsxedcrfv5tgbyhnujm8ik,9ol.0p;/-7634";
const HSU_KEYS: &str = "bpmfdtnlgkhjvcjvcrzasexuyhgeiawomnkllsdfj";
const IBM_KEYS: &str = "1234567890-qwertyuiopasdfghjkl;zxcvbn/m,.";
const GIN_YIEH_KEYS: &str = "2wsx3edcrfvtgb6yhnujm8ik,9ol.0p;/-['=1qaz";
const ETEN_KEYS: &str = "bpmfdtnlvkhg7c,./j;'sexuaorwiqzy890-=1234";
const ETEN26_KEYS: &str = "bpmfdtnlvkhgvcgycjqwsexuaorwiqzpmntlhdfjk";
const DVORAK_KEYS: &str = "1'a;2,oq.ejpuk5yixfdbghm8ctw9rnv0lsz[7634";
const DACHEN_CP26_KEYS: &str = "qqazwwsxedcrfvttgbyhnujmuikbiolmoplnpyerd";
const CARPALX_KEYS: &str = "1qdz2gsxmtclnv5wrjyikfap8ue,9bo.0;h/-7634";

impl KeyboardLayout {
    pub const ALL: [KeyboardLayout; 11] = [
        KeyboardLayout::Tailo,
        KeyboardLayout::Standard,
        KeyboardLayout::Hsu,
        KeyboardLayout::Ibm,
        KeyboardLayout::GinYieh,
        KeyboardLayout::Eten,
        KeyboardLayout::Eten26,
        KeyboardLayout::Dvorak,
        KeyboardLayout::DvorakHsu,
        KeyboardLayout::DachenCp26,
        KeyboardLayout::Carpalx,
    ];

    pub fn scheme(self) -> Scheme {
        match self {
            KeyboardLayout::Tailo => Scheme::Tailo,
            _ => Scheme::Bopomofo,
        }
    }

    /// Key table for this layout (see module docs).
    pub fn keys(self) -> &'static str {
        match self {
            KeyboardLayout::Tailo => TAILO_KEYS,
            KeyboardLayout::Standard => STANDARD_KEYS,
            KeyboardLayout::Hsu | KeyboardLayout::DvorakHsu => HSU_KEYS,
            KeyboardLayout::Ibm => IBM_KEYS,
            KeyboardLayout::GinYieh => GIN_YIEH_KEYS,
            KeyboardLayout::Eten => ETEN_KEYS,
            KeyboardLayout::Eten26 => ETEN26_KEYS,
            KeyboardLayout::Dvorak => DVORAK_KEYS,
            KeyboardLayout::DachenCp26 => DACHEN_CP26_KEYS,
            KeyboardLayout::Carpalx => CARPALX_KEYS,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyboardLayout::Tailo => "tailo",
            KeyboardLayout::Standard => "standard",
            KeyboardLayout::Hsu => "hsu",
            KeyboardLayout::Ibm => "ibm",
            KeyboardLayout::GinYieh => "gin_yieh",
            KeyboardLayout::Eten => "eten",
            KeyboardLayout::Eten26 => "eten26",
            KeyboardLayout::Dvorak => "dvorak",
            KeyboardLayout::DvorakHsu => "dvorak_hsu",
            KeyboardLayout::DachenCp26 => "dachen_cp26",
            KeyboardLayout::Carpalx => "carpalx",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.name() == name)
    }

    /// Position of the `ordinal`-th (1-based) occurrence of `key`.
    pub fn key_position(self, key: char, ordinal: usize) -> Option<usize> {
        if ordinal == 0 {
            return None;
        }
        self.keys()
            .chars()
            .enumerate()
            .filter(|&(_, c)| c == key)
            .nth(ordinal - 1)
            .map(|(p, _)| p)
    }
}

impl std::fmt::Display for KeyboardLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
