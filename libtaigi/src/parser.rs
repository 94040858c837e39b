/*!
Dictionary source parser - `libtaigi/src/parser.rs`

Reads the plain-text phrase list that `libtaigi compile` turns into the
static dictionary pair (`index.bin` + `phrase.bin`).

Format
------
One phrase per line:

```text
# comment
食飯        80   tsiah8 png7
tsia̍h-pn̄g  20   tsia̍h-pn̄g
冊          900  ㄘㄜˋ
```

- phrase text, frequency, then the syllables (Tâi-lô or Bopomofo,
  whitespace or hyphen separated)
- romanized phrases are recognized by their Latin letters
- blank lines and `#` comments are skipped
*/

use std::io::BufRead;

use libtaigi_core::{
    sequence_from_text, Phone, Phrase, PhraseKind, Result, TaigiError, TreeBuilder,
};
use regex::Regex;
use tracing::{info, warn};

/// One parsed source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub phones: Vec<Phone>,
    pub phrase: Phrase,
}

/// Line parser for the dictionary source.
#[derive(Debug, Clone)]
pub struct SourceParser {
    line: Regex,
}

impl SourceParser {
    pub fn new() -> Result<Self> {
        let line = Regex::new(r"^(?P<text>\S+)\s+(?P<freq>\d+)\s+(?P<syllables>\S.*?)\s*$")
            .map_err(|e| TaigiError::InvalidDictionary(e.to_string()))?;
        Ok(Self { line })
    }

    /// Parse one line. `Ok(None)` for blank lines and comments.
    pub fn parse_line(&self, line: &str) -> Result<Option<SourceEntry>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let caps = self
            .line
            .captures(line)
            .ok_or_else(|| TaigiError::InvalidDictionary(format!("malformed line: {line}")))?;
        let text = &caps["text"];
        let freq: u32 = caps["freq"]
            .parse()
            .map_err(|_| TaigiError::InvalidDictionary(format!("bad frequency: {line}")))?;
        let phones = sequence_from_text(&caps["syllables"])?;

        let kind = PhraseKind::detect(text);
        let chars = kind.syllable_count(text);
        if chars != phones.len() {
            return Err(TaigiError::AlignmentMismatch {
                phones: phones.len(),
                chars,
            });
        }
        Ok(Some(SourceEntry {
            phones,
            phrase: Phrase::new(text, freq, kind),
        }))
    }
}

/// Read a whole source into a builder. Bad lines are skipped with a
/// warning; read errors abort.
pub fn compile_source<R: BufRead>(reader: R) -> Result<TreeBuilder> {
    let parser = SourceParser::new()?;
    let mut builder = TreeBuilder::new();
    let mut added = 0usize;
    let mut skipped = 0usize;
    for (no, line) in reader.lines().enumerate() {
        let line = line?;
        match parser.parse_line(&line) {
            Ok(Some(entry)) => {
                builder.insert(&entry.phones, entry.phrase)?;
                added += 1;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(line = no + 1, "skipping source line: {e}");
                skipped += 1;
            }
        }
    }
    info!(added, skipped, "dictionary source read");
    Ok(builder)
}
