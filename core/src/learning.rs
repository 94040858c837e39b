//! Frequency learning for user phrases.
//!
//! Every confirmed phrase is written back to the [`UserPhraseStore`]. A new
//! phrase starts at its dictionary frequency; a known phrase is bumped by an
//! amount that depends on how long ago (in commits) it was last used:
//!
//! - under 4000 commits: a large step, capped at `SHORT_INCREASE_FREQ` once the
//!   phrase already leads its sequence
//! - under 50000 commits: the same with a smaller step
//! - otherwise: decay toward the original frequency
//!
//! Public API:
//! - `update_freq` - the pure frequency formula
//! - `UserPhraseStore::update` - learn one phrase

use tracing::debug;

use crate::codec::Phone;
use crate::error::{Result, TaigiError};
use crate::phrase::PhraseKind;
use crate::tree::PhraseTree;
use crate::userphrase::{UserPhraseRecord, UserPhraseStore, MAX_PHRASE_LEN};

pub const FREQ_INIT_VALUE: u32 = 1;
pub const SHORT_INCREASE_FREQ: u32 = 10;
pub const MEDIUM_INCREASE_FREQ: u32 = 5;
pub const LONG_DECREASE_FREQ: u32 = 10;
pub const MAX_ALLOW_FREQ: u32 = 99_999_999;

const SHORT_INTERVAL: u64 = 4000;
const MEDIUM_INTERVAL: u64 = 50000;

/// What [`UserPhraseStore::update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserUpdate {
    Inserted,
    Modified,
}

fn increase(freq: i64, max_freq: i64, orig_freq: i64, divisor: i64, step: i64) -> i64 {
    let base = (max_freq - orig_freq) / divisor + 1;
    let delta = if freq >= max_freq {
        base.min(step)
    } else {
        base.max(step)
    };
    (freq + delta).min(i64::from(MAX_ALLOW_FREQ))
}

/// New user frequency for a phrase last used `delta_time` commits ago.
///
/// The result never drops below `orig_freq` and never exceeds
/// [`MAX_ALLOW_FREQ`].
pub fn update_freq(freq: u32, max_freq: u32, orig_freq: u32, delta_time: u64) -> u32 {
    let (f, m, o) = (i64::from(freq), i64::from(max_freq), i64::from(orig_freq));
    let next = if delta_time < SHORT_INTERVAL {
        increase(f, m, o, 5, i64::from(SHORT_INCREASE_FREQ))
    } else if delta_time < MEDIUM_INTERVAL {
        increase(f, m, o, 10, i64::from(MEDIUM_INCREASE_FREQ))
    } else {
        let delta = ((f - o) / 5).max(i64::from(LONG_DECREASE_FREQ));
        (f - delta).max(o)
    };
    let next = next.max(o).min(i64::from(MAX_ALLOW_FREQ));
    // bounded to [0, MAX_ALLOW_FREQ] above
    u32::try_from(next).unwrap_or(MAX_ALLOW_FREQ)
}

/// Dictionary frequency of `text` under `phones`, if the tree has it.
fn dictionary_freq(tree: &PhraseTree, phones: &[Phone], text: &str) -> Option<u32> {
    let node = tree.find_phrase(phones, 0, phones.len())?;
    tree.phrases(node).find(|p| p.text == text).map(|p| p.freq)
}

impl UserPhraseStore {
    /// Highest frequency known for `phones`, from the tree and from this
    /// store's records of the same kind.
    pub fn max_freq(&self, tree: &PhraseTree, kind: PhraseKind, phones: &[Phone]) -> u32 {
        let tree_max = tree
            .find_phrase(phones, 0, phones.len())
            .and_then(|node| tree.phrases(node).map(|p| p.freq).max())
            .unwrap_or(0);
        let user_max = self
            .lookup_or_empty(kind, phones)
            .iter()
            .map(|r| r.user_freq)
            .max()
            .unwrap_or(0);
        FREQ_INIT_VALUE.max(tree_max).max(user_max)
    }

    /// Learn one confirmed phrase at the current lifetime.
    pub fn update(
        &mut self,
        tree: &PhraseTree,
        kind: PhraseKind,
        phones: &[Phone],
        text: &str,
    ) -> Result<UserUpdate> {
        if phones.is_empty() || phones.len() > MAX_PHRASE_LEN {
            return Err(TaigiError::PhraseTooLong { max: MAX_PHRASE_LEN });
        }
        if kind == PhraseKind::Word {
            let chars = text.chars().count();
            if chars != phones.len() {
                return Err(TaigiError::AlignmentMismatch {
                    phones: phones.len(),
                    chars,
                });
            }
        }

        let now = self.lifetime();
        let max_freq = self.max_freq(tree, kind, phones);
        let (record, outcome) = match self.get(kind, phones, text)? {
            Some(existing) => {
                let delta = now.saturating_sub(existing.time);
                let user_freq =
                    update_freq(existing.user_freq, max_freq, existing.orig_freq, delta);
                let record = UserPhraseRecord {
                    user_freq,
                    max_freq,
                    time: now,
                    ..existing
                };
                (record, UserUpdate::Modified)
            }
            None => {
                let orig_freq = dictionary_freq(tree, phones, text).unwrap_or(FREQ_INIT_VALUE);
                let record = UserPhraseRecord {
                    phones: phones.to_vec(),
                    phrase: text.to_string(),
                    orig_freq,
                    user_freq: orig_freq,
                    max_freq,
                    time: now,
                    kind,
                };
                (record, UserUpdate::Inserted)
            }
        };
        self.put(&record)?;
        debug!(phrase = %record.phrase, freq = record.user_freq, ?outcome, "learned phrase");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::sequence_from_text;
    use crate::phrase::Phrase;
    use crate::tree::TreeBuilder;
    use proptest::prelude::*;

    fn tree() -> (PhraseTree, Vec<Phone>) {
        let phones = sequence_from_text("tshik4 tshi3").unwrap();
        let mut b = TreeBuilder::new();
        b.insert(&phones, Phrase::new("測試", 300, PhraseKind::Word)).unwrap();
        b.insert(&phones, Phrase::new("策試", 20, PhraseKind::Word)).unwrap();
        (b.build(), phones)
    }

    #[test]
    fn short_interval_steps() {
        // leading phrase: capped step
        assert_eq!(update_freq(300, 300, 20, 10), 310);
        // trailing phrase: at least the short step
        assert_eq!(update_freq(20, 300, 20, 10), 20 + 57);
        assert_eq!(update_freq(1, 1, 1, 0), 2);
    }

    #[test]
    fn medium_and_long_intervals() {
        assert_eq!(update_freq(300, 300, 20, 4000), 305);
        assert_eq!(update_freq(20, 300, 20, 10_000), 20 + 29);
        // decay, floored at the original frequency
        assert_eq!(update_freq(200, 300, 20, 60_000), 164);
        assert_eq!(update_freq(25, 300, 20, 60_000), 20);
    }

    #[test]
    fn capped_at_max() {
        assert_eq!(update_freq(MAX_ALLOW_FREQ, MAX_ALLOW_FREQ, 1, 0), MAX_ALLOW_FREQ);
    }

    #[test]
    fn insert_then_modify() {
        let (tree, phones) = tree();
        let mut store = UserPhraseStore::new_in_memory();

        assert_eq!(
            store.update(&tree, PhraseKind::Word, &phones, "策試").unwrap(),
            UserUpdate::Inserted
        );
        let rec = store.get(PhraseKind::Word, &phones, "策試").unwrap().unwrap();
        assert_eq!((rec.orig_freq, rec.user_freq, rec.max_freq), (20, 20, 300));

        store.increase_lifetime().unwrap();
        assert_eq!(
            store.update(&tree, PhraseKind::Word, &phones, "策試").unwrap(),
            UserUpdate::Modified
        );
        let rec = store.get(PhraseKind::Word, &phones, "策試").unwrap().unwrap();
        assert_eq!(rec.user_freq, 20 + 57);
        assert_eq!(rec.time, 1);
    }

    #[test]
    fn unknown_phrase_starts_at_init_value() {
        let (tree, phones) = tree();
        let mut store = UserPhraseStore::new_in_memory();
        store.update(&tree, PhraseKind::Word, &phones, "側刺").unwrap();
        let rec = store.get(PhraseKind::Word, &phones, "側刺").unwrap().unwrap();
        assert_eq!(rec.orig_freq, FREQ_INIT_VALUE);
    }

    #[test]
    fn validation() {
        let (tree, phones) = tree();
        let mut store = UserPhraseStore::new_in_memory();
        assert!(matches!(
            store.update(&tree, PhraseKind::Word, &phones, "測"),
            Err(TaigiError::AlignmentMismatch { phones: 2, chars: 1 })
        ));
        let long = vec![phones[0]; MAX_PHRASE_LEN + 1];
        assert!(matches!(
            store.update(&tree, PhraseKind::Romanized, &long, "x"),
            Err(TaigiError::PhraseTooLong { .. })
        ));
        // romanized phrases are not aligned by character
        assert!(store
            .update(&tree, PhraseKind::Romanized, &phones, "tshik-tshì")
            .is_ok());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn stays_within_bounds(
            orig in 0u32..=MAX_ALLOW_FREQ,
            extra in 0u32..=1000,
            freq_extra in 0u32..=100_000,
            delta in 0u64..100_000,
        ) {
            let max = orig.saturating_add(extra).min(MAX_ALLOW_FREQ);
            let freq = orig.saturating_add(freq_extra).min(MAX_ALLOW_FREQ);
            let next = update_freq(freq, max, orig, delta);
            prop_assert!(next >= orig);
            prop_assert!(next <= MAX_ALLOW_FREQ);
            if delta < MEDIUM_INTERVAL {
                prop_assert!(next >= freq);
            }
        }
    }
}
