//! Error types shared by every layer of the engine.
//!
//! Composition-level failures (`KeyRejected`, `KeyIgnored`, `NoSuchSyllable`)
//! are recovered locally and reported to the caller as key results. Learning
//! failures (`PersistenceFailure`, `AlignmentMismatch`) are surfaced by the
//! user phrase store but never block composition.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TaigiError>;

#[derive(Debug, Error)]
pub enum TaigiError {
    #[error("key does not form a valid composition step")]
    KeyRejected,

    #[error("key is not handled in the current mode")]
    KeyIgnored,

    #[error("syllable has no dictionary entry")]
    NoSuchSyllable,

    #[error("malformed syllable: {0}")]
    MalformedSyllable(String),

    #[error("candidate index {index} out of range (total {total})")]
    IndexOutOfRange { index: usize, total: usize },

    #[error("no candidate span at the cursor")]
    InvalidSpan,

    #[error("candidate window is not open")]
    NotSelecting,

    #[error("phrase longer than {max} syllables")]
    PhraseTooLong { max: usize },

    #[error("phrase has {chars} characters but {phones} phonemes")]
    AlignmentMismatch { phones: usize, chars: usize },

    #[error("user phrase store failure: {0}")]
    PersistenceFailure(String),

    #[error("invalid dictionary: {0}")]
    InvalidDictionary(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),
}

macro_rules! persistence_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for TaigiError {
                fn from(e: $ty) -> Self {
                    TaigiError::PersistenceFailure(e.to_string())
                }
            }
        )*
    };
}

persistence_from!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl TaigiError {
    /// True for errors produced by the learning side effect only.
    pub fn is_learning_failure(&self) -> bool {
        matches!(
            self,
            TaigiError::PersistenceFailure(_)
                | TaigiError::AlignmentMismatch { .. }
                | TaigiError::PhraseTooLong { .. }
        )
    }
}
