//! User phrase store.
//!
//! Learned phrases are keyed by (phone sequence, phrase text) and kept in two
//! independent tables, one per [`PhraseKind`]. A record remembers the
//! dictionary frequency it started from, its current user frequency, the
//! largest frequency seen for its sequence and the logical time it was last
//! used.
//!
//! Backends:
//! - `InMemory` for tests and sessions without a store file
//! - `Redb` for persistent storage; updates inside a `begin`/`end` bracket
//!   share one write transaction
//!
//! Keys are `[len: u8][phones: u64 BE ...][text: utf8]` so every phrase for
//! a sequence sits in one contiguous key range. Values are bincode records.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::codec::Phone;
use crate::error::{Result, TaigiError};
use crate::phrase::PhraseKind;

/// Longest phrase, in syllables, the store accepts.
pub const MAX_PHRASE_LEN: usize = 11;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPhraseRecord {
    pub phones: Vec<Phone>,
    pub phrase: String,
    pub orig_freq: u32,
    pub user_freq: u32,
    pub max_freq: u32,
    pub time: u64,
    pub kind: PhraseKind,
}

fn seq_prefix(phones: &[Phone]) -> Result<Vec<u8>> {
    if phones.is_empty() || phones.len() > MAX_PHRASE_LEN {
        return Err(TaigiError::PhraseTooLong { max: MAX_PHRASE_LEN });
    }
    let mut key = Vec::with_capacity(1 + phones.len() * 8);
    key.push(phones.len() as u8);
    for p in phones {
        key.extend_from_slice(&p.to_be_bytes());
    }
    Ok(key)
}

fn record_key(phones: &[Phone], phrase: &str) -> Result<Vec<u8>> {
    let mut key = seq_prefix(phones)?;
    key.extend_from_slice(phrase.as_bytes());
    Ok(key)
}

// ========== In-memory backend ==========

type Table = BTreeMap<Vec<u8>, UserPhraseRecord>;

#[derive(Clone, Debug, Default)]
pub struct InMemoryUserPhrases {
    words: Arc<RwLock<Table>>,
    romanized: Arc<RwLock<Table>>,
    lifetime: Arc<RwLock<u64>>,
}

impl InMemoryUserPhrases {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, kind: PhraseKind) -> &Arc<RwLock<Table>> {
        match kind {
            PhraseKind::Word => &self.words,
            PhraseKind::Romanized => &self.romanized,
        }
    }

    fn poisoned() -> TaigiError {
        TaigiError::PersistenceFailure("user phrase table lock poisoned".into())
    }

    fn lookup(&self, kind: PhraseKind, phones: &[Phone]) -> Result<Vec<UserPhraseRecord>> {
        let prefix = seq_prefix(phones)?;
        let map = self.table(kind).read().map_err(|_| Self::poisoned())?;
        Ok(map
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(_, v)| v.clone())
            .collect())
    }

    fn get(&self, kind: PhraseKind, phones: &[Phone], phrase: &str) -> Result<Option<UserPhraseRecord>> {
        let key = record_key(phones, phrase)?;
        let map = self.table(kind).read().map_err(|_| Self::poisoned())?;
        Ok(map.get(&key).cloned())
    }

    fn put(&self, record: &UserPhraseRecord) -> Result<()> {
        let key = record_key(&record.phones, &record.phrase)?;
        let mut map = self.table(record.kind).write().map_err(|_| Self::poisoned())?;
        map.insert(key, record.clone());
        Ok(())
    }

    fn remove(&self, kind: PhraseKind, phones: &[Phone], phrase: &str) -> Result<usize> {
        let key = record_key(phones, phrase)?;
        let mut map = self.table(kind).write().map_err(|_| Self::poisoned())?;
        Ok(usize::from(map.remove(&key).is_some()))
    }

    fn iter_all(&self, kind: PhraseKind) -> Result<Vec<UserPhraseRecord>> {
        let map = self.table(kind).read().map_err(|_| Self::poisoned())?;
        Ok(map.values().cloned().collect())
    }

    fn lifetime(&self) -> u64 {
        self.lifetime.read().map(|l| *l).unwrap_or(0)
    }

    fn set_lifetime(&self, value: u64) -> Result<()> {
        *self.lifetime.write().map_err(|_| Self::poisoned())? = value;
        Ok(())
    }
}

// ========== Redb backend ==========

const WORD_TABLE: redb::TableDefinition<&[u8], &[u8]> =
    redb::TableDefinition::new("word_phrases");
const ROMANIZED_TABLE: redb::TableDefinition<&[u8], &[u8]> =
    redb::TableDefinition::new("romanized_phrases");
const META_TABLE: redb::TableDefinition<&str, u64> = redb::TableDefinition::new("meta");
const LIFETIME_KEY: &str = "lifetime";

fn table_def(kind: PhraseKind) -> redb::TableDefinition<'static, &'static [u8], &'static [u8]> {
    match kind {
        PhraseKind::Word => WORD_TABLE,
        PhraseKind::Romanized => ROMANIZED_TABLE,
    }
}

fn scan_prefix<T>(table: &T, prefix: &[u8]) -> Result<Vec<UserPhraseRecord>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let mut out = Vec::new();
    for item in table.range(prefix..)? {
        let (k, v) = item?;
        if !k.value().starts_with(prefix) {
            break;
        }
        out.push(bincode::deserialize(v.value())?);
    }
    Ok(out)
}

fn read_one<T>(table: &T, key: &[u8]) -> Result<Option<UserPhraseRecord>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    match table.get(key)? {
        Some(v) => Ok(Some(bincode::deserialize(v.value())?)),
        None => Ok(None),
    }
}

pub struct RedbUserPhrases {
    db: redb::Database,
    txn: Option<redb::WriteTransaction>,
    lifetime: u64,
    path: PathBuf,
}

impl std::fmt::Debug for RedbUserPhrases {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbUserPhrases")
            .field("path", &self.path)
            .field("lifetime", &self.lifetime)
            .field("in_transaction", &self.txn.is_some())
            .finish()
    }
}

impl RedbUserPhrases {
    /// Create or open a store at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = redb::Database::create(path.as_ref())?;
        // make sure every table exists so read transactions never fail on a
        // fresh file
        let txn = db.begin_write()?;
        let lifetime = {
            txn.open_table(WORD_TABLE)?;
            txn.open_table(ROMANIZED_TABLE)?;
            let meta = txn.open_table(META_TABLE)?;
            let value = meta.get(LIFETIME_KEY)?.map(|v| v.value()).unwrap_or(0);
            value
        };
        txn.commit()?;
        debug!(path = %path.as_ref().display(), lifetime, "opened user phrase store");
        Ok(Self {
            db,
            txn: None,
            lifetime,
            path: path.as_ref().to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lookup(&self, kind: PhraseKind, phones: &[Phone]) -> Result<Vec<UserPhraseRecord>> {
        let prefix = seq_prefix(phones)?;
        match &self.txn {
            Some(txn) => scan_prefix(&txn.open_table(table_def(kind))?, &prefix),
            None => {
                let read = self.db.begin_read()?;
                scan_prefix(&read.open_table(table_def(kind))?, &prefix)
            }
        }
    }

    fn get(&self, kind: PhraseKind, phones: &[Phone], phrase: &str) -> Result<Option<UserPhraseRecord>> {
        let key = record_key(phones, phrase)?;
        match &self.txn {
            Some(txn) => read_one(&txn.open_table(table_def(kind))?, &key),
            None => {
                let read = self.db.begin_read()?;
                read_one(&read.open_table(table_def(kind))?, &key)
            }
        }
    }

    /// Run `f` inside the open bracket, or inside a one-shot transaction.
    fn write<R>(&mut self, f: impl FnOnce(&redb::WriteTransaction) -> Result<R>) -> Result<R> {
        match &self.txn {
            Some(txn) => f(txn),
            None => {
                let txn = self.db.begin_write()?;
                let out = f(&txn)?;
                txn.commit()?;
                Ok(out)
            }
        }
    }

    fn put(&mut self, record: &UserPhraseRecord) -> Result<()> {
        let key = record_key(&record.phones, &record.phrase)?;
        let value = bincode::serialize(record)?;
        self.write(|txn| {
            let mut table = txn.open_table(table_def(record.kind))?;
            table.insert(key.as_slice(), value.as_slice())?;
            Ok(())
        })
    }

    fn remove(&mut self, kind: PhraseKind, phones: &[Phone], phrase: &str) -> Result<usize> {
        let key = record_key(phones, phrase)?;
        self.write(|txn| {
            let mut table = txn.open_table(table_def(kind))?;
            let removed = table.remove(key.as_slice())?.is_some();
            Ok(usize::from(removed))
        })
    }

    fn iter_all(&self, kind: PhraseKind) -> Result<Vec<UserPhraseRecord>> {
        let read = self.db.begin_read()?;
        let table = read.open_table(table_def(kind))?;
        let mut out = Vec::new();
        for item in table.iter()? {
            let (_, v) = item?;
            out.push(bincode::deserialize(v.value())?);
        }
        Ok(out)
    }

    fn set_lifetime(&mut self, value: u64) -> Result<()> {
        self.write(|txn| {
            let mut meta = txn.open_table(META_TABLE)?;
            meta.insert(LIFETIME_KEY, value)?;
            Ok(())
        })?;
        self.lifetime = value;
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        if self.txn.is_none() {
            self.txn = Some(self.db.begin_write()?);
        }
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if let Some(txn) = self.txn.take() {
            txn.commit()?;
        }
        Ok(())
    }
}

// ========== Store ==========

#[derive(Debug)]
pub enum UserPhraseBackend {
    InMemory(InMemoryUserPhrases),
    Redb(RedbUserPhrases),
}

/// User phrase store with a lookup cursor.
#[derive(Debug)]
pub struct UserPhraseStore {
    backend: UserPhraseBackend,
    cursor: VecDeque<UserPhraseRecord>,
}

impl UserPhraseStore {
    pub fn new_in_memory() -> Self {
        Self {
            backend: UserPhraseBackend::InMemory(InMemoryUserPhrases::new()),
            cursor: VecDeque::new(),
        }
    }

    /// Open (creating if needed) a redb store file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            backend: UserPhraseBackend::Redb(RedbUserPhrases::new(path)?),
            cursor: VecDeque::new(),
        })
    }

    pub fn backend(&self) -> &UserPhraseBackend {
        &self.backend
    }

    /// All records stored for exactly `phones`.
    pub fn lookup(&self, kind: PhraseKind, phones: &[Phone]) -> Result<Vec<UserPhraseRecord>> {
        match &self.backend {
            UserPhraseBackend::InMemory(m) => m.lookup(kind, phones),
            UserPhraseBackend::Redb(r) => r.lookup(kind, phones),
        }
    }

    /// Like [`lookup`](Self::lookup) but logs and swallows read failures.
    pub fn lookup_or_empty(&self, kind: PhraseKind, phones: &[Phone]) -> Vec<UserPhraseRecord> {
        match self.lookup(kind, phones) {
            Ok(v) => v,
            Err(TaigiError::PhraseTooLong { .. }) => Vec::new(),
            Err(e) => {
                warn!("user phrase lookup failed: {e}");
                Vec::new()
            }
        }
    }

    /// Start iterating the records for `phones`.
    pub fn lookup_first(
        &mut self,
        kind: PhraseKind,
        phones: &[Phone],
    ) -> Result<Option<UserPhraseRecord>> {
        self.cursor = self.lookup(kind, phones)?.into();
        Ok(self.cursor.pop_front())
    }

    /// Next record of the iteration started by [`lookup_first`](Self::lookup_first).
    pub fn lookup_next(&mut self) -> Option<UserPhraseRecord> {
        self.cursor.pop_front()
    }

    pub fn get(
        &self,
        kind: PhraseKind,
        phones: &[Phone],
        phrase: &str,
    ) -> Result<Option<UserPhraseRecord>> {
        match &self.backend {
            UserPhraseBackend::InMemory(m) => m.get(kind, phones, phrase),
            UserPhraseBackend::Redb(r) => r.get(kind, phones, phrase),
        }
    }

    pub(crate) fn put(&mut self, record: &UserPhraseRecord) -> Result<()> {
        match &mut self.backend {
            UserPhraseBackend::InMemory(m) => m.put(record),
            UserPhraseBackend::Redb(r) => r.put(record),
        }
    }

    /// Delete the record for (`phones`, `phrase`); returns how many were removed.
    pub fn remove(&mut self, kind: PhraseKind, phones: &[Phone], phrase: &str) -> Result<usize> {
        match &mut self.backend {
            UserPhraseBackend::InMemory(m) => m.remove(kind, phones, phrase),
            UserPhraseBackend::Redb(r) => r.remove(kind, phones, phrase),
        }
    }

    pub fn iter_all(&self, kind: PhraseKind) -> Result<Vec<UserPhraseRecord>> {
        match &self.backend {
            UserPhraseBackend::InMemory(m) => m.iter_all(kind),
            UserPhraseBackend::Redb(r) => r.iter_all(kind),
        }
    }

    /// Open an update bracket. Writes until [`end`](Self::end) are committed
    /// together.
    pub fn begin(&mut self) -> Result<()> {
        match &mut self.backend {
            UserPhraseBackend::InMemory(_) => Ok(()),
            UserPhraseBackend::Redb(r) => r.begin(),
        }
    }

    pub fn end(&mut self) -> Result<()> {
        match &mut self.backend {
            UserPhraseBackend::InMemory(_) => Ok(()),
            UserPhraseBackend::Redb(r) => r.end(),
        }
    }

    /// Current logical time.
    pub fn lifetime(&self) -> u64 {
        match &self.backend {
            UserPhraseBackend::InMemory(m) => m.lifetime(),
            UserPhraseBackend::Redb(r) => r.lifetime,
        }
    }

    /// Advance logical time by one commit.
    pub fn increase_lifetime(&mut self) -> Result<u64> {
        let next = self.lifetime().saturating_add(1);
        match &mut self.backend {
            UserPhraseBackend::InMemory(m) => m.set_lifetime(next)?,
            UserPhraseBackend::Redb(r) => r.set_lifetime(next)?,
        }
        Ok(next)
    }
}
