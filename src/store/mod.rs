//! Typed sub-stores.
//!
//! A database is five independent stores (string, list, hash, set, sorted
//! set) addressed by the same key bytes. There is no shared type tag: which
//! store owns a key is discovered by asking each of them. The command layer
//! only relies on the [`KeyStore`] contract, every call of which is atomic for
//! a single key and nothing more.

mod codec;
mod engine;
mod hash;
mod index;
mod list;
mod set;
mod string;
mod zset;

use bytes::Bytes;
use thiserror::Error;

use crate::pattern::KeyPattern;

pub use engine::{Entry, MemStore};
pub use hash::HashValue;
pub use index::TypeIndex;
pub use list::ListValue;
pub use set::SetValue;
pub use zset::SortedSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Kv,
    List,
    Hash,
    Set,
    ZSet,
}

impl DataType {
    /// Name reported by `TYPE`.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Kv => "string",
            DataType::List => "list",
            DataType::Hash => "hash",
            DataType::Set => "set",
            DataType::ZSet => "zset",
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(DataType::Kv),
            1 => Some(DataType::List),
            2 => Some(DataType::Set),
            3 => Some(DataType::ZSet),
            4 => Some(DataType::Hash),
            _ => None,
        }
    }

    pub(crate) fn bit(self) -> u8 {
        1 << self.tag()
    }

    /// Tag written at the head of a dump blob.
    pub(crate) fn tag(self) -> u8 {
        match self {
            DataType::Kv => 0,
            DataType::List => 1,
            DataType::Set => 2,
            DataType::ZSet => 3,
            DataType::Hash => 4,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("DUMP payload version or checksum are wrong")]
    BadPayload,
    #[error("Bad data format")]
    Corrupt,
    #[error("DUMP payload holds a different type than the target store")]
    TypeMismatch,
    #[error("no such key")]
    NoSuchKey,
    #[error("index out of range")]
    IndexOutOfRange,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Operations every typed store offers regardless of what it holds.
pub trait KeyStore: Send + Sync {
    fn exists(&self, key: &[u8]) -> StoreResult<bool>;

    /// Remaining seconds, `-1` without expiry, `-2` when the key is missing.
    fn ttl(&self, key: &[u8]) -> StoreResult<i64>;

    /// Like [`KeyStore::ttl`] in milliseconds. A live key never reports 0.
    fn pttl(&self, key: &[u8]) -> StoreResult<i64>;

    /// `1` when the key exists and the TTL was applied, `0` otherwise.
    /// Non-positive seconds delete the key.
    fn expire(&self, key: &[u8], seconds: i64) -> StoreResult<i64>;

    /// `1` when an expiry was removed.
    fn persist(&self, key: &[u8]) -> StoreResult<i64>;

    /// Number of keys removed (0 or 1).
    fn clear(&self, key: &[u8]) -> StoreResult<i64>;

    fn dump(&self, key: &[u8]) -> StoreResult<Option<Bytes>>;

    /// Recreates `key` from a dump blob, replacing any current value.
    /// `ttl_ms` is relative; a negative value means no expiry.
    fn restore(&self, key: &[u8], ttl_ms: i64, blob: &[u8]) -> StoreResult<()>;

    /// Keys strictly greater than `cursor` (empty cursor: from the start),
    /// ascending, accepted by `pattern`, at most `count` of them. A
    /// non-positive `count` means [`KeyStore::default_page_size`].
    fn scan(&self, cursor: &[u8], count: i64, pattern: &KeyPattern) -> StoreResult<Vec<Bytes>>;

    fn default_page_size(&self) -> usize;

    fn flush(&self) -> StoreResult<()>;
}

/// One numbered logical database.
pub struct Database {
    index: usize,
    pub kv: MemStore<Bytes>,
    pub list: MemStore<ListValue>,
    pub hash: MemStore<HashValue>,
    pub set: MemStore<SetValue>,
    pub zset: MemStore<SortedSet>,
    type_index: Option<TypeIndex>,
}

impl Database {
    pub fn new(index: usize, with_type_index: bool) -> Self {
        Self {
            index,
            kv: MemStore::new(),
            list: MemStore::new(),
            hash: MemStore::new(),
            set: MemStore::new(),
            zset: MemStore::new(),
            type_index: with_type_index.then(TypeIndex::new),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn store(&self, data_type: DataType) -> &dyn KeyStore {
        match data_type {
            DataType::Kv => &self.kv,
            DataType::List => &self.list,
            DataType::Hash => &self.hash,
            DataType::Set => &self.set,
            DataType::ZSet => &self.zset,
        }
    }

    pub fn type_index(&self) -> Option<&TypeIndex> {
        self.type_index.as_ref()
    }

    /// Notes that `key` was written in the store for `data_type`.
    pub fn record_type(&self, key: &Bytes, data_type: DataType) {
        if let Some(index) = &self.type_index {
            index.record(key.clone(), data_type);
        }
    }

    /// Notes that `key` left the store for `data_type`.
    pub fn forget_type(&self, key: &[u8], data_type: DataType) {
        if let Some(index) = &self.type_index {
            index.forget_type(key, data_type);
        }
    }

    /// Notes that `key` is gone from every store.
    pub fn forget_key(&self, key: &[u8]) {
        if let Some(index) = &self.type_index {
            index.forget(key);
        }
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.kv.flush()?;
        self.list.flush()?;
        self.hash.flush()?;
        self.set.flush()?;
        self.zset.flush()?;
        if let Some(index) = &self.type_index {
            index.clear();
        }
        Ok(())
    }

    /// Drops expired entries from every store, returning how many went away.
    pub fn purge_expired(&self) -> usize {
        self.kv.purge_expired()
            + self.list.purge_expired()
            + self.hash.purge_expired()
            + self.set.purge_expired()
            + self.zset.purge_expired()
    }
}
