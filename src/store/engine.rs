use bytes::Bytes;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use super::codec::{self, DumpValue};
use super::{KeyStore, StoreResult};
use crate::pattern::KeyPattern;

/// Page size used by `scan` when the caller passes a non-positive count.
pub const DEFAULT_PAGE_SIZE: usize = 10;

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A value type one of the stores can hold.
pub trait StoredValue: DumpValue + Default + Send + Sync + 'static {
    /// Collections that become empty are removed, like in Redis.
    fn is_empty(&self) -> bool;
}

impl StoredValue for Bytes {
    fn is_empty(&self) -> bool {
        false
    }
}

#[derive(Clone, Debug)]
pub struct Entry<V> {
    pub value: V,
    pub expires_at: Option<u64>, // absolute timestamp in milliseconds
}

impl<V> Entry<V> {
    pub fn new(value: V, ttl_ms: Option<u64>) -> Self {
        let expires_at = ttl_ms.map(|ms| now_ms().saturating_add(ms));
        Self { value, expires_at }
    }

    fn is_expired_at(&self, now: u64) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }
}

/// In-memory engine behind every typed store. Keys are kept ordered so a
/// scan cursor can simply be the last key handed out.
pub struct MemStore<V> {
    entries: RwLock<BTreeMap<Bytes, Entry<V>>>,
}

impl<V: StoredValue> Default for MemStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: StoredValue> MemStore<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<Bytes, Entry<V>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<Bytes, Entry<V>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` on the live value stored under `key`.
    pub(crate) fn view<R>(&self, key: &[u8], f: impl FnOnce(&V) -> R) -> Option<R> {
        let now = now_ms();
        let entries = self.read();
        entries
            .get(key)
            .filter(|e| !e.is_expired_at(now))
            .map(|e| f(&e.value))
    }

    /// Runs `f` on the live value stored under `key`, dropping the key when
    /// the value is left empty. `None` when the key is missing.
    pub(crate) fn update<R>(&self, key: &[u8], f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let now = now_ms();
        let mut entries = self.write();
        if entries.get(key).is_some_and(|e| e.is_expired_at(now)) {
            entries.remove(key);
            return None;
        }
        let entry = entries.get_mut(key)?;
        let out = f(&mut entry.value);
        if entry.value.is_empty() {
            entries.remove(key);
        }
        Some(out)
    }

    /// Like [`MemStore::update`] but creates an empty value first.
    pub(crate) fn upsert<R>(&self, key: Bytes, f: impl FnOnce(&mut V) -> R) -> R {
        let now = now_ms();
        let mut entries = self.write();
        if entries.get(&key).is_some_and(|e| e.is_expired_at(now)) {
            entries.remove(&key);
        }
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(V::default(), None));
        let out = f(&mut entry.value);
        if entry.value.is_empty() {
            entries.remove(&key);
        }
        out
    }

    /// Stores `value` under `key`, replacing whatever was there.
    pub(crate) fn put(&self, key: Bytes, entry: Entry<V>) {
        let mut entries = self.write();
        if entry.value.is_empty() {
            entries.remove(&key);
        } else {
            entries.insert(key, entry);
        }
    }

    pub fn purge_expired(&self) -> usize {
        let now = now_ms();
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired_at(now));
        before - entries.len()
    }

    /// Number of live keys.
    pub fn key_count(&self) -> usize {
        let now = now_ms();
        self.read().values().filter(|e| !e.is_expired_at(now)).count()
    }
}

impl<V: StoredValue> KeyStore for MemStore<V> {
    fn exists(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.view(key, |_| ()).is_some())
    }

    fn ttl(&self, key: &[u8]) -> StoreResult<i64> {
        let ms = self.pttl(key)?;
        Ok(if ms < 0 { ms } else { ms.saturating_add(500) / 1000 })
    }

    fn pttl(&self, key: &[u8]) -> StoreResult<i64> {
        let now = now_ms();
        let entries = self.read();
        let ttl = match entries.get(key) {
            Some(e) if !e.is_expired_at(now) => match e.expires_at {
                Some(at) => (at - now).min(i64::MAX as u64) as i64,
                None => -1,
            },
            _ => -2,
        };
        Ok(ttl)
    }

    fn expire(&self, key: &[u8], seconds: i64) -> StoreResult<i64> {
        let now = now_ms();
        let mut entries = self.write();
        let live = entries.get(key).is_some_and(|e| !e.is_expired_at(now));
        if !live {
            entries.remove(key);
            return Ok(0);
        }
        if seconds <= 0 {
            entries.remove(key);
            return Ok(1);
        }
        if let Some(e) = entries.get_mut(key) {
            e.expires_at = Some(now.saturating_add((seconds as u64).saturating_mul(1000)));
        }
        Ok(1)
    }

    fn persist(&self, key: &[u8]) -> StoreResult<i64> {
        let now = now_ms();
        let mut entries = self.write();
        match entries.get_mut(key) {
            Some(e) if !e.is_expired_at(now) && e.expires_at.is_some() => {
                e.expires_at = None;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn clear(&self, key: &[u8]) -> StoreResult<i64> {
        let now = now_ms();
        let removed = self.write().remove(key);
        Ok(match removed {
            Some(e) if !e.is_expired_at(now) => 1,
            _ => 0,
        })
    }

    fn dump(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        Ok(self.view(key, codec::dump_value))
    }

    fn restore(&self, key: &[u8], ttl_ms: i64, blob: &[u8]) -> StoreResult<()> {
        let value: V = codec::restore_value(blob)?;
        let ttl_ms = (ttl_ms >= 0).then_some(ttl_ms as u64);
        self.put(Bytes::copy_from_slice(key), Entry::new(value, ttl_ms));
        Ok(())
    }

    fn scan(&self, cursor: &[u8], count: i64, pattern: &KeyPattern) -> StoreResult<Vec<Bytes>> {
        let limit = if count <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            count as usize
        };
        if pattern.matches_nothing() {
            return Ok(Vec::new());
        }
        let lower = if cursor.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(cursor)
        };
        let now = now_ms();
        let entries = self.read();
        Ok(entries
            .range::<[u8], _>((lower, Bound::Unbounded))
            .filter(|(k, e)| !e.is_expired_at(now) && pattern.matches(k))
            .map(|(k, _)| k.clone())
            .take(limit)
            .collect())
    }

    fn default_page_size(&self) -> usize {
        DEFAULT_PAGE_SIZE
    }

    fn flush(&self) -> StoreResult<()> {
        self.write().clear();
        Ok(())
    }
}

/// Resolves Redis-style inclusive `start..=stop` indexes (negative counts
/// from the end) against a collection of `len` items.
pub(crate) fn normalize_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    let mut start = if start < 0 { len + start } else { start };
    let mut stop = if stop < 0 { len + stop } else { stop };
    if start < 0 {
        start = 0;
    }
    if stop >= len {
        stop = len - 1;
    }
    if start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ListValue;

    #[test]
    fn scan_walks_keys_after_cursor_in_order() {
        let store: MemStore<Bytes> = MemStore::new();
        for k in ["c", "a", "e", "b", "d"] {
            store.set(Bytes::from(k), Bytes::from("v"), None);
        }
        let all = KeyPattern::all();
        let page = store.scan(b"", 2, &all).unwrap();
        assert_eq!(page, vec![Bytes::from("a"), Bytes::from("b")]);
        let page = store.scan(b"b", 2, &all).unwrap();
        assert_eq!(page, vec![Bytes::from("c"), Bytes::from("d")]);
        let page = store.scan(b"d", 2, &all).unwrap();
        assert_eq!(page, vec![Bytes::from("e")]);
    }

    #[test]
    fn non_positive_count_uses_default_page() {
        let store: MemStore<Bytes> = MemStore::new();
        for i in 0..25 {
            store.set(Bytes::from(format!("k{:02}", i)), Bytes::from("v"), None);
        }
        let page = store.scan(b"", -1, &KeyPattern::all()).unwrap();
        assert_eq!(page.len(), DEFAULT_PAGE_SIZE);
        let page = store.scan(b"", 0, &KeyPattern::all()).unwrap();
        assert_eq!(page.len(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn expired_entries_are_invisible() {
        let store: MemStore<Bytes> = MemStore::new();
        store.put(
            Bytes::from("gone"),
            Entry {
                value: Bytes::from("v"),
                expires_at: Some(1),
            },
        );
        assert!(!store.exists(b"gone").unwrap());
        assert_eq!(store.ttl(b"gone").unwrap(), -2);
        assert!(store.scan(b"", 10, &KeyPattern::all()).unwrap().is_empty());
        assert_eq!(store.purge_expired(), 1);
    }

    #[test]
    fn ttl_rounds_to_nearest_second() {
        let store: MemStore<Bytes> = MemStore::new();
        store.set(Bytes::from("k"), Bytes::from("v"), Some(100));
        assert_eq!(store.ttl(b"k").unwrap(), 100);
        store.set(Bytes::from("p"), Bytes::from("v"), None);
        assert_eq!(store.ttl(b"p").unwrap(), -1);
        assert_eq!(store.ttl(b"missing").unwrap(), -2);
    }

    #[test]
    fn pttl_keeps_sub_second_remainders() {
        let store: MemStore<Bytes> = MemStore::new();
        store.put(Bytes::from("k"), Entry::new(Bytes::from("v"), Some(400)));
        let ms = store.pttl(b"k").unwrap();
        assert!(ms > 0 && ms <= 400, "pttl {}", ms);
        assert_eq!(store.ttl(b"k").unwrap(), 0);
        assert_eq!(store.pttl(b"missing").unwrap(), -2);

        let blob = store.dump(b"k").unwrap().unwrap();
        store.restore(b"copy", ms, &blob).unwrap();
        assert!(store.exists(b"copy").unwrap());
        store.restore(b"forever", i64::MAX, &blob).unwrap();
        assert!(store.ttl(b"forever").unwrap() > 0);
    }

    #[test]
    fn expire_non_positive_deletes() {
        let store: MemStore<Bytes> = MemStore::new();
        store.set(Bytes::from("k"), Bytes::from("v"), None);
        assert_eq!(store.expire(b"k", 0).unwrap(), 1);
        assert!(!store.exists(b"k").unwrap());
        assert_eq!(store.expire(b"k", 10).unwrap(), 0);
    }

    #[test]
    fn emptied_collections_disappear() {
        let store: MemStore<ListValue> = MemStore::new();
        store.push(Bytes::from("l"), &[Bytes::from("x")], false);
        assert!(store.exists(b"l").unwrap());
        store.update(b"l", |list| list.clear());
        assert!(!store.exists(b"l").unwrap());
    }

    #[test]
    fn normalize_range_handles_negatives() {
        assert_eq!(normalize_range(0, -1, 3), Some((0, 2)));
        assert_eq!(normalize_range(-2, -1, 3), Some((1, 2)));
        assert_eq!(normalize_range(1, 100, 3), Some((1, 2)));
        assert_eq!(normalize_range(5, 10, 3), None);
        assert_eq!(normalize_range(2, 1, 3), None);
        assert_eq!(normalize_range(0, -1, 0), None);
    }
}
