//! Key enumeration across the typed stores.

use bytes::Bytes;

use crate::pattern::KeyPattern;
use crate::store::{DataType, Database, KeyStore, StoreResult};

/// Order in which stores contribute keys to SCAN, KEYS and DBSIZE.
pub const SCAN_ORDER: [DataType; 5] = [
    DataType::Kv,
    DataType::List,
    DataType::Set,
    DataType::ZSet,
    DataType::Hash,
];

pub struct ScanPage {
    pub cursor: Bytes,
    pub keys: Vec<Bytes>,
}

/// One batch from every store, all starting after `cursor`.
///
/// The next cursor is the smallest last key among stores whose batch came
/// back full, since those are the only ones that may have more. Stores that
/// were already exhausted can repeat keys on the next call but nothing is
/// skipped. An empty cursor means every store is done.
pub fn scan_once(db: &Database, cursor: &[u8], count: i64, pattern: &KeyPattern) -> StoreResult<ScanPage> {
    let mut keys = Vec::new();
    let mut next: Option<Bytes> = None;
    for t in SCAN_ORDER {
        let store = db.store(t);
        let batch = store.scan(cursor, count, pattern)?;
        let requested = if count > 0 {
            count as usize
        } else {
            store.default_page_size()
        };
        if batch.len() >= requested {
            if let Some(last) = batch.last() {
                if next.as_ref().is_none_or(|n| last < n) {
                    next = Some(last.clone());
                }
            }
        }
        keys.extend(batch);
    }
    Ok(ScanPage {
        cursor: next.unwrap_or_default(),
        keys,
    })
}

/// Walks one store to the end in pages of `batch` keys.
pub fn for_each_key(
    store: &dyn KeyStore,
    batch: usize,
    pattern: &KeyPattern,
    mut f: impl FnMut(Bytes),
) -> StoreResult<()> {
    let batch = batch.max(1);
    let mut cursor = Bytes::new();
    loop {
        let page = store.scan(&cursor, batch as i64, pattern)?;
        let full = page.len() >= batch;
        let last = page.last().cloned();
        page.into_iter().for_each(&mut f);
        match last {
            Some(last) if full => cursor = last,
            _ => return Ok(()),
        }
    }
}

pub fn collect_keys(db: &Database, batch: usize, pattern: &KeyPattern) -> StoreResult<Vec<Bytes>> {
    let mut keys = Vec::new();
    for t in SCAN_ORDER {
        for_each_key(db.store(t), batch, pattern, |k| keys.push(k))?;
    }
    Ok(keys)
}

/// Number of keys summed over every store; a key present in two stores is
/// counted twice.
pub fn count_keys(db: &Database, batch: usize) -> StoreResult<usize> {
    let all = KeyPattern::all();
    let mut total = 0;
    for t in SCAN_ORDER {
        for_each_key(db.store(t), batch, &all, |_| total += 1)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn cursor_is_smallest_last_key_of_full_batches() {
        let db = Database::new(0, false);
        for k in ["a", "b", "c", "d"] {
            db.kv.set(b(k), b("v"), None);
        }
        db.list.push(b("m"), &[b("x")], false);
        db.hash.hset(b("b2"), &[(b("f"), b("v"))]);
        db.hash.hset(b("b3"), &[(b("f"), b("v"))]);

        let all = KeyPattern::all();
        let page = scan_once(&db, b"", 2, &all).unwrap();
        assert_eq!(page.cursor, b("b"));
        assert_eq!(page.keys, vec![b("a"), b("b"), b("m"), b("b2"), b("b3")]);
    }

    #[test]
    fn paging_to_the_end_sees_every_key() {
        let db = Database::new(0, false);
        for i in 0..7 {
            db.kv.set(b(&format!("k{}", i)), b("v"), None);
            db.set.sadd(b(&format!("s{}", i)), &[b("m")]);
        }
        db.zset.zadd(b("z"), &[(1.0, b("m"))]);

        let all = KeyPattern::all();
        let mut seen = std::collections::BTreeSet::new();
        let mut cursor = Bytes::new();
        let mut calls = 0;
        loop {
            let page = scan_once(&db, &cursor, 3, &all).unwrap();
            seen.extend(page.keys);
            calls += 1;
            if page.cursor.is_empty() {
                break;
            }
            cursor = page.cursor;
            assert!(calls < 20);
        }
        assert_eq!(seen.len(), 15);
    }

    #[test]
    fn exhaustive_walk_crosses_batches() {
        let db = Database::new(0, false);
        for i in 0..10 {
            db.kv.set(b(&format!("k{:02}", i)), b("v"), None);
        }
        db.list.push(b("k00"), &[b("x")], false);
        let keys = collect_keys(&db, 3, &KeyPattern::all()).unwrap();
        assert_eq!(keys.len(), 11);
        assert_eq!(keys[0], b("k00"));
        assert_eq!(keys[10], b("k00"));
        assert_eq!(count_keys(&db, 4).unwrap(), 11);
        assert_eq!(count_keys(&db, 10).unwrap(), 11);
    }
}
