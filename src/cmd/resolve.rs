//! Finding which typed store owns a key.

use crate::store::{DataType, Database, StoreResult};

/// Priority used when a key has to be attributed to a single store.
pub const PROBE_ORDER: [DataType; 5] = [
    DataType::List,
    DataType::Set,
    DataType::ZSet,
    DataType::Hash,
    DataType::Kv,
];

fn probe(db: &Database, key: &[u8], order: &[DataType], first_only: bool) -> StoreResult<Vec<DataType>> {
    let mut found = Vec::new();
    for &t in order {
        if db.store(t).exists(key)? {
            found.push(t);
            if first_only {
                break;
            }
        }
    }
    Ok(found)
}

/// Probes every store and refreshes the type index with the result.
fn full_probe(db: &Database, key: &[u8]) -> StoreResult<Vec<DataType>> {
    let found = probe(db, key, &PROBE_ORDER, false)?;
    if let Some(index) = db.type_index() {
        index.reset(key, &found);
    }
    Ok(found)
}

/// The first store in [`PROBE_ORDER`] holding `key`.
pub fn resolve(db: &Database, key: &[u8]) -> StoreResult<Option<DataType>> {
    let Some(index) = db.type_index() else {
        return Ok(probe(db, key, &PROBE_ORDER, true)?.first().copied());
    };
    if let Some(cached) = index.candidates(key, &PROBE_ORDER) {
        if let Some(&t) = probe(db, key, &cached, true)?.first() {
            return Ok(Some(t));
        }
    }
    Ok(full_probe(db, key)?.first().copied())
}

/// Every store holding `key`, in [`PROBE_ORDER`].
pub fn owners(db: &Database, key: &[u8]) -> StoreResult<Vec<DataType>> {
    let Some(index) = db.type_index() else {
        return probe(db, key, &PROBE_ORDER, false);
    };
    if let Some(cached) = index.candidates(key, &PROBE_ORDER) {
        let found = probe(db, key, &cached, false)?;
        if !found.is_empty() {
            return Ok(found);
        }
    }
    full_probe(db, key)
}
