use bytes::Bytes;
use std::collections::HashMap;

use super::MemStore;
use super::engine::StoredValue;

pub type HashValue = HashMap<Bytes, Bytes>;

impl StoredValue for HashValue {
    fn is_empty(&self) -> bool {
        HashMap::is_empty(self)
    }
}

impl MemStore<HashValue> {
    /// Returns how many fields were newly created.
    pub fn hset(&self, key: Bytes, pairs: &[(Bytes, Bytes)]) -> usize {
        self.upsert(key, |hash| {
            pairs
                .iter()
                .filter(|(f, v)| hash.insert(f.clone(), v.clone()).is_none())
                .count()
        })
    }

    pub fn hget(&self, key: &[u8], field: &[u8]) -> Option<Bytes> {
        self.view(key, |hash| hash.get(field).cloned()).flatten()
    }

    /// All pairs, ordered by field.
    pub fn hgetall(&self, key: &[u8]) -> Vec<(Bytes, Bytes)> {
        let mut pairs: Vec<(Bytes, Bytes)> = self
            .view(key, |hash| {
                hash.iter().map(|(f, v)| (f.clone(), v.clone())).collect()
            })
            .unwrap_or_default();
        pairs.sort();
        pairs
    }

    pub fn hdel(&self, key: &[u8], fields: &[Bytes]) -> usize {
        self.update(key, |hash| {
            fields.iter().filter(|f| hash.remove(*f).is_some()).count()
        })
        .unwrap_or(0)
    }

    pub fn hexists(&self, key: &[u8], field: &[u8]) -> bool {
        self.view(key, |hash| hash.contains_key(field)).unwrap_or(false)
    }

    pub fn hlen(&self, key: &[u8]) -> usize {
        self.view(key, |hash| hash.len()).unwrap_or(0)
    }
}
