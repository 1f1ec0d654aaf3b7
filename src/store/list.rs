use bytes::Bytes;
use std::collections::VecDeque;

use super::engine::{StoredValue, normalize_range};
use super::{MemStore, StoreError, StoreResult};

pub type ListValue = VecDeque<Bytes>;

impl StoredValue for ListValue {
    fn is_empty(&self) -> bool {
        VecDeque::is_empty(self)
    }
}

impl MemStore<ListValue> {
    /// LPUSH/RPUSH. Returns the new length.
    pub fn push(&self, key: Bytes, values: &[Bytes], front: bool) -> usize {
        self.upsert(key, |list| {
            for v in values {
                if front {
                    list.push_front(v.clone());
                } else {
                    list.push_back(v.clone());
                }
            }
            list.len()
        })
    }

    pub fn range(&self, key: &[u8], start: i64, stop: i64) -> Vec<Bytes> {
        self.view(key, |list| match normalize_range(start, stop, list.len()) {
            Some((s, e)) => list.range(s..=e).cloned().collect(),
            None => Vec::new(),
        })
        .unwrap_or_default()
    }

    pub fn llen(&self, key: &[u8]) -> usize {
        self.view(key, |list| list.len()).unwrap_or(0)
    }

    pub fn set_index(&self, key: &[u8], index: i64, value: Bytes) -> StoreResult<()> {
        self.update(key, |list| {
            let len = list.len() as i64;
            let idx = if index < 0 { len + index } else { index };
            if idx < 0 || idx >= len {
                return Err(StoreError::IndexOutOfRange);
            }
            list[idx as usize] = value;
            Ok(())
        })
        .unwrap_or(Err(StoreError::NoSuchKey))
    }

    /// Removes every element equal to `value`, keeping the order of the rest.
    pub fn remove_all(&self, key: &[u8], value: &[u8]) -> usize {
        self.update(key, |list| {
            let before = list.len();
            list.retain(|v| v.as_ref() != value);
            before - list.len()
        })
        .unwrap_or(0)
    }
}
