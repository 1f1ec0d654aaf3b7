use bytes::Bytes;
use std::collections::HashSet;

use super::MemStore;
use super::engine::StoredValue;

pub type SetValue = HashSet<Bytes>;

impl StoredValue for SetValue {
    fn is_empty(&self) -> bool {
        HashSet::is_empty(self)
    }
}

impl MemStore<SetValue> {
    pub fn sadd(&self, key: Bytes, members: &[Bytes]) -> usize {
        self.upsert(key, |set| members.iter().filter(|m| set.insert((*m).clone())).count())
    }

    pub fn srem(&self, key: &[u8], members: &[Bytes]) -> usize {
        self.update(key, |set| members.iter().filter(|m| set.remove(*m)).count())
            .unwrap_or(0)
    }

    /// Members in byte order.
    pub fn smembers(&self, key: &[u8]) -> Vec<Bytes> {
        let mut members: Vec<Bytes> = self
            .view(key, |set| set.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    pub fn scard(&self, key: &[u8]) -> usize {
        self.view(key, |set| set.len()).unwrap_or(0)
    }

    pub fn sismember(&self, key: &[u8], member: &[u8]) -> bool {
        self.view(key, |set| set.contains(member)).unwrap_or(false)
    }
}
