use bytes::Bytes;

use super::{Entry, MemStore};

impl MemStore<Bytes> {
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.view(key, Bytes::clone)
    }

    /// Overwrites `key`, dropping any previous expiry.
    pub fn set(&self, key: Bytes, value: Bytes, ttl_secs: Option<u64>) {
        let ttl_ms = ttl_secs.map(|s| s.saturating_mul(1000));
        self.put(key, Entry::new(value, ttl_ms));
    }
}
