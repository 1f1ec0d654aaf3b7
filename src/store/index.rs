use bytes::Bytes;
use dashmap::DashMap;

use super::DataType;

/// Optional key -> owning stores cache in front of the per-store probes.
///
/// Each entry is a bit set of the stores a key was written to. Writers add
/// bits, removing a key from one store clears its bit and deleting it
/// everywhere drops the entry. Expiry and emptied collections never clear
/// bits, so an entry is a superset of the real owners and readers still
/// confirm every candidate with an `exists` call.
#[derive(Default)]
pub struct TypeIndex {
    owners: DashMap<Bytes, u8, ahash::RandomState>,
}

impl TypeIndex {
    pub fn new() -> Self {
        Self {
            owners: DashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    /// Stores that may hold `key`, in `order`. `None` when the key was never
    /// recorded.
    pub fn candidates(&self, key: &[u8], order: &[DataType]) -> Option<Vec<DataType>> {
        let mask = *self.owners.get(key)?;
        Some(order.iter().copied().filter(|t| mask & t.bit() != 0).collect())
    }

    pub fn record(&self, key: Bytes, data_type: DataType) {
        *self.owners.entry(key).or_insert(0) |= data_type.bit();
    }

    /// Replaces the entry with exactly `owners`, as found by a full probe.
    pub fn reset(&self, key: &[u8], owners: &[DataType]) {
        if owners.is_empty() {
            self.owners.remove(key);
            return;
        }
        let mask = owners.iter().fold(0, |m, t| m | t.bit());
        self.owners.insert(Bytes::copy_from_slice(key), mask);
    }

    /// `key` no longer lives in the store for `data_type`.
    pub fn forget_type(&self, key: &[u8], data_type: DataType) {
        self.owners
            .remove_if_mut(key, |_, mask| {
                *mask &= !data_type.bit();
                *mask == 0
            });
    }

    pub fn forget(&self, key: &[u8]) {
        self.owners.remove(key);
    }

    pub fn clear(&self) {
        self.owners.clear();
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
