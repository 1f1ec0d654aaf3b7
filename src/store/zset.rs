use bytes::Bytes;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use super::MemStore;
use super::engine::{StoredValue, normalize_range};

/// `f64` ordered with `total_cmp`, so it can key a `BTreeSet`.
#[derive(Clone, Copy, Debug)]
pub struct TotalOrderF64(pub f64);

impl PartialEq for TotalOrderF64 {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TotalOrderF64 {}

impl PartialOrd for TotalOrderF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TotalOrderF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Members ordered by score, ties broken by member bytes.
#[derive(Clone, Debug, Default)]
pub struct SortedSet {
    members: HashMap<Bytes, f64>,
    scores: BTreeSet<(TotalOrderF64, Bytes)>,
}

impl SortedSet {
    /// Returns true when `member` was not present before.
    pub fn insert(&mut self, member: Bytes, score: f64) -> bool {
        let old = self.members.insert(member.clone(), score);
        if let Some(old) = old {
            self.scores.remove(&(TotalOrderF64(old), member.clone()));
        }
        self.scores.insert((TotalOrderF64(score), member));
        old.is_none()
    }

    pub fn remove(&mut self, member: &[u8]) -> bool {
        match self.members.remove_entry(member) {
            Some((member, score)) => {
                self.scores.remove(&(TotalOrderF64(score), member));
                true
            }
            None => false,
        }
    }

    pub fn score(&self, member: &[u8]) -> Option<f64> {
        self.members.get(member).copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in ascending score order.
    pub fn iter(&self) -> impl Iterator<Item = (&Bytes, f64)> {
        self.scores.iter().map(|(s, m)| (m, s.0))
    }
}

impl StoredValue for SortedSet {
    fn is_empty(&self) -> bool {
        SortedSet::is_empty(self)
    }
}

impl MemStore<SortedSet> {
    pub fn zadd(&self, key: Bytes, pairs: &[(f64, Bytes)]) -> usize {
        self.upsert(key, |zset| {
            let mut added = 0;
            for (score, member) in pairs {
                if zset.insert(member.clone(), *score) {
                    added += 1;
                }
            }
            added
        })
    }

    pub fn zrem(&self, key: &[u8], members: &[Bytes]) -> usize {
        self.update(key, |zset| members.iter().filter(|m| zset.remove(m)).count())
            .unwrap_or(0)
    }

    /// Rank range, inclusive, ascending by score.
    pub fn zrange(&self, key: &[u8], start: i64, stop: i64) -> Vec<(Bytes, f64)> {
        self.view(key, |zset| match normalize_range(start, stop, zset.len()) {
            Some((s, e)) => zset
                .iter()
                .skip(s)
                .take(e - s + 1)
                .map(|(m, score)| (m.clone(), score))
                .collect(),
            None => Vec::new(),
        })
        .unwrap_or_default()
    }

    pub fn zscore(&self, key: &[u8], member: &[u8]) -> Option<f64> {
        self.view(key, |zset| zset.score(member)).flatten()
    }

    pub fn zcard(&self, key: &[u8]) -> usize {
        self.view(key, |zset| zset.len()).unwrap_or(0)
    }
}
