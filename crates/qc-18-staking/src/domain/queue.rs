//! Time-ordered maturity queue
//!
//! Keys are bucketed by completion time (unix seconds). Draining returns
//! every key whose time has passed in non-decreasing time order, insertion
//! order within a bucket, each key at most once. The ordering depends only
//! on the inserted data, never on storage iteration order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaturityQueue<K: Ord> {
    buckets: BTreeMap<u64, Vec<K>>,
}

impl<K: Ord> Default for MaturityQueue<K> {
    fn default() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone> MaturityQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `key` at `time`. A key already in that bucket is not duplicated.
    pub fn insert(&mut self, time: u64, key: K) {
        let bucket = self.buckets.entry(time).or_default();
        if !bucket.contains(&key) {
            bucket.push(key);
        }
    }

    /// Unschedule `key` from `time`.
    pub fn remove(&mut self, time: u64, key: &K) {
        if let Some(bucket) = self.buckets.get_mut(&time) {
            bucket.retain(|k| k != key);
            if bucket.is_empty() {
                self.buckets.remove(&time);
            }
        }
    }

    /// Remove and return every key scheduled at or before `now`.
    pub fn drain_mature(&mut self, now: u64) -> Vec<K> {
        let later = match now.checked_add(1) {
            Some(next) => self.buckets.split_off(&next),
            None => BTreeMap::new(),
        };
        let mature = std::mem::replace(&mut self.buckets, later);

        let mut seen = BTreeSet::new();
        let mut keys = Vec::new();
        for (_, bucket) in mature {
            for key in bucket {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    #[cfg(test)]
    fn contains(&self, time: u64, key: &K) -> bool {
        self.buckets
            .get(&time)
            .map(|bucket| bucket.contains(key))
            .unwrap_or(false)
    }
}
