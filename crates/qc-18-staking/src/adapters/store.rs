//! State store adapter

use crate::ports::{StateStore, StoreError};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// In-memory snapshot store keyed by committed height
#[derive(Default)]
pub struct InMemoryStateStore {
    snapshots: RwLock<BTreeMap<u64, Vec<u8>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.read().len()
    }
}

impl StateStore for InMemoryStateStore {
    fn save(&self, height: u64, snapshot: Vec<u8>) -> Result<(), StoreError> {
        self.snapshots.write().insert(height, snapshot);
        Ok(())
    }

    fn load(&self, height: u64) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.snapshots.read().get(&height).cloned())
    }

    fn latest_height(&self) -> Result<Option<u64>, StoreError> {
        Ok(self.snapshots.read().keys().next_back().copied())
    }
}
