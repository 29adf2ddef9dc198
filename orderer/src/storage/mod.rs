// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::collections::HashMap;

use parking_lot::RwLock;

use ordering_core::{Key, Record};

/// Committed key-value state. The remaster manager reads it to compare
/// declared master metadata against what is committed; writes come from the
/// execution engine, which lives outside this crate.
pub trait Storage: Send + Sync {
    fn read(&self, key: &Key) -> Option<Record>;

    fn write(&self, key: Key, record: Record);
}

/// In-memory storage backend.
#[derive(Default)]
pub struct MemStorage {
    records: RwLock<HashMap<Key, Record>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemStorage {
    fn read(&self, key: &Key) -> Option<Record> {
        self.records.read().get(key).cloned()
    }

    fn write(&self, key: Key, record: Record) {
        self.records.write().insert(key, record);
    }
}
