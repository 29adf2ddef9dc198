// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::ids::{Key, RegionId, TxnId};

/// Home classification. Single-home transactions touch keys mastered in one
/// region only; multi-home transactions span at least two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    SingleHome,
    MultiHome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpType {
    Read,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOperation {
    pub key: Key,
    pub op: OpType,
}

/// Master metadata a transaction declares for a key: the region it believes
/// is authoritative and the remaster counter it observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterMetadata {
    pub master: RegionId,
    pub counter: u32,
}

/// Milestones a transaction passes on its way through the ordering layer.
/// Observational only; the ordering machinery never reads these back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionEvent {
    EnterMultiHomeOrderer,
    EnterMultiHomeOrdererInBatch,
    ExitMultiHomeOrdererInBatch,
    EnterInterleaver,
    ExitInterleaver,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxnId,
    pub txn_type: TransactionType,
    pub ops: Vec<KeyOperation>,
    /// Declared (master, counter) per accessed key.
    pub metadata: HashMap<Key, MasterMetadata>,
    /// Opaque payload; carried through the ordering layer untouched.
    pub payload: Vec<u8>,
    /// Event trace: (milestone, unix millis).
    pub events: Vec<(TransactionEvent, u64)>,
}

impl Transaction {
    pub fn new(id: TxnId, txn_type: TransactionType) -> Self {
        Self {
            id,
            txn_type,
            ops: Vec::new(),
            metadata: HashMap::new(),
            payload: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn record_event(&mut self, event: TransactionEvent) {
        self.events.push((event, unix_millis_now()));
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.ops.iter().map(|op| &op.key)
    }
}

fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
