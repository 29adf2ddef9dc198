// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use serde::{Deserialize, Serialize};

use crate::ids::{BatchId, MachineId};
use crate::transaction::{Transaction, TransactionType};

/// Upper bound on machines in a cluster. Batch ids are producer-local
/// counters scaled by this bound, so uniqueness needs no coordination.
pub const MAX_MACHINES: u64 = 1000;

/// An ordered group of transactions with a cluster-unique id and a
/// home-type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub txn_type: TransactionType,
    pub transactions: Vec<Transaction>,
}

impl Batch {
    pub fn new(txn_type: TransactionType) -> Self {
        Self {
            id: 0,
            txn_type,
            transactions: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Composes a cluster-unique batch id. `producer_counter` must start at 1;
/// counter 0 would collide with raw machine ids.
pub fn compose_batch_id(producer_counter: u64, machine_id: MachineId) -> BatchId {
    producer_counter * MAX_MACHINES + machine_id
}

/// Recovers the producing machine encoded in a batch id.
pub fn producer_machine_of(batch_id: BatchId) -> MachineId {
    batch_id % MAX_MACHINES
}

#[cfg(test)]
mod tests {
    use super::{MAX_MACHINES, compose_batch_id, producer_machine_of};

    #[test]
    fn batch_ids_encode_origin_and_stay_unique_per_producer() {
        let first = compose_batch_id(1, 7);
        let second = compose_batch_id(2, 7);
        assert_eq!(first, MAX_MACHINES + 7);
        assert_ne!(first, second);
        assert_eq!(producer_machine_of(first), 7);
        assert_eq!(producer_machine_of(second), 7);
    }

    #[test]
    fn batch_ids_from_distinct_machines_never_collide() {
        // Same counter, different producers.
        assert_ne!(compose_batch_id(3, 0), compose_batch_id(3, 999));
    }
}
