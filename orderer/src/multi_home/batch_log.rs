// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::collections::{BTreeMap, HashMap};

use ordering_core::{Batch, BatchId, SlotId};

/// Joins replicated batch payloads with consensus slot decisions and yields
/// `(slot, batch)` pairs in dense ascending slot order. A slot decision naming a batch whose data has not arrived yet
/// simply waits; duplicate slots or batch ids are logic errors.
#[derive(Debug, Default)]
pub struct BatchLog {
    batches: HashMap<BatchId, Batch>,
    slots: BTreeMap<SlotId, BatchId>,
    next_slot: SlotId,
}

impl BatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_batch(&mut self, batch: Batch) {
        let previous = self.batches.insert(batch.id, batch);
        assert!(
            previous.is_none(),
            "batch data delivered twice for batch id"
        );
    }

    pub fn add_slot(&mut self, slot: SlotId, batch_id: BatchId) {
        assert!(
            slot >= self.next_slot && !self.slots.contains_key(&slot),
            "slot {slot} decided twice"
        );
        self.slots.insert(slot, batch_id);
    }

    pub fn has_next_batch(&self) -> bool {
        self.slots
            .get(&self.next_slot)
            .is_some_and(|batch_id| self.batches.contains_key(batch_id))
    }

    pub fn next_batch(&mut self) -> (SlotId, Batch) {
        assert!(self.has_next_batch(), "no batch ready at the slot cursor");
        let slot = self.next_slot;
        let batch_id = self.slots.remove(&slot).unwrap();
        let batch = self.batches.remove(&batch_id).unwrap();
        self.next_slot += 1;
        (slot, batch)
    }
}

#[cfg(test)]
mod tests {
    use super::BatchLog;
    use ordering_core::{Batch, Transaction, TransactionType};

    fn batch(id: u64, txn_ids: &[u64]) -> Batch {
        let mut batch = Batch::new(TransactionType::MultiHome);
        batch.id = id;
        for txn_id in txn_ids {
            batch
                .transactions
                .push(Transaction::new(*txn_id, TransactionType::MultiHome));
        }
        batch
    }

    #[test]
    fn data_before_slot() {
        let mut log = BatchLog::new();
        log.add_batch(batch(100, &[1, 2]));
        assert!(!log.has_next_batch());

        log.add_slot(0, 100);
        let (slot, emitted) = log.next_batch();
        assert_eq!(slot, 0);
        assert_eq!(emitted.id, 100);
        assert_eq!(emitted.transactions.len(), 2);
        assert!(!log.has_next_batch());
    }

    #[test]
    fn slot_before_data() {
        let mut log = BatchLog::new();
        log.add_slot(0, 100);
        assert!(!log.has_next_batch());

        log.add_batch(batch(100, &[1, 2]));
        let (slot, emitted) = log.next_batch();
        assert_eq!(slot, 0);
        assert_eq!(emitted.id, 100);
    }

    #[test]
    fn emission_follows_slot_order_not_arrival_order() {
        let mut log = BatchLog::new();
        log.add_batch(batch(200, &[3]));
        log.add_batch(batch(100, &[1]));
        log.add_slot(1, 100);
        assert!(!log.has_next_batch());

        log.add_slot(0, 200);
        assert_eq!(log.next_batch().1.id, 200);
        assert_eq!(log.next_batch().1.id, 100);
        assert!(!log.has_next_batch());
    }

    #[test]
    fn slot_for_unknown_batch_waits_for_data() {
        let mut log = BatchLog::new();
        log.add_slot(0, 999);
        assert!(!log.has_next_batch());
        log.add_batch(batch(999, &[]));
        assert!(log.has_next_batch());
    }

    #[test]
    #[should_panic(expected = "batch data delivered twice")]
    fn duplicate_batch_id_fails_fast() {
        let mut log = BatchLog::new();
        log.add_batch(batch(100, &[]));
        log.add_batch(batch(100, &[]));
    }

    #[test]
    #[should_panic(expected = "decided twice")]
    fn duplicate_slot_fails_fast() {
        let mut log = BatchLog::new();
        log.add_slot(0, 100);
        log.add_slot(0, 200);
    }
}
