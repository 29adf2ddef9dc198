// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::collections::{BTreeMap, HashMap};

use ordering_core::{BatchId, QueueId, SlotId};

/// One origin region's stream of batch ids. Arrivals may be gapped because
/// a later position can land before an earlier one; emission always follows
/// `next_position`.
#[derive(Debug, Default)]
struct BatchQueue {
    next_position: u64,
    buffer: BTreeMap<u64, BatchId>,
}

/// Joins per-origin batch-id arrivals with consensus slot picks and yields
/// `(slot, (batch_id, leader))` in dense ascending slot order. A slot whose
/// queue has not yet produced the next origin position stalls until it
/// does; liveness is the upstream sequencer's responsibility.
#[derive(Debug, Default)]
pub struct LocalLog {
    queues: HashMap<QueueId, BatchQueue>,
    slots: BTreeMap<SlotId, (QueueId, u32)>,
    next_slot: SlotId,
}

impl LocalLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_batch_id(&mut self, queue_id: QueueId, position: u64, batch_id: BatchId) {
        let queue = self.queues.entry(queue_id).or_default();
        assert!(
            position >= queue.next_position && !queue.buffer.contains_key(&position),
            "position {position} delivered twice for queue {queue_id}"
        );
        queue.buffer.insert(position, batch_id);
    }

    pub fn add_slot(&mut self, slot: SlotId, queue_id: QueueId, leader: u32) {
        assert!(
            slot >= self.next_slot && !self.slots.contains_key(&slot),
            "slot {slot} decided twice"
        );
        self.slots.insert(slot, (queue_id, leader));
    }

    pub fn has_next_batch(&self) -> bool {
        let Some((queue_id, _)) = self.slots.get(&self.next_slot) else {
            return false;
        };
        self.queues
            .get(queue_id)
            .is_some_and(|queue| queue.buffer.contains_key(&queue.next_position))
    }

    pub fn next_batch(&mut self) -> (SlotId, (BatchId, u32)) {
        assert!(self.has_next_batch(), "no batch ready at the slot cursor");
        let slot = self.next_slot;
        let (queue_id, leader) = self.slots.remove(&slot).unwrap();
        let queue = self.queues.get_mut(&queue_id).unwrap();
        let batch_id = queue.buffer.remove(&queue.next_position).unwrap();
        queue.next_position += 1;
        self.next_slot += 1;
        (slot, (batch_id, leader))
    }
}
