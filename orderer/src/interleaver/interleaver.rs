// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use ordering_core::{Batch, BatchId, MachineId, TransactionEvent};

use crate::bus::{Envelope, ForwardBatch, Request, SCHEDULER_CHANNEL, Sender};
use crate::config::ClusterConfig;
use crate::module::Module;

use super::local_log::LocalLog;

/// Deployment wrapper around [`LocalLog`]. Receives replicated single-home
/// batch data on the interleaver channel and local slot picks on the
/// local-log channel, then forwards each emitted batch's transactions to
/// the scheduler in batch order.
pub struct Interleaver {
    config: Arc<ClusterConfig>,
    sender: Sender,
    local_log: LocalLog,
    batch_bodies: HashMap<BatchId, Batch>,
}

impl Interleaver {
    pub fn new(config: Arc<ClusterConfig>, sender: Sender) -> Self {
        Self {
            config,
            sender,
            local_log: LocalLog::new(),
            batch_bodies: HashMap::new(),
        }
    }

    fn accept_batch_data(&mut self, from: MachineId, mut batch: Batch, same_origin_position: u64) {
        // The origin queue is the sending machine's region.
        let queue_id = self.config.region_of(from);
        for txn in &mut batch.transactions {
            txn.record_event(TransactionEvent::EnterInterleaver);
        }
        self.local_log
            .add_batch_id(queue_id, same_origin_position, batch.id);
        self.batch_bodies.insert(batch.id, batch);
        self.drain_ordered();
    }

    fn accept_local_batch_order(&mut self, slot: u64, queue_id: u32, leader: u32) {
        self.local_log.add_slot(slot, queue_id, leader);
        self.drain_ordered();
    }

    fn drain_ordered(&mut self) {
        while self.local_log.has_next_batch() {
            let (slot, (batch_id, leader)) = self.local_log.next_batch();
            let batch = self
                .batch_bodies
                .remove(&batch_id)
                .expect("emitted batch id has no stored body");
            debug!(slot, batch_id, leader, "emitting interleaved batch");
            for mut txn in batch.transactions {
                txn.record_event(TransactionEvent::ExitInterleaver);
                self.sender
                    .send_local(Request::ForwardTxn { txn }, SCHEDULER_CHANNEL);
            }
        }
    }
}

impl Module for Interleaver {
    fn name(&self) -> &'static str {
        "interleaver"
    }

    fn handle(&mut self, envelope: Envelope) {
        match envelope.request {
            Request::ForwardBatch(ForwardBatch::BatchData {
                batch,
                same_origin_position,
            }) => self.accept_batch_data(envelope.from, *batch, same_origin_position),
            Request::ForwardBatch(ForwardBatch::LocalBatchOrder {
                slot,
                queue_id,
                leader,
            }) => self.accept_local_batch_order(slot, queue_id, leader),
            other => {
                warn!(
                    module = self.name(),
                    from = envelope.from,
                    ?other,
                    "unexpected request type received"
                );
            }
        }
    }
}
