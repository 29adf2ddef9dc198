// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::sync::Arc;

use tracing::{debug, warn};

use ordering_core::{Batch, BatchId, Transaction, TransactionEvent, TransactionType, compose_batch_id};

use crate::bus::{
    Envelope, ForwardBatch, GLOBAL_PAXOS_CHANNEL, MULTI_HOME_ORDERER_CHANNEL, Request,
    SEQUENCER_CHANNEL, Sender,
};
use crate::config::ClusterConfig;
use crate::module::Module;

use super::batch_log::BatchLog;
use super::profiling::OrdererMetrics;

/// Accumulates multi-home transactions into an open batch, closes it on
/// each tick, proposes the batch id to global consensus while replicating
/// the payload to every region, and re-emits batches once the slot decision
/// and the data have met in the batch log.
pub struct MultiHomeOrderer {
    config: Arc<ClusterConfig>,
    sender: Sender,
    batch: Batch,
    batch_id_counter: u64,
    batch_log: BatchLog,
    metrics: OrdererMetrics,
}

impl MultiHomeOrderer {
    pub fn new(config: Arc<ClusterConfig>, sender: Sender, metrics: OrdererMetrics) -> Self {
        Self {
            config,
            sender,
            batch: Batch::new(TransactionType::MultiHome),
            batch_id_counter: 0,
            batch_log: BatchLog::new(),
            metrics,
        }
    }

    fn next_batch_id(&mut self) -> BatchId {
        self.batch_id_counter += 1;
        compose_batch_id(self.batch_id_counter, self.config.local_machine_id())
    }

    fn accept_txn(&mut self, mut txn: Transaction) {
        txn.record_event(TransactionEvent::EnterMultiHomeOrderer);
        self.metrics.on_forwarded_txn();
        self.batch.transactions.push(txn);
    }

    fn accept_batch_data(&mut self, mut batch: Batch) {
        for txn in &mut batch.transactions {
            txn.record_event(TransactionEvent::EnterMultiHomeOrdererInBatch);
        }
        self.metrics.on_batch_data();
        self.batch_log.add_batch(batch);
        self.drain_ordered();
    }

    fn accept_batch_order(&mut self, slot: u64, batch_id: BatchId) {
        self.metrics.on_slot();
        self.batch_log.add_slot(slot, batch_id);
        self.drain_ordered();
    }

    fn drain_ordered(&mut self) {
        while self.batch_log.has_next_batch() {
            let (slot, mut batch) = self.batch_log.next_batch();
            // Downstream only needs the slot ordinal, so it replaces the
            // producer-assigned id.
            batch.id = slot;
            for txn in &mut batch.transactions {
                txn.record_event(TransactionEvent::ExitMultiHomeOrdererInBatch);
            }
            self.metrics.on_batch_emitted();
            self.sender.send_local(
                Request::ForwardBatch(ForwardBatch::BatchData {
                    batch: Box::new(batch),
                    same_origin_position: 0,
                }),
                SEQUENCER_CHANNEL,
            );
        }
    }
}

impl Module for MultiHomeOrderer {
    fn name(&self) -> &'static str {
        "multi_home_orderer"
    }

    fn handle(&mut self, envelope: Envelope) {
        match envelope.request {
            Request::ForwardTxn { txn } => self.accept_txn(txn),
            Request::ForwardBatch(ForwardBatch::BatchData { batch, .. }) => {
                self.accept_batch_data(*batch)
            }
            Request::ForwardBatch(ForwardBatch::BatchOrder { slot, batch_id }) => {
                self.accept_batch_order(slot, batch_id)
            }
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

    fn on_tick(&mut self) {
        if self.batch.is_empty() {
            return;
        }

        let batch_id = self.next_batch_id();
        self.batch.id = batch_id;
        debug!(
            batch_id,
            txns = self.batch.transactions.len(),
            "finished multi-home batch; sending out for ordering and replication"
        );

        // Make a proposal for multi-home batch ordering.
        self.sender
            .send_local(Request::PaxosPropose { value: batch_id }, GLOBAL_PAXOS_CHANNEL);

        // Replicate the new batch to the ordering leader partition of every
        // region, our own included.
        let batch = std::mem::replace(&mut self.batch, Batch::new(TransactionType::MultiHome));
        let partition = self.config.leader_partition_for_multi_home_ordering();
        let num_replicas = self.config.num_replicas();
        for replica in 0..num_replicas {
            let machine_id = self.config.make_machine_id(replica, partition);
            self.sender.send(
                Request::ForwardBatch(ForwardBatch::BatchData {
                    batch: Box::new(batch.clone()),
                    same_origin_position: 0,
                }),
                machine_id,
                MULTI_HOME_ORDERER_CHANNEL,
            );
        }
        self.metrics.on_batch_closed(u64::from(num_replicas));
    }

    fn on_loop_end(&mut self) {
        self.metrics.maybe_log_window();
    }
}
