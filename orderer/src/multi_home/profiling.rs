// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug)]
pub struct OrdererMetrics {
    enabled: bool,
    log_interval: Duration,
    window_started_at: Instant,
    forwarded_txns: u64,
    batches_closed: u64,
    replication_sends: u64,
    batch_data_received: u64,
    slots_received: u64,
    batches_emitted: u64,
}

impl OrdererMetrics {
    pub fn new(enabled: bool, log_interval: Duration) -> Self {
        Self {
            enabled,
            log_interval,
            window_started_at: Instant::now(),
            forwarded_txns: 0,
            batches_closed: 0,
            replication_sends: 0,
            batch_data_received: 0,
            slots_received: 0,
            batches_emitted: 0,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, Duration::MAX)
    }

    pub(super) fn on_forwarded_txn(&mut self) {
        if !self.enabled {
            return;
        }
        self.forwarded_txns = self.forwarded_txns.saturating_add(1);
    }

    pub(super) fn on_batch_closed(&mut self, replication_fanout: u64) {
        if !self.enabled {
            return;
        }
        self.batches_closed = self.batches_closed.saturating_add(1);
        self.replication_sends = self.replication_sends.saturating_add(replication_fanout);
    }

    pub(super) fn on_batch_data(&mut self) {
        if !self.enabled {
            return;
        }
        self.batch_data_received = self.batch_data_received.saturating_add(1);
    }

    pub(super) fn on_slot(&mut self) {
        if !self.enabled {
            return;
        }
        self.slots_received = self.slots_received.saturating_add(1);
    }

    pub(super) fn on_batch_emitted(&mut self) {
        if !self.enabled {
            return;
        }
        self.batches_emitted = self.batches_emitted.saturating_add(1);
    }

    pub(super) fn maybe_log_window(&mut self) {
        if !self.enabled {
            return;
        }
        let elapsed = self.window_started_at.elapsed();
        if elapsed < self.log_interval {
            return;
        }
        info!(
            window_ms = elapsed.as_millis() as u64,
            forwarded_txns = self.forwarded_txns,
            batches_closed = self.batches_closed,
            replication_sends = self.replication_sends,
            batch_data_received = self.batch_data_received,
            slots_received = self.slots_received,
            batches_emitted = self.batches_emitted,
            "multi-home orderer metrics"
        );
        self.reset_window();
    }

    fn reset_window(&mut self) {
        self.window_started_at = Instant::now();
        self.forwarded_txns = 0;
        self.batches_closed = 0;
        self.replication_sends = 0;
        self.batch_data_received = 0;
        self.slots_received = 0;
        self.batches_emitted = 0;
    }
}
