// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

//! In-process cluster harness for integration tests: real brokers, real
//! module runners, test-controlled ticks.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use orderer::bus::{
    Broker, Channel, Directory, Envelope, ForwardBatch, GLOBAL_PAXOS_CHANNEL,
    INTERLEAVER_CHANNEL, LOCAL_LOG_CHANNEL, MULTI_HOME_ORDERER_CHANNEL, Request, Sender,
};
use orderer::config::{ClusterConfig, PartitionStrategy};
use orderer::interleaver::Interleaver;
use orderer::module::{ModuleRunner, ModuleRunnerConfig, ModuleStop};
use orderer::multi_home::{MultiHomeOrderer, OrdererMetrics};
use orderer::paxos::GlobalPaxosStub;
use ordering_core::{Batch, MachineId, Transaction, TransactionType};

pub struct TestCluster {
    directory: Arc<Directory>,
    brokers: Vec<Arc<Broker>>,
    configs: Vec<Arc<ClusterConfig>>,
    stops: Vec<ModuleStop>,
    outputs: HashMap<(MachineId, Channel), mpsc::UnboundedReceiver<Envelope>>,
}

impl TestCluster {
    pub fn new(num_replicas: u32, num_partitions: u32) -> Self {
        let directory = Directory::new();
        let num_machines = u64::from(num_replicas) * u64::from(num_partitions);
        let mut brokers = Vec::new();
        let mut configs = Vec::new();
        for machine_id in 0..num_machines {
            let config = ClusterConfig::new(
                num_replicas,
                num_partitions,
                machine_id,
                0,
                None,
                PartitionStrategy::Hash,
            )
            .expect("valid test topology");
            let broker = Broker::new(machine_id);
            directory.register(&broker);
            brokers.push(broker);
            configs.push(Arc::new(config));
        }
        Self {
            directory,
            brokers,
            configs,
            stops: Vec::new(),
            outputs: HashMap::new(),
        }
    }

    pub fn num_machines(&self) -> u64 {
        self.brokers.len() as u64
    }

    pub fn config(&self, machine_id: MachineId) -> Arc<ClusterConfig> {
        self.configs[machine_id as usize].clone()
    }

    pub fn add_interleaver(&mut self, machine_id: MachineId) {
        let broker = &self.brokers[machine_id as usize];
        let rx = broker.bind(INTERLEAVER_CHANNEL);
        broker.bind_alias(LOCAL_LOG_CHANNEL, INTERLEAVER_CHANNEL);
        let module = Interleaver::new(
            self.configs[machine_id as usize].clone(),
            Sender::new(broker, self.directory.clone()),
        );
        let (_handle, stop) =
            ModuleRunner::new(module, rx, ModuleRunnerConfig::default()).spawn();
        self.stops.push(stop);
    }

    /// Returns the tick sender so tests fire batch closure deterministically.
    pub fn add_multi_home_orderer(&mut self, machine_id: MachineId) -> mpsc::UnboundedSender<()> {
        let broker = &self.brokers[machine_id as usize];
        let rx = broker.bind(MULTI_HOME_ORDERER_CHANNEL);
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let module = MultiHomeOrderer::new(
            self.configs[machine_id as usize].clone(),
            Sender::new(broker, self.directory.clone()),
            OrdererMetrics::disabled(),
        );
        let (_handle, stop) = ModuleRunner::new(module, rx, ModuleRunnerConfig::default())
            .with_ticks(tick_rx)
            .spawn();
        self.stops.push(stop);
        tick_tx
    }

    pub fn add_global_paxos(&mut self, machine_id: MachineId) {
        let broker = &self.brokers[machine_id as usize];
        let rx = broker.bind(GLOBAL_PAXOS_CHANNEL);
        let module = GlobalPaxosStub::new(
            self.configs[machine_id as usize].clone(),
            Sender::new(broker, self.directory.clone()),
        );
        let (_handle, stop) =
            ModuleRunner::new(module, rx, ModuleRunnerConfig::default()).spawn();
        self.stops.push(stop);
    }

    pub fn add_output_channel(&mut self, machine_id: MachineId, channel: Channel) {
        let rx = self.brokers[machine_id as usize].bind(channel);
        self.outputs.insert((machine_id, channel), rx);
    }

    pub fn new_sender(&self, machine_id: MachineId) -> Sender {
        Sender::new(&self.brokers[machine_id as usize], self.directory.clone())
    }

    pub async fn recv_envelope(
        &mut self,
        machine_id: MachineId,
        channel: Channel,
    ) -> Option<Envelope> {
        let rx = self
            .outputs
            .get_mut(&(machine_id, channel))
            .expect("output channel not bound");
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .ok()
            .flatten()
    }

    pub async fn recv_txn(&mut self, machine_id: MachineId, channel: Channel) -> Transaction {
        let envelope = self
            .recv_envelope(machine_id, channel)
            .await
            .expect("timed out waiting for forwarded txn");
        match envelope.request {
            Request::ForwardTxn { txn } => txn,
            other => panic!("expected forwarded txn, got {other:?}"),
        }
    }

    pub async fn recv_batch(&mut self, machine_id: MachineId, channel: Channel) -> Batch {
        let envelope = self
            .recv_envelope(machine_id, channel)
            .await
            .expect("timed out waiting for forwarded batch");
        match envelope.request {
            Request::ForwardBatch(ForwardBatch::BatchData { batch, .. }) => *batch,
            other => panic!("expected forwarded batch data, got {other:?}"),
        }
    }

    pub async fn expect_silence(&mut self, machine_id: MachineId, channel: Channel) {
        let rx = self
            .outputs
            .get_mut(&(machine_id, channel))
            .expect("output channel not bound");
        let outcome = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
        assert!(outcome.is_err(), "expected no traffic, got {outcome:?}");
    }

    pub fn shutdown(&self) {
        for stop in &self.stops {
            stop.request_shutdown();
        }
    }
}

pub fn make_txn(id: u64, txn_type: TransactionType) -> Transaction {
    Transaction::new(id, txn_type)
}

pub fn make_batch(id: u64, txn_type: TransactionType, txn_ids: &[u64]) -> Batch {
    let mut batch = Batch::new(txn_type);
    batch.id = id;
    for txn_id in txn_ids {
        batch.transactions.push(make_txn(*txn_id, txn_type));
    }
    batch
}

/// The runners poll every couple of milliseconds; this is long enough for
/// previously sent envelopes to have been drained.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
