// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use orderer::bus::{
    Broker, Directory, ForwardBatch, GLOBAL_PAXOS_CHANNEL, INTERLEAVER_CHANNEL,
    LOCAL_LOG_CHANNEL, LOCAL_PAXOS_CHANNEL, MULTI_HOME_ORDERER_CHANNEL, Request,
    SCHEDULER_CHANNEL, SEQUENCER_CHANNEL, Sender,
};
use orderer::config::{ClusterConfig, PartitionStrategy};
use orderer::interleaver::Interleaver;
use orderer::module::{ModuleError, ModuleRunner, ModuleRunnerConfig, ModuleStop};
use orderer::multi_home::{MultiHomeOrderer, OrdererMetrics};
use orderer::paxos::{GlobalPaxosStub, LocalPaxosStub};
use orderer::ticker::Ticker;

const DEFAULT_NUM_REPLICAS: u32 = 2;
const DEFAULT_NUM_PARTITIONS: u32 = 1;
const DEFAULT_LEADER_PARTITION: u32 = 0;
const DEFAULT_PARTITION_STRATEGY: &str = "hash";
const DEFAULT_BATCH_TICK: Duration = Duration::from_millis(5);
const DEFAULT_MAX_ENVELOPES_PER_CHUNK: usize = 64;
const DEFAULT_IDLE_POLL_INTERVAL: Duration = Duration::from_millis(2);
const DEFAULT_METRICS_LOG_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let runner_config = ModuleRunnerConfig {
        max_envelopes_per_chunk: config.max_envelopes_per_chunk,
        idle_poll_interval: config.idle_poll_interval,
    };

    // The whole topology runs in one process: the network transport is an
    // external collaborator, and every machine here talks over the bus.
    let directory = Directory::new();
    let num_machines = u64::from(config.num_replicas) * u64::from(config.num_partitions);

    let mut brokers = Vec::new();
    let mut cluster_configs = Vec::new();
    for machine_id in 0..num_machines {
        let cluster_config = Arc::new(ClusterConfig::new(
            config.num_replicas,
            config.num_partitions,
            machine_id,
            config.leader_partition,
            None,
            config.partition_strategy,
        )?);
        let broker = Broker::new(machine_id);
        directory.register(&broker);
        brokers.push(broker);
        cluster_configs.push(cluster_config);
    }

    let mut ticker = Ticker::new(config.batch_tick);
    let mut stops: Vec<ModuleStop> = Vec::new();
    let mut handles: Vec<tokio::task::JoinHandle<ModuleError>> = Vec::new();

    for machine_id in 0..num_machines {
        let broker = &brokers[machine_id as usize];
        let cluster_config = &cluster_configs[machine_id as usize];

        let interleaver_rx = broker.bind(INTERLEAVER_CHANNEL);
        broker.bind_alias(LOCAL_LOG_CHANNEL, INTERLEAVER_CHANNEL);
        let (handle, stop) = ModuleRunner::new(
            Interleaver::new(cluster_config.clone(), Sender::new(broker, directory.clone())),
            interleaver_rx,
            runner_config,
        )
        .spawn();
        handles.push(handle);
        stops.push(stop);

        let local_paxos_rx = broker.bind(LOCAL_PAXOS_CHANNEL);
        let (handle, stop) = ModuleRunner::new(
            LocalPaxosStub::new(cluster_config.clone(), Sender::new(broker, directory.clone())),
            local_paxos_rx,
            runner_config,
        )
        .spawn();
        handles.push(handle);
        stops.push(stop);

        let global_paxos_rx = broker.bind(GLOBAL_PAXOS_CHANNEL);
        let (handle, stop) = ModuleRunner::new(
            GlobalPaxosStub::new(cluster_config.clone(), Sender::new(broker, directory.clone())),
            global_paxos_rx,
            runner_config,
        )
        .spawn();
        handles.push(handle);
        stops.push(stop);

        if cluster_config.local_partition() == config.leader_partition {
            let orderer_rx = broker.bind(MULTI_HOME_ORDERER_CHANNEL);
            let orderer = MultiHomeOrderer::new(
                cluster_config.clone(),
                Sender::new(broker, directory.clone()),
                OrdererMetrics::new(config.metrics_enabled, config.metrics_log_interval),
            );
            let (handle, stop) = ModuleRunner::new(orderer, orderer_rx, runner_config)
                .with_ticks(ticker.subscribe())
                .spawn();
            handles.push(handle);
            stops.push(stop);
        }

        spawn_drain(machine_id, "sequencer", broker.bind(SEQUENCER_CHANNEL));
        spawn_drain(machine_id, "scheduler", broker.bind(SCHEDULER_CHANNEL));
    }

    let (_ticker_handle, ticker_stop) = ticker.spawn();
    info!(
        replicas = config.num_replicas,
        partitions = config.num_partitions,
        "ordering layer running; ctrl-c to stop"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    ticker_stop.request_shutdown();
    for stop in &stops {
        stop.request_shutdown();
    }
    for handle in handles {
        match handle.await {
            Ok(ModuleError::ShutdownRequested) => {}
            Ok(err) => warn!(%err, "module exited during shutdown"),
            Err(join_err) => warn!(%join_err, "module join error during shutdown"),
        }
    }

    Ok(())
}

fn spawn_drain(
    machine_id: u64,
    name: &'static str,
    mut rx: tokio::sync::mpsc::UnboundedReceiver<orderer::bus::Envelope>,
) {
    tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            match envelope.request {
                Request::ForwardTxn { txn } => {
                    debug!(machine_id, channel = name, txn_id = txn.id, "ordered txn");
                }
                Request::ForwardBatch(ForwardBatch::BatchData { batch, .. }) => {
                    debug!(
                        machine_id,
                        channel = name,
                        slot = batch.id,
                        txns = batch.transactions.len(),
                        "ordered multi-home batch"
                    );
                }
                other => {
                    warn!(machine_id, channel = name, ?other, "unexpected downstream request");
                }
            }
        }
    });
}

struct Config {
    num_replicas: u32,
    num_partitions: u32,
    leader_partition: u32,
    partition_strategy: PartitionStrategy,
    batch_tick: Duration,
    max_envelopes_per_chunk: usize,
    idle_poll_interval: Duration,
    metrics_enabled: bool,
    metrics_log_interval: Duration,
}

impl Config {
    fn from_env() -> Self {
        Self {
            num_replicas: env_u32("ORD_NUM_REPLICAS", DEFAULT_NUM_REPLICAS).max(1),
            num_partitions: env_u32("ORD_NUM_PARTITIONS", DEFAULT_NUM_PARTITIONS).max(1),
            leader_partition: env_u32("ORD_LEADER_PARTITION", DEFAULT_LEADER_PARTITION),
            partition_strategy: parse_partition_strategy(&env_string(
                "ORD_PARTITION_STRATEGY",
                DEFAULT_PARTITION_STRATEGY,
            )),
            batch_tick: Duration::from_millis(
                env_u64("ORD_BATCH_TICK_MS", DEFAULT_BATCH_TICK.as_millis() as u64).max(1),
            ),
            max_envelopes_per_chunk: env_usize(
                "ORD_MAX_ENVELOPES_PER_CHUNK",
                DEFAULT_MAX_ENVELOPES_PER_CHUNK,
            )
            .max(1),
            idle_poll_interval: Duration::from_millis(
                env_u64(
                    "ORD_IDLE_POLL_INTERVAL_MS",
                    DEFAULT_IDLE_POLL_INTERVAL.as_millis() as u64,
                )
                .max(1),
            ),
            metrics_enabled: env_bool("ORD_METRICS_ENABLED", false),
            metrics_log_interval: Duration::from_millis(
                env_u64(
                    "ORD_METRICS_LOG_INTERVAL_MS",
                    DEFAULT_METRICS_LOG_INTERVAL.as_millis() as u64,
                )
                .max(1),
            ),
        }
    }
}

fn parse_partition_strategy(value: &str) -> PartitionStrategy {
    match value {
        "simple" => PartitionStrategy::Simple,
        "hash" => PartitionStrategy::Hash,
        other => {
            warn!(strategy = other, "unknown partition strategy; using hash");
            PartitionStrategy::Hash
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
