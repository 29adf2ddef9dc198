// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

mod common;

use common::{TestCluster, make_batch};
use orderer::bus::{
    ForwardBatch, INTERLEAVER_CHANNEL, LOCAL_LOG_CHANNEL, Request, SCHEDULER_CHANNEL,
};
use ordering_core::TransactionType;

const NUM_REPLICAS: u32 = 2;
const NUM_PARTITIONS: u32 = 2;

fn interleaver_cluster() -> TestCluster {
    let mut cluster = TestCluster::new(NUM_REPLICAS, NUM_PARTITIONS);
    for machine_id in 0..cluster.num_machines() {
        cluster.add_interleaver(machine_id);
        cluster.add_output_channel(machine_id, SCHEDULER_CHANNEL);
    }
    cluster
}

fn batch_data(batch: &ordering_core::Batch, same_origin_position: u64) -> Request {
    Request::ForwardBatch(ForwardBatch::BatchData {
        batch: Box::new(batch.clone()),
        same_origin_position,
    })
}

fn local_batch_order(slot: u64, queue_id: u32, leader: u32) -> Request {
    Request::ForwardBatch(ForwardBatch::LocalBatchOrder {
        slot,
        queue_id,
        leader,
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn batch_data_before_batch_order() {
    let mut cluster = interleaver_cluster();
    let batch = make_batch(100, TransactionType::SingleHome, &[1, 2]);

    // Replicate batch data to all machines.
    let mut sender = cluster.new_sender(0);
    for machine_id in 0..cluster.num_machines() {
        sender.send(batch_data(&batch, 0), machine_id, INTERLEAVER_CHANNEL);
    }

    // Then send the local ordering to every machine.
    for machine_id in 0..cluster.num_machines() {
        sender.send(local_batch_order(0, 0, 0), machine_id, LOCAL_LOG_CHANNEL);
    }

    for machine_id in 0..cluster.num_machines() {
        let txn1 = cluster.recv_txn(machine_id, SCHEDULER_CHANNEL).await;
        let txn2 = cluster.recv_txn(machine_id, SCHEDULER_CHANNEL).await;
        assert_eq!(txn1.id, 1);
        assert_eq!(txn2.id, 2);
    }

    cluster.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn batch_order_before_batch_data() {
    let mut cluster = interleaver_cluster();
    let batch = make_batch(100, TransactionType::SingleHome, &[1, 2]);

    // The ordering arrives first; nothing can be emitted yet.
    let mut sender = cluster.new_sender(0);
    for machine_id in 0..cluster.num_machines() {
        sender.send(local_batch_order(0, 0, 0), machine_id, LOCAL_LOG_CHANNEL);
    }

    for machine_id in 0..cluster.num_machines() {
        sender.send(batch_data(&batch, 0), machine_id, INTERLEAVER_CHANNEL);
    }

    for machine_id in 0..cluster.num_machines() {
        let txn1 = cluster.recv_txn(machine_id, SCHEDULER_CHANNEL).await;
        let txn2 = cluster.recv_txn(machine_id, SCHEDULER_CHANNEL).await;
        assert_eq!(txn1.id, 1);
        assert_eq!(txn2.id, 2);
    }

    cluster.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_region_interleave() {
    let mut cluster = interleaver_cluster();
    let region1_machine = cluster.config(0).make_machine_id(1, 0);

    let batch_from_region0 = make_batch(100, TransactionType::SingleHome, &[1]);
    let batch_from_region1 = make_batch(200, TransactionType::SingleHome, &[2]);

    let mut sender_region0 = cluster.new_sender(0);
    let mut sender_region1 = cluster.new_sender(region1_machine);
    for machine_id in 0..cluster.num_machines() {
        sender_region0.send(
            batch_data(&batch_from_region0, 0),
            machine_id,
            INTERLEAVER_CHANNEL,
        );
        sender_region1.send(
            batch_data(&batch_from_region1, 0),
            machine_id,
            INTERLEAVER_CHANNEL,
        );
    }

    // Consensus picks region 1 first, then region 0.
    for machine_id in 0..cluster.num_machines() {
        sender_region0.send(local_batch_order(0, 1, 0), machine_id, LOCAL_LOG_CHANNEL);
        sender_region0.send(local_batch_order(1, 0, 1), machine_id, LOCAL_LOG_CHANNEL);
    }

    for machine_id in 0..cluster.num_machines() {
        let first = cluster.recv_txn(machine_id, SCHEDULER_CHANNEL).await;
        let second = cluster.recv_txn(machine_id, SCHEDULER_CHANNEL).await;
        assert_eq!(first.id, 2, "slot 0 belongs to region 1's batch");
        assert_eq!(second.id, 1, "slot 1 belongs to region 0's batch");
    }

    cluster.shutdown();
}
