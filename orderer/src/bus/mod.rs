// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

//! In-process message bus.
//!
//! Every machine owns a [`Broker`] mapping well-known channel numbers to
//! module inboxes; a cluster [`Directory`] resolves machine ids to brokers.
//! [`Sender`] stamps outbound envelopes with the local machine id and drops
//! sends to machines that are gone. Envelopes are moved, never re-encoded:
//! the serde derives define the wire format for an out-of-process transport.

mod broker;
mod sender;

use serde::{Deserialize, Serialize};

use ordering_core::{Batch, BatchId, MachineId, QueueId, SlotId, Transaction};

pub use broker::{Broker, Directory};
pub use sender::Sender;

pub type Channel = u64;

pub const SEQUENCER_CHANNEL: Channel = 1;
pub const INTERLEAVER_CHANNEL: Channel = 2;
pub const LOCAL_LOG_CHANNEL: Channel = 3;
pub const SCHEDULER_CHANNEL: Channel = 4;
pub const MULTI_HOME_ORDERER_CHANNEL: Channel = 5;
pub const GLOBAL_PAXOS_CHANNEL: Channel = 6;
pub const LOCAL_PAXOS_CHANNEL: Channel = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: MachineId,
    pub request: Request,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    ForwardTxn {
        txn: Transaction,
    },
    ForwardBatch(ForwardBatch),
    PaxosPropose {
        value: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForwardBatch {
    /// Replicated batch payload. `same_origin_position` is the gap-free
    /// per-origin sequence number; multi-home replication leaves it at 0.
    BatchData {
        batch: Box<Batch>,
        same_origin_position: u64,
    },
    /// Global consensus decision: which batch occupies a slot.
    BatchOrder { slot: SlotId, batch_id: BatchId },
    /// Regional consensus decision: which origin queue occupies a slot.
    LocalBatchOrder {
        slot: SlotId,
        queue_id: QueueId,
        leader: u32,
    },
}
