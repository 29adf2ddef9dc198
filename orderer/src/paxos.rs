// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

//! Consensus stand-ins.
//!
//! These modules model the provided consensus interface only: proposals get
//! dense slots in arrival order at a fixed leader, decisions are broadcast
//! to the interested machines. No election and no recovery; a real consensus
//! implementation plugs in behind the same channels.

use std::sync::Arc;

use tracing::warn;

use crate::bus::{
    Envelope, ForwardBatch, GLOBAL_PAXOS_CHANNEL, LOCAL_LOG_CHANNEL, LOCAL_PAXOS_CHANNEL,
    MULTI_HOME_ORDERER_CHANNEL, Request, Sender,
};
use crate::config::ClusterConfig;
use crate::module::Module;

use ordering_core::{MachineId, SlotId};

/// Orders multi-home batch ids. Non-leader instances forward proposals to
/// the leader; the leader assigns the next slot and broadcasts the decision
/// to the ordering leader partition of every region.
pub struct GlobalPaxosStub {
    config: Arc<ClusterConfig>,
    sender: Sender,
    leader: MachineId,
    next_slot: SlotId,
}

impl GlobalPaxosStub {
    pub fn new(config: Arc<ClusterConfig>, sender: Sender) -> Self {
        let leader =
            config.make_machine_id(0, config.leader_partition_for_multi_home_ordering());
        Self {
            config,
            sender,
            leader,
            next_slot: 0,
        }
    }
}

impl Module for GlobalPaxosStub {
    fn name(&self) -> &'static str {
        "global_paxos"
    }

    fn handle(&mut self, envelope: Envelope) {
        match envelope.request {
            Request::PaxosPropose { value } => {
                if self.config.local_machine_id() != self.leader {
                    self.sender.send(
                        Request::PaxosPropose { value },
                        self.leader,
                        GLOBAL_PAXOS_CHANNEL,
                    );
                    return;
                }
                let slot = self.next_slot;
                self.next_slot += 1;
                let partition = self.config.leader_partition_for_multi_home_ordering();
                for replica in 0..self.config.num_replicas() {
                    let machine_id = self.config.make_machine_id(replica, partition);
                    self.sender.send(
                        Request::ForwardBatch(ForwardBatch::BatchOrder {
                            slot,
                            batch_id: value,
                        }),
                        machine_id,
                        MULTI_HOME_ORDERER_CHANNEL,
                    );
                }
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
}

/// Orders single-home queue picks within one region. Proposal values carry
/// the origin queue id; decisions go to every machine of the region.
pub struct LocalPaxosStub {
    config: Arc<ClusterConfig>,
    sender: Sender,
    leader: MachineId,
    next_slot: SlotId,
}

impl LocalPaxosStub {
    pub fn new(config: Arc<ClusterConfig>, sender: Sender) -> Self {
        let leader = config.make_machine_id(config.local_region(), 0);
        Self {
            config,
            sender,
            leader,
            next_slot: 0,
        }
    }
}

impl Module for LocalPaxosStub {
    fn name(&self) -> &'static str {
        "local_paxos"
    }

    fn handle(&mut self, envelope: Envelope) {
        match envelope.request {
            Request::PaxosPropose { value } => {
                if self.config.local_machine_id() != self.leader {
                    self.sender.send(
                        Request::PaxosPropose { value },
                        self.leader,
                        LOCAL_PAXOS_CHANNEL,
                    );
                    return;
                }
                let slot = self.next_slot;
                self.next_slot += 1;
                let region = self.config.local_region();
                for partition in 0..self.config.num_partitions() {
                    let machine_id = self.config.make_machine_id(region, partition);
                    self.sender.send(
                        Request::ForwardBatch(ForwardBatch::LocalBatchOrder {
                            slot,
                            queue_id: value as u32,
                            leader: region,
                        }),
                        machine_id,
                        LOCAL_LOG_CHANNEL,
                    );
                }
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
}
