// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use thiserror::Error;

use ordering_core::{Key, MAX_MACHINES, MachineId, PartitionId, RegionId};

/// How keys map to partitions within a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionStrategy {
    /// Stable hash of the whole key.
    Hash,
    /// Trailing decimal digits of the key, modulo the partition count.
    /// Keys without a numeric suffix land on partition 0.
    Simple,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cluster needs at least one replica")]
    ZeroReplicas,
    #[error("cluster needs at least one partition")]
    ZeroPartitions,
    #[error("local machine id {machine_id} out of range for {num_machines} machines")]
    MachineOutOfRange {
        machine_id: MachineId,
        num_machines: u64,
    },
    #[error("cluster of {num_machines} machines exceeds the {max}-machine bound")]
    TooManyMachines { num_machines: u64, max: u64 },
    #[error("multi-home ordering leader partition {partition} out of range")]
    LeaderPartitionOutOfRange { partition: PartitionId },
    #[error("distance ranking must list {expected} regions, got {got}")]
    DistanceRankingShape { expected: usize, got: usize },
}

/// Immutable cluster topology, shared via `Arc` after construction.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    num_replicas: u32,
    num_partitions: u32,
    local_machine_id: MachineId,
    mh_orderer_leader_partition: PartitionId,
    /// Per region: the other regions, nearest first.
    distance_ranking: Vec<Vec<RegionId>>,
    partition_strategy: PartitionStrategy,
}

impl ClusterConfig {
    pub fn new(
        num_replicas: u32,
        num_partitions: u32,
        local_machine_id: MachineId,
        mh_orderer_leader_partition: PartitionId,
        distance_ranking: Option<Vec<Vec<RegionId>>>,
        partition_strategy: PartitionStrategy,
    ) -> Result<Self, ConfigError> {
        if num_replicas == 0 {
            return Err(ConfigError::ZeroReplicas);
        }
        if num_partitions == 0 {
            return Err(ConfigError::ZeroPartitions);
        }
        let num_machines = u64::from(num_replicas) * u64::from(num_partitions);
        // Batch-id uniqueness scales producer counters by the machine
        // bound; a larger cluster would overlap producers' id spaces.
        if num_machines > MAX_MACHINES {
            return Err(ConfigError::TooManyMachines {
                num_machines,
                max: MAX_MACHINES,
            });
        }
        if local_machine_id >= num_machines {
            return Err(ConfigError::MachineOutOfRange {
                machine_id: local_machine_id,
                num_machines,
            });
        }
        if mh_orderer_leader_partition >= num_partitions {
            return Err(ConfigError::LeaderPartitionOutOfRange {
                partition: mh_orderer_leader_partition,
            });
        }
        let distance_ranking = match distance_ranking {
            Some(ranking) => {
                if ranking.len() != num_replicas as usize {
                    return Err(ConfigError::DistanceRankingShape {
                        expected: num_replicas as usize,
                        got: ranking.len(),
                    });
                }
                ranking
            }
            None => default_distance_ranking(num_replicas),
        };

        Ok(Self {
            num_replicas,
            num_partitions,
            local_machine_id,
            mh_orderer_leader_partition,
            distance_ranking,
            partition_strategy,
        })
    }

    pub fn num_replicas(&self) -> u32 {
        self.num_replicas
    }

    pub fn num_partitions(&self) -> u32 {
        self.num_partitions
    }

    pub fn num_machines(&self) -> u64 {
        u64::from(self.num_replicas) * u64::from(self.num_partitions)
    }

    pub fn local_machine_id(&self) -> MachineId {
        self.local_machine_id
    }

    pub fn local_region(&self) -> RegionId {
        self.region_of(self.local_machine_id)
    }

    pub fn local_partition(&self) -> PartitionId {
        self.partition_of(self.local_machine_id)
    }

    pub fn make_machine_id(&self, replica: RegionId, partition: PartitionId) -> MachineId {
        u64::from(replica) * u64::from(self.num_partitions) + u64::from(partition)
    }

    pub fn region_of(&self, machine_id: MachineId) -> RegionId {
        (machine_id / u64::from(self.num_partitions)) as RegionId
    }

    pub fn partition_of(&self, machine_id: MachineId) -> PartitionId {
        (machine_id % u64::from(self.num_partitions)) as PartitionId
    }

    pub fn leader_partition_for_multi_home_ordering(&self) -> PartitionId {
        self.mh_orderer_leader_partition
    }

    /// The other regions as seen from `region`, nearest first.
    pub fn nearest_replicas(&self, region: RegionId) -> &[RegionId] {
        &self.distance_ranking[region as usize]
    }

    pub fn partition_of_key(&self, key: &Key) -> PartitionId {
        match self.partition_strategy {
            PartitionStrategy::Hash => {
                let mut hasher = DefaultHasher::new();
                key.hash(&mut hasher);
                (hasher.finish() % u64::from(self.num_partitions)) as PartitionId
            }
            PartitionStrategy::Simple => {
                let digits: String = key
                    .chars()
                    .rev()
                    .take_while(|c| c.is_ascii_digit())
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect();
                let suffix: u64 = digits.parse().unwrap_or(0);
                (suffix % u64::from(self.num_partitions)) as PartitionId
            }
        }
    }
}

fn default_distance_ranking(num_replicas: u32) -> Vec<Vec<RegionId>> {
    (0..num_replicas)
        .map(|region| (0..num_replicas).filter(|other| *other != region).collect())
        .collect()
}
