// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

//! Cluster-wide identifier aliases.

/// Flat machine identifier, composed from (replica, partition).
pub type MachineId = u64;

/// A geographic replica of the whole database.
pub type RegionId = u32;

/// A data partition within a region.
pub type PartitionId = u32;

/// Cluster-unique batch identifier. Encodes the producing machine.
pub type BatchId = u64;

/// Position in a totally ordered consensus log.
pub type SlotId = u64;

/// Identifies a per-origin-region batch queue feeding the interleaver.
pub type QueueId = u32;

/// Internal transaction identifier.
pub type TxnId = u64;

/// Storage key.
pub type Key = String;
