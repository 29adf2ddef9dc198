// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

//! Domain model for the deterministic ordering layer.
//!
//! Transactions and batches travel between regions as plain data; the
//! ordering machinery in the `orderer` crate never inspects payloads, only
//! ids, home-type tags and per-key master metadata.
pub mod batch;
pub mod ids;
pub mod record;
pub mod transaction;

pub use batch::{Batch, MAX_MACHINES, compose_batch_id, producer_machine_of};
pub use ids::{BatchId, Key, MachineId, PartitionId, QueueId, RegionId, SlotId, TxnId};
pub use record::Record;
pub use transaction::{
    KeyOperation, MasterMetadata, OpType, Transaction, TransactionEvent, TransactionType,
};
