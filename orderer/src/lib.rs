// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

//! Deterministic transaction ordering layer for a geo-partitioned database.
//!
//! Flow: forwarded multi-home txns -> multi-home orderer (tick-batched,
//! consensus-ordered, replicated) -> sequencer channel; replicated
//! single-home batches + local slot picks -> interleaver -> scheduler
//! channel. Every module is a single-threaded actor on the in-process bus.
pub mod bus;
pub mod config;
pub mod interleaver;
pub mod module;
pub mod multi_home;
pub mod paxos;
pub mod remaster;
pub mod storage;
pub mod ticker;
