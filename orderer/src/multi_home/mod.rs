// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

mod batch_log;
mod orderer;
mod profiling;

pub use batch_log::BatchLog;
pub use orderer::MultiHomeOrderer;
pub use profiling::OrdererMetrics;
