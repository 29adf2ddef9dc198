// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

mod interleaver;
mod local_log;

pub use interleaver::Interleaver;
pub use local_log::LocalLog;
