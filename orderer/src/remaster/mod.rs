// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

mod manager;

pub use manager::{RemasterManager, RemasterResult, VerifyMasterResult};
