// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use serde::{Deserialize, Serialize};

use crate::ids::RegionId;

/// A committed storage record: the value plus the master metadata the
/// remaster manager validates transactions against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub value: Vec<u8>,
    pub master: RegionId,
    pub counter: u32,
}

impl Record {
    pub fn new(value: impl Into<Vec<u8>>, master: RegionId, counter: u32) -> Self {
        Self {
            value: value.into(),
            master,
            counter,
        }
    }
}
