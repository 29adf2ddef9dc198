// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::trace;

use ordering_core::MachineId;

use super::{Channel, Envelope};

/// Per-machine channel registry. Modules bind their inbox under a
/// well-known channel number before the cluster starts moving envelopes;
/// deliveries to unbound or closed channels are dropped.
pub struct Broker {
    local_machine_id: MachineId,
    channels: RwLock<HashMap<Channel, mpsc::UnboundedSender<Envelope>>>,
}

impl Broker {
    pub fn new(local_machine_id: MachineId) -> Arc<Self> {
        Arc::new(Self {
            local_machine_id,
            channels: RwLock::new(HashMap::new()),
        })
    }

    pub fn local_machine_id(&self) -> MachineId {
        self.local_machine_id
    }

    /// Creates the inbox queue for `channel` and returns its receiving end.
    pub fn bind(&self, channel: Channel) -> mpsc::UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        let previous = self.channels.write().insert(channel, tx);
        assert!(
            previous.is_none(),
            "channel {channel} bound twice on machine {}",
            self.local_machine_id
        );
        rx
    }

    /// Routes `channel` into the inbox already bound under `to`. Used by
    /// modules that listen on more than one channel.
    pub fn bind_alias(&self, channel: Channel, to: Channel) {
        let mut channels = self.channels.write();
        let target = channels
            .get(&to)
            .unwrap_or_else(|| panic!("alias target channel {to} is not bound"))
            .clone();
        let previous = channels.insert(channel, target);
        assert!(
            previous.is_none(),
            "channel {channel} bound twice on machine {}",
            self.local_machine_id
        );
    }

    pub(super) fn deliver(&self, channel: Channel, envelope: Envelope) {
        let Some(tx) = self.channels.read().get(&channel).cloned() else {
            trace!(
                machine = self.local_machine_id,
                channel, "dropping envelope for unbound channel"
            );
            return;
        };
        if tx.send(envelope).is_err() {
            trace!(
                machine = self.local_machine_id,
                channel, "dropping envelope for closed channel"
            );
        }
    }
}

/// Cluster-wide machine directory. Holds brokers weakly so a torn-down
/// machine simply becomes unresolvable instead of lingering.
#[derive(Default)]
pub struct Directory {
    machines: RwLock<HashMap<MachineId, Weak<Broker>>>,
}

impl Directory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, broker: &Arc<Broker>) {
        self.machines
            .write()
            .insert(broker.local_machine_id(), Arc::downgrade(broker));
    }

    pub fn resolve(&self, machine_id: MachineId) -> Option<Arc<Broker>> {
        self.machines.read().get(&machine_id)?.upgrade()
    }
}
