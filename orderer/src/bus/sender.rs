// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tracing::trace;

use ordering_core::MachineId;

use super::{Broker, Channel, Directory, Envelope, Request};

// Must start from 1; identity 0 is reserved by the transport.
static SENDER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Outbound half of the bus, owned by a single module. Destination brokers
/// are resolved lazily and cached, so senders need no eager topology
/// knowledge and survive peers coming up after them.
pub struct Sender {
    id: u64,
    local_machine_id: MachineId,
    local: Weak<Broker>,
    directory: Arc<Directory>,
    destinations: HashMap<MachineId, Weak<Broker>>,
}

impl Sender {
    pub fn new(broker: &Arc<Broker>, directory: Arc<Directory>) -> Self {
        Self {
            id: SENDER_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            local_machine_id: broker.local_machine_id(),
            local: Arc::downgrade(broker),
            directory,
            destinations: HashMap::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn local_machine_id(&self) -> MachineId {
        self.local_machine_id
    }

    pub fn send(&mut self, request: Request, to_machine_id: MachineId, channel: Channel) {
        // Lazily establish the destination handle when necessary.
        let cached = self
            .destinations
            .get(&to_machine_id)
            .and_then(Weak::upgrade);
        let broker = match cached {
            Some(broker) => broker,
            None => match self.directory.resolve(to_machine_id) {
                Some(broker) => {
                    self.destinations
                        .insert(to_machine_id, Arc::downgrade(&broker));
                    broker
                }
                None => {
                    // Destination has been torn down or never joined. This
                    // can only happen during cleaning up.
                    trace!(to_machine_id, channel, "dropping send to unresolvable machine");
                    return;
                }
            },
        };

        broker.deliver(
            channel,
            Envelope {
                from: self.local_machine_id,
                request,
            },
        );
    }

    pub fn send_local(&self, request: Request, channel: Channel) {
        let Some(broker) = self.local.upgrade() else {
            trace!(channel, "dropping local send; broker is gone");
            return;
        };
        broker.deliver(
            channel,
            Envelope {
                from: self.local_machine_id,
                request,
            },
        );
    }
}
