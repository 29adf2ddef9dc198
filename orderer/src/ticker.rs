// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

//! Periodic tick source. Subscribers receive empty notifications at the
//! configured cadence; a notification means "close the current batch now".

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Default)]
pub struct TickerStop {
    shutdown: Arc<AtomicBool>,
}

impl TickerStop {
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

pub struct Ticker {
    period: Duration,
    subscribers: Vec<mpsc::UnboundedSender<()>>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            subscribers: Vec::new(),
        }
    }

    /// Subscribe before `spawn`; there is no late joining.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn spawn(self) -> (JoinHandle<()>, TickerStop) {
        let stop = TickerStop::default();
        let loop_stop = stop.clone();
        let handle = tokio::task::spawn_blocking(move || {
            while !loop_stop.is_shutdown_requested() {
                thread::sleep(self.period);
                for subscriber in &self.subscribers {
                    // A gone subscriber is not the ticker's problem.
                    let _ = subscriber.send(());
                }
            }
        });
        (handle, stop)
    }
}
