// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

//! Single-threaded actor loop shared by every module.
//!
//! A module is its configuration plus an inbox handler plus, optionally, a
//! tick source. The runner owns the inbox, drains it in bounded chunks, and
//! sleeps when there is nothing to do; all state mutation happens inside
//! `handle`/`on_tick` before the next poll.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bus::Envelope;

pub trait Module: Send {
    fn name(&self) -> &'static str;

    fn handle(&mut self, envelope: Envelope);

    /// Edge-triggered periodic trigger. Tick arrivals observed in one loop
    /// iteration are coalesced into a single call.
    fn on_tick(&mut self) {}

    /// Called once per loop iteration after inbox and tick processing.
    fn on_loop_end(&mut self) {}
}

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("module inbox channel closed")]
    ChannelClosed,
    #[error("module shutdown requested")]
    ShutdownRequested,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleStop {
    shutdown: Arc<AtomicBool>,
}

impl ModuleStop {
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModuleRunnerConfig {
    pub max_envelopes_per_chunk: usize,
    pub idle_poll_interval: Duration,
}

impl Default for ModuleRunnerConfig {
    fn default() -> Self {
        Self {
            max_envelopes_per_chunk: 64,
            idle_poll_interval: Duration::from_millis(2),
        }
    }
}

pub struct ModuleRunner<M: Module + 'static> {
    module: M,
    rx: mpsc::UnboundedReceiver<Envelope>,
    ticks: Option<mpsc::UnboundedReceiver<()>>,
    stop: ModuleStop,
    config: ModuleRunnerConfig,
}

impl<M: Module + 'static> ModuleRunner<M> {
    pub fn new(
        module: M,
        rx: mpsc::UnboundedReceiver<Envelope>,
        config: ModuleRunnerConfig,
    ) -> Self {
        Self {
            module,
            rx,
            ticks: None,
            stop: ModuleStop::default(),
            config,
        }
    }

    pub fn with_ticks(mut self, ticks: mpsc::UnboundedReceiver<()>) -> Self {
        self.ticks = Some(ticks);
        self
    }

    pub fn spawn(self) -> (JoinHandle<ModuleError>, ModuleStop) {
        let stop = self.stop.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let mut runner = self;
            match runner.run_forever() {
                Err(err) => err,
                Ok(()) => unreachable!("module run loop is expected to be non-terminating"),
            }
        });
        (handle, stop)
    }

    fn run_forever(&mut self) -> Result<(), ModuleError> {
        while !self.stop.is_shutdown_requested() {
            let handled = self.drain_inbox_chunk()?;
            let ticked = self.drain_ticks();
            if ticked {
                self.module.on_tick();
            }
            self.module.on_loop_end();

            if handled == 0 && !ticked {
                thread::sleep(self.config.idle_poll_interval);
            }
        }

        Err(ModuleError::ShutdownRequested)
    }

    fn drain_inbox_chunk(&mut self) -> Result<usize, ModuleError> {
        let mut handled = 0_usize;
        while handled < self.config.max_envelopes_per_chunk.max(1) {
            match self.rx.try_recv() {
                Ok(envelope) => {
                    self.module.handle(envelope);
                    handled = handled.saturating_add(1);
                }
                Err(mpsc::error::TryRecvError::Empty) => return Ok(handled),
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if handled == 0 {
                        return Err(ModuleError::ChannelClosed);
                    }
                    return Ok(handled);
                }
            }
        }
        Ok(handled)
    }

    fn drain_ticks(&mut self) -> bool {
        let Some(ticks) = self.ticks.as_mut() else {
            return false;
        };
        let mut ticked = false;
        while ticks.try_recv().is_ok() {
            ticked = true;
        }
        ticked
    }
}
