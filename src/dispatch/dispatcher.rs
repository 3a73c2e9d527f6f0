//! The dispatch loop: pulls events from an [`EventSource`] and drives a
//! [`Plugin`] through its lifecycle.

use super::control::{Control, ControlReceiver};
use crate::device::{EventSource, PollError, PollResult};
use crate::plugin::Plugin;
use thiserror::Error;

/// Lifecycle of a dispatch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    Running,
    Draining,
    Terminated,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("input failure: {0}")]
    Source(#[from] PollError),

    #[error("dispatcher already ran")]
    AlreadyRan,
}

/// Counters reported when a run finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub events: u64,
    pub timeouts: u64,
    pub user1: u64,
    pub user2: u64,
}

pub struct Dispatcher<S: EventSource> {
    source: S,
    plugin: Option<Box<dyn Plugin>>,
    controls: ControlReceiver,
    state: State,
    stats: RunStats,
    pending: Vec<Control>,
}

impl<S: EventSource> Dispatcher<S> {
    pub fn new(source: S, plugin: Box<dyn Plugin>, controls: ControlReceiver) -> Self {
        Self {
            source,
            plugin: Some(plugin),
            controls,
            state: State::Init,
            stats: RunStats::default(),
            pending: Vec::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Runs the plugin to completion.
    ///
    /// Returns once termination is requested or the source fails. The plugin
    /// is destroyed and unloaded in both cases; a source failure that was not
    /// preceded by a termination request is reported as an error.
    pub fn run(&mut self, args: &[String]) -> Result<RunStats, DispatchError> {
        let Some(mut plugin) = self.plugin.take() else {
            tracing::warn!(state = ?self.state, "Dispatcher cannot be run twice");
            return Err(DispatchError::AlreadyRan);
        };

        plugin.init(args);
        self.state = State::Running;
        tracing::info!(module = plugin.name(), "Dispatch loop running");

        let failure = self.run_cycles(&mut *plugin);

        self.state = State::Draining;
        tracing::info!(module = plugin.name(), stats = ?self.stats, "Dispatch loop draining");
        plugin.destroy();
        plugin.unload();
        self.state = State::Terminated;
        tracing::info!("Dispatch loop terminated");

        match failure {
            Some(e) => Err(e.into()),
            None => Ok(self.stats),
        }
    }

    /// Cycles until termination (`None`) or a fatal source error.
    fn run_cycles(&mut self, plugin: &mut dyn Plugin) -> Option<PollError> {
        loop {
            if self.service_controls(plugin) {
                return None;
            }

            match self.source.poll(false) {
                PollResult::Event { event, role } => {
                    self.stats.events += 1;
                    plugin.handle(&event, role);
                }
                PollResult::Timeout => {
                    self.stats.timeouts += 1;
                }
                PollResult::Error(e) => {
                    if self.controls.terminate_requested() {
                        tracing::debug!(error = %e, "Source error after termination request");
                        return None;
                    }
                    tracing::error!(role = ?e.role(), error = %e, "Stopping on input failure");
                    return Some(e);
                }
            }
        }
    }

    /// Delivers pending control events. Returns true once termination is due.
    fn service_controls(&mut self, plugin: &mut dyn Plugin) -> bool {
        self.pending.clear();
        self.controls.drain_into(&mut self.pending);

        let mut terminate = false;
        for control in self.pending.iter() {
            match control {
                Control::User1 => {
                    self.stats.user1 += 1;
                    plugin.user1();
                }
                Control::User2 => {
                    self.stats.user2 += 1;
                    plugin.user2();
                }
                Control::Terminate => terminate = true,
            }
        }

        if terminate {
            tracing::info!("Termination requested");
        }
        terminate
    }
}
