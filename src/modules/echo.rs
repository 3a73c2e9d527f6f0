//! Diagnostic module: logs every event it receives.
//!
//! Useful for finding out which codes and values a device produces before
//! writing a real mapping.

use crate::device::{InputEvent, Role};
use crate::output::SinkFactory;
use crate::plugin::Plugin;

pub const NAME: &str = "echo";

pub fn create(_sinks: SinkFactory) -> Box<dyn Plugin> {
    Box::new(Echo::default())
}

#[derive(Debug, Default)]
pub struct Echo {
    events: u64,
}

impl Echo {
    pub fn events_seen(&self) -> u64 {
        self.events
    }
}

impl Plugin for Echo {
    fn name(&self) -> &str {
        NAME
    }

    fn init(&mut self, args: &[String]) {
        tracing::info!(?args, "Echo module initialized");
    }

    fn handle(&mut self, event: &InputEvent, role: Role) {
        self.events += 1;
        tracing::info!(
            kind = event.kind,
            code = event.code,
            value = event.value,
            role,
            "Event"
        );
    }

    fn user1(&mut self) {
        tracing::info!(events = self.events, "user1");
    }

    fn user2(&mut self) {
        tracing::info!(events = self.events, "user2");
    }

    fn destroy(&mut self) {
        tracing::info!(events = self.events, "Echo module destroyed");
    }
}
