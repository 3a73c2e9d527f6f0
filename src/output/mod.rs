//! Output side: sinks that behavior modules emit synthetic events into.
//!
//! In production every sink is a uinput virtual device; tests swap in a
//! recorder through the [`SinkFactory`] handed to each module.

pub mod uinput;

#[cfg(test)]
pub(crate) mod testing;

use crate::device::{codes, InputEvent};
use std::sync::Arc;

pub use uinput::VirtualDevice;

/// One event type and the codes a virtual device may emit for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub kind: u16,
    pub codes: Vec<u16>,
}

impl Capability {
    pub fn new(kind: u16, codes: impl IntoIterator<Item = u16>) -> Self {
        Self {
            kind,
            codes: codes.into_iter().collect(),
        }
    }
}

/// Identity and capability map of a virtual output device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub name: String,
    pub bus: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
    pub capabilities: Vec<Capability>,
}

impl DeviceSpec {
    /// A USB device with vendor/product/version 1, as the built-in modules use.
    pub fn usb(name: impl Into<String>, capabilities: Vec<Capability>) -> Self {
        Self {
            name: name.into(),
            bus: codes::BUS_USB,
            vendor: 1,
            product: 1,
            version: 1,
            capabilities,
        }
    }
}

/// Destination for synthetic events.
pub trait EventSink: Send {
    /// Emits a single event, returning whether it was fully written.
    fn send(&mut self, kind: u16, code: u16, value: i32) -> bool;

    fn emit(&mut self, event: InputEvent) -> bool {
        self.send(event.kind, event.code, event.value)
    }

    /// Commits everything emitted since the previous sync.
    fn sync(&mut self) -> bool {
        self.send(codes::EV_SYN, codes::SYN_REPORT, 0)
    }
}

/// Creates the output sink for a device spec; `None` if it cannot be created.
pub type SinkFactory = Arc<dyn Fn(&DeviceSpec) -> Option<Box<dyn EventSink>> + Send + Sync>;

/// Factory backed by `/dev/uinput`.
pub fn uinput_factory() -> SinkFactory {
    Arc::new(|spec: &DeviceSpec| match VirtualDevice::create(spec) {
        Ok(device) => Some(Box::new(device) as Box<dyn EventSink>),
        Err(e) => {
            tracing::error!(name = %spec.name, error = %e, "Failed to create virtual device");
            None
        }
    })
}
