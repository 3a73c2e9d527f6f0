//! Recording sinks for module tests.

use super::{DeviceSpec, EventSink, SinkFactory};
use crate::device::InputEvent;
use std::sync::{Arc, Mutex};

/// Everything emitted through sinks created by a [`recording_factory`],
/// tagged with the name of the device it went to.
#[derive(Clone, Default)]
pub struct Recording(Arc<Mutex<Vec<(String, InputEvent)>>>);

impl Recording {
    /// Events sent to the device called `name`, in order.
    pub fn events_for(&self, name: &str) -> Vec<InputEvent> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, e)| *e)
            .collect()
    }

    pub fn all(&self) -> Vec<InputEvent> {
        self.0.lock().unwrap().iter().map(|(_, e)| *e).collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

struct RecordingSink {
    name: String,
    recording: Recording,
}

impl EventSink for RecordingSink {
    fn send(&mut self, kind: u16, code: u16, value: i32) -> bool {
        self.recording
            .0
            .lock()
            .unwrap()
            .push((self.name.clone(), InputEvent::new(kind, code, value)));
        true
    }
}

/// Factory whose sinks append to a shared [`Recording`].
pub fn recording_factory() -> (SinkFactory, Recording) {
    let recording = Recording::default();
    let shared = recording.clone();
    let factory: SinkFactory = Arc::new(move |spec: &DeviceSpec| {
        Some(Box::new(RecordingSink {
            name: spec.name.clone(),
            recording: shared.clone(),
        }) as Box<dyn EventSink>)
    });
    (factory, recording)
}

/// Factory that never produces a sink, as when `/dev/uinput` is unavailable.
pub fn failing_factory() -> SinkFactory {
    Arc::new(|_: &DeviceSpec| None)
}
