//! Input side: evdev sources, the event multiplexer and device discovery.

pub mod batch;
pub mod discovery;
pub mod error;
pub mod event;
pub mod exclusive;
pub mod multiplexer;
pub mod source;

pub use discovery::{list_available, DeviceInfo};
pub use error::{DeviceError, PollError};
pub use event::{codes, InputEvent, Role};
pub use multiplexer::{EventSource, Multiplexer, PollResult, DEFAULT_POLL_TIMEOUT};
pub use source::Source;
