//! Dispatch loop and the control events that steer it.

pub mod control;
pub mod dispatcher;
pub mod signals;

pub use control::{
    control_channel, Control, ControlReceiver, ControlSender, DEFAULT_CONTROL_CAPACITY,
};
pub use dispatcher::{DispatchError, Dispatcher, RunStats, State};
pub use signals::install_user_signals;
