//! FunKeyMonkey - evdev event multiplexer and behavior-module host.
//!
//! Reads raw input events from one or more `/dev/input/event*` devices,
//! merges them into a single role-tagged stream and hands every event to a
//! behavior module (a plugin) that may re-emit synthetic events through
//! virtual uinput devices.

pub mod config;
pub mod device;
pub mod dispatch;
pub mod modules;
pub mod output;
pub mod plugin;
