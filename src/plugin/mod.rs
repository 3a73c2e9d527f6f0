//! Behavior-module contract and loaders.
//!
//! A plugin receives every multiplexed event through [`Plugin::handle`] and
//! may react to two external triggers. Plugins come either from a shared
//! library exposing the C entry points (see [`dynamic`]) or from the
//! compiled-in registry (see [`registry`]), selected with `builtin:<name>`.

pub mod dynamic;
pub mod registry;

use crate::device::{InputEvent, Role};
use crate::output::SinkFactory;
use std::path::PathBuf;
use thiserror::Error;

pub use dynamic::DynamicPlugin;

/// Prefix selecting a compiled-in module instead of a library path.
pub const BUILTIN_PREFIX: &str = "builtin:";

/// Lifecycle contract between the host and a behavior module.
///
/// Every entry point is optional; the defaults do nothing. The host calls
/// them serially from the dispatch thread: `init` once, `handle` per event,
/// `user1`/`user2` on demand, `destroy` once, then `unload`.
pub trait Plugin {
    fn name(&self) -> &str;

    /// Whether the module itself is usable (for libraries: it opened).
    fn is_ready(&self) -> bool {
        true
    }

    fn init(&mut self, _args: &[String]) {}

    fn handle(&mut self, _event: &InputEvent, _role: Role) {}

    fn user1(&mut self) {}

    fn user2(&mut self) {}

    /// Releases everything the module acquired, joining any worker it spawned.
    fn destroy(&mut self) {}

    /// Releases the module itself. Must only run after `destroy`.
    fn unload(self: Box<Self>) {}
}

/// Plugin loading failures. Both are fatal at startup.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("error opening module '{}': {reason}", path.display())]
    Unavailable { path: PathBuf, reason: String },

    #[error("unknown built-in module '{name}' (available: {available})")]
    UnknownBuiltin { name: String, available: String },
}

/// Loads `spec`, either `builtin:<name>` or a path to a shared library.
pub fn load_plugin(spec: &str, sinks: SinkFactory) -> Result<Box<dyn Plugin>, PluginError> {
    let plugin: Box<dyn Plugin> = match spec.strip_prefix(BUILTIN_PREFIX) {
        Some(name) => registry::create(name, sinks)?,
        None => Box::new(DynamicPlugin::load(spec)?),
    };
    tracing::info!(module = plugin.name(), "Module loaded");
    Ok(plugin)
}
