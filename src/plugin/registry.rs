//! Compiled-in behavior modules, keyed by name.

use super::{Plugin, PluginError};
use crate::modules;
use crate::output::SinkFactory;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Builds a fresh module instance that opens its outputs through the factory.
pub type Constructor = fn(SinkFactory) -> Box<dyn Plugin>;

static BUILTINS: Lazy<BTreeMap<&'static str, Constructor>> = Lazy::new(|| {
    BTreeMap::from([
        (modules::cavestorysnes::NAME, modules::cavestorysnes::create as Constructor),
        (modules::echo::NAME, modules::echo::create as Constructor),
        (modules::toy::NAME, modules::toy::create as Constructor),
        (modules::ctrlbackdel::NAME, modules::ctrlbackdel::create as Constructor),
        (modules::keyboard::NAME, modules::keyboard::create as Constructor),
        (modules::modalgamepad::NAME, modules::modalgamepad::create as Constructor),
    ])
});

/// Names of all built-in modules, sorted.
pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.keys().copied()
}

/// Instantiates the built-in module called `name`.
pub fn create(name: &str, sinks: SinkFactory) -> Result<Box<dyn Plugin>, PluginError> {
    match BUILTINS.get(name) {
        Some(constructor) => Ok(constructor(sinks)),
        None => Err(PluginError::UnknownBuiltin {
            name: name.to_string(),
            available: names().collect::<Vec<_>>().join(", "),
        }),
    }
}
