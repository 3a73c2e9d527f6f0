//! Built-in behavior modules.
//!
//! Each module exposes a `NAME` and a `create` constructor that the plugin
//! registry uses; they receive a [`SinkFactory`](crate::output::SinkFactory)
//! and open their virtual devices from `init`.

pub mod cavestorysnes;
pub mod ctrlbackdel;
pub mod echo;
pub mod keyboard;
pub mod modalgamepad;
pub mod toy;
