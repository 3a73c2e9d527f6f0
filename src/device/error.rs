//! Errors raised by the device layer.

use super::event::Role;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to register a source.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The path does not exist.
    #[error("cannot access '{}', does it exist?", path.display())]
    Unavailable { path: PathBuf },

    /// The path exists but could not be opened.
    #[error("failed to open '{}': {source}", path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure outcome of a multiplexer poll.
#[derive(Debug, Error)]
pub enum PollError {
    /// Nothing is registered, so there is nothing to wait on.
    #[error("no input sources registered")]
    EmptyRegistry,

    /// The readiness wait itself failed.
    #[error("readiness wait failed: {0}")]
    Wait(#[source] io::Error),

    /// A ready source returned no data; it was most likely disconnected.
    #[error("read from '{}' (role {role}) failed: {source}", path.display())]
    Read {
        path: PathBuf,
        role: Role,
        #[source]
        source: io::Error,
    },
}

impl PollError {
    /// Role of the source that failed, when the failure is tied to one.
    pub fn role(&self) -> Option<Role> {
        match self {
            PollError::Read { role, .. } => Some(*role),
            _ => None,
        }
    }
}
