//! Multi-source event multiplexer with round-robin fairness.
//!
//! Every registered [`Source`] carries a role. `poll` hands out one event at
//! a time: first from the read-ahead batch, then by waiting on all sources and
//! reading one batch from the next ready source after the one served last.

use super::batch::EventBatch;
use super::error::{DeviceError, PollError};
use super::event::{InputEvent, Role};
use super::exclusive::apply_all_or_revert;
use super::source::Source;
use std::io;
use std::os::fd::{AsFd, AsRawFd};
use std::path::Path;
use std::time::Duration;

/// Upper bound of a non-blocking readiness wait.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Outcome of a single poll.
#[derive(Debug)]
pub enum PollResult {
    /// An event together with the role of the source that produced it.
    Event { event: InputEvent, role: Role },
    /// Nothing became ready within the timeout.
    Timeout,
    /// The wait or a read failed.
    Error(PollError),
}

/// Anything the dispatch loop can pull events from.
pub trait EventSource {
    fn poll(&mut self, blocking: bool) -> PollResult;
}

/// Registry of input sources plus the state needed to serve them fairly.
pub struct Multiplexer {
    sources: Vec<Source>,
    batch: EventBatch,
    /// Index of the source served last (the round-robin pointer).
    last_served: Option<usize>,
    timeout: Duration,
    pollfds: Vec<libc::pollfd>,
}

impl Multiplexer {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_POLL_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            sources: Vec::new(),
            batch: EventBatch::new(),
            last_served: None,
            timeout,
            pollfds: Vec::new(),
        }
    }

    /// Opens `path` and appends it to the registry.
    pub fn add_source(&mut self, path: impl AsRef<Path>, role: Role) -> Result<(), DeviceError> {
        let source = Source::open(path, role)?;
        tracing::info!(path = %source.path().display(), role, "Input source registered");
        self.sources.push(source);
        Ok(())
    }

    /// True once at least one source is registered.
    pub fn ready(&self) -> bool {
        !self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    /// Events left in the read-ahead batch.
    pub fn buffered(&self) -> usize {
        self.batch.remaining()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Grabs (or releases) every source.
    ///
    /// If any source rejects the request, the ones that accepted are put back
    /// in their previous mode and `false` is returned.
    pub fn set_exclusive(&mut self, enabled: bool) -> bool {
        let ok = apply_all_or_revert(
            &mut self.sources,
            |source| match source.grab(enabled) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        path = %source.path().display(),
                        role = source.role(),
                        enabled,
                        error = %e,
                        "Exclusive access request rejected"
                    );
                    false
                }
            },
            |source| {
                if let Err(e) = source.grab(!enabled) {
                    tracing::warn!(
                        path = %source.path().display(),
                        error = %e,
                        "Failed to revert exclusive access"
                    );
                }
            },
        );

        if ok {
            tracing::info!(enabled, sources = self.sources.len(), "Exclusive access updated");
        }
        ok
    }

    /// Next ready source, scanning from just after the last served one.
    fn next_ready(&self) -> Option<usize> {
        let n = self.pollfds.len();
        let start = self.last_served.map_or(0, |i| (i + 1) % n);
        (0..n)
            .map(|offset| (start + offset) % n)
            .find(|&i| self.pollfds[i].revents != 0)
    }

    fn wait(&mut self, blocking: bool) -> io::Result<usize> {
        self.pollfds.clear();
        self.pollfds.extend(self.sources.iter().map(|s| libc::pollfd {
            fd: s.as_fd().as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        }));

        let timeout_ms: libc::c_int = if blocking {
            -1
        } else {
            self.timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int
        };

        // SAFETY: pollfds is a live Vec of exactly the length passed.
        let rc = unsafe {
            libc::poll(
                self.pollfds.as_mut_ptr(),
                self.pollfds.len() as libc::nfds_t,
                timeout_ms,
            )
        };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(rc as usize)
        }
    }
}

impl EventSource for Multiplexer {
    fn poll(&mut self, blocking: bool) -> PollResult {
        if let Some((event, role)) = self.batch.next_event() {
            return PollResult::Event { event, role };
        }

        if self.sources.is_empty() {
            return PollResult::Error(PollError::EmptyRegistry);
        }

        match self.wait(blocking) {
            Ok(0) => return PollResult::Timeout,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                tracing::trace!("Readiness wait interrupted");
                return PollResult::Timeout;
            }
            Err(e) => return PollResult::Error(PollError::Wait(e)),
        }

        let Some(index) = self.next_ready() else {
            return PollResult::Timeout;
        };
        let source = &self.sources[index];

        match self.batch.fill_from(source.as_fd(), source.role()) {
            Ok(count) => {
                tracing::trace!(role = source.role(), count, "Read event batch");
                self.last_served = Some(index);
                match self.batch.next_event() {
                    Some((event, role)) => PollResult::Event { event, role },
                    None => PollResult::Timeout,
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                tracing::debug!(role = source.role(), error = %e, "Spurious readiness");
                PollResult::Timeout
            }
            Err(e) => {
                tracing::error!(
                    path = %source.path().display(),
                    role = source.role(),
                    error = %e,
                    "Input source read failed, device likely disconnected"
                );
                PollResult::Error(PollError::Read {
                    path: source.path().to_path_buf(),
                    role: source.role(),
                    source: e,
                })
            }
        }
    }
}

impl Default for Multiplexer {
    fn default() -> Self {
        Self::new()
    }
}
