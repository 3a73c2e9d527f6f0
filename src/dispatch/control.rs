//! Control events delivered into the dispatch loop from outside it.
//!
//! User triggers travel through a bounded queue so that every arrival is
//! delivered exactly once. Termination is a sticky flag and can never be
//! dropped by a full queue.

use super::signals;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;

/// Default number of user triggers that may be queued between two cycles.
pub const DEFAULT_CONTROL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Terminate,
    User1,
    User2,
}

/// Sending half, cheap to clone into signal handlers and worker threads.
#[derive(Clone)]
pub struct ControlSender {
    tx: SyncSender<Control>,
    terminate: Arc<AtomicBool>,
}

impl ControlSender {
    /// Queues a control event. Returns false if a user trigger was dropped
    /// because the queue is full or the loop has gone away.
    pub fn send(&self, control: Control) -> bool {
        if control == Control::Terminate {
            self.terminate.store(true, Ordering::SeqCst);
            return true;
        }

        match self.tx.try_send(control) {
            Ok(()) => true,
            Err(TrySendError::Full(c)) => {
                tracing::warn!(control = ?c, "Control queue full, trigger dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Receiving half, owned by the dispatch loop.
pub struct ControlReceiver {
    rx: Receiver<Control>,
    terminate: Arc<AtomicBool>,
    forward_signals: bool,
}

impl ControlReceiver {
    /// Also collect SIGUSR1/SIGUSR2 arrivals (see [`signals`]).
    pub fn forward_signals(mut self, enabled: bool) -> Self {
        self.forward_signals = enabled;
        self
    }

    pub fn terminate_requested(&self) -> bool {
        self.terminate.load(Ordering::SeqCst)
    }

    /// Moves every pending control event into `out`: user triggers in arrival
    /// order, then `Terminate` if it was requested.
    pub fn drain_into(&self, out: &mut Vec<Control>) {
        if self.forward_signals {
            let (user1, user2) = signals::take_pending();
            out.extend(std::iter::repeat(Control::User1).take(user1));
            out.extend(std::iter::repeat(Control::User2).take(user2));
        }

        out.extend(self.rx.try_iter());

        if self.terminate_requested() {
            out.push(Control::Terminate);
        }
    }
}

/// Creates a control queue holding up to `capacity` user triggers.
pub fn control_channel(capacity: usize) -> (ControlSender, ControlReceiver) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    let terminate = Arc::new(AtomicBool::new(false));
    (
        ControlSender {
            tx,
            terminate: Arc::clone(&terminate),
        },
        ControlReceiver {
            rx,
            terminate,
            forward_signals: false,
        },
    )
}
