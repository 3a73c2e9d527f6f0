//! SIGUSR1 / SIGUSR2 forwarding.
//!
//! The handlers only bump a counter per arrival; the dispatch loop collects
//! the counts at the top of each cycle. Termination signals are handled by
//! `ctrlc` in `main`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

static INIT: Once = Once::new();
static USER1_PENDING: AtomicUsize = AtomicUsize::new(0);
static USER2_PENDING: AtomicUsize = AtomicUsize::new(0);

extern "C" fn on_user1(_sig: libc::c_int) {
    USER1_PENDING.fetch_add(1, Ordering::SeqCst);
}

extern "C" fn on_user2(_sig: libc::c_int) {
    USER2_PENDING.fetch_add(1, Ordering::SeqCst);
}

/// Installs the SIGUSR1/SIGUSR2 handlers (idempotent).
pub fn install_user_signals() {
    INIT.call_once(|| {
        install(libc::SIGUSR1, on_user1);
        install(libc::SIGUSR2, on_user2);
        tracing::debug!("User signal handlers installed");
    });
}

fn install(signal: libc::c_int, handler: extern "C" fn(libc::c_int)) {
    // SAFETY: the handler only touches atomics, which is async-signal-safe.
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler as libc::sighandler_t;
        action.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut action.sa_mask);
        if libc::sigaction(signal, &action, std::ptr::null_mut()) != 0 {
            tracing::error!(
                signal,
                error = %std::io::Error::last_os_error(),
                "Failed to install signal handler"
            );
        }
    }
}

/// Returns and resets the number of SIGUSR1 and SIGUSR2 arrivals.
pub fn take_pending() -> (usize, usize) {
    (
        USER1_PENDING.swap(0, Ordering::SeqCst),
        USER2_PENDING.swap(0, Ordering::SeqCst),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raised_signals_are_counted() {
        install_user_signals();
        take_pending();

        unsafe {
            libc::raise(libc::SIGUSR1);
            libc::raise(libc::SIGUSR1);
            libc::raise(libc::SIGUSR2);
        }

        assert_eq!(take_pending(), (2, 1));
        assert_eq!(take_pending(), (0, 0));
    }
}
