//! Reusable read-ahead buffer for one batch of events.

use super::event::{InputEvent, RawInputEvent, Role};
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};

/// Maximum number of records pulled from a source in a single read.
pub const BATCH_CAPACITY: usize = 64;

/// Fixed-capacity batch filled by one read of one source.
///
/// The buffer is allocated once per multiplexer and refilled in place; all
/// events in it share the role of the source that filled it.
pub struct EventBatch {
    events: [RawInputEvent; BATCH_CAPACITY],
    len: usize,
    cursor: usize,
    role: Role,
}

impl EventBatch {
    pub fn new() -> Self {
        Self {
            events: [RawInputEvent::zeroed(); BATCH_CAPACITY],
            len: 0,
            cursor: 0,
            role: 0,
        }
    }

    /// Number of events not yet handed out.
    pub fn remaining(&self) -> usize {
        self.len - self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.len
    }

    /// Takes the next unread event, tagged with the batch role.
    pub fn next_event(&mut self) -> Option<(InputEvent, Role)> {
        if self.is_exhausted() {
            return None;
        }
        let event = InputEvent::from(&self.events[self.cursor]);
        self.cursor += 1;
        Some((event, self.role))
    }

    /// Drops any unread events.
    pub fn clear(&mut self) {
        self.len = 0;
        self.cursor = 0;
    }

    /// Refills the buffer with a single `read(2)` from `fd`.
    ///
    /// Returns the number of whole records read. The buffer is left empty on
    /// any error, including a read that yields less than one record.
    pub fn fill_from(&mut self, fd: BorrowedFd<'_>, role: Role) -> io::Result<usize> {
        self.clear();

        // SAFETY: the destination is our own array, sized in bytes exactly as passed.
        let n = unsafe {
            libc::read(
                fd.as_raw_fd(),
                self.events.as_mut_ptr().cast::<libc::c_void>(),
                RawInputEvent::SIZE * BATCH_CAPACITY,
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }

        let count = n as usize / RawInputEvent::SIZE;
        if count == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short read of {n} bytes"),
            ));
        }

        self.len = count;
        self.role = role;
        Ok(count)
    }
}

impl Default for EventBatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::event::codes;
    use std::io::Write;
    use std::os::fd::AsFd;
    use std::os::unix::net::UnixStream;

    fn write_events(stream: &mut UnixStream, events: &[InputEvent]) {
        for e in events {
            stream.write_all(RawInputEvent::from(*e).as_bytes()).unwrap();
        }
    }

    #[test]
    fn test_new_batch_is_exhausted() {
        let mut batch = EventBatch::new();
        assert!(batch.is_exhausted());
        assert_eq!(batch.remaining(), 0);
        assert!(batch.next_event().is_none());
    }

    #[test]
    fn test_fill_and_drain_in_order() {
        let (mut tx, rx) = UnixStream::pair().unwrap();
        let sent = [
            InputEvent::new(codes::EV_KEY, codes::KEY_A, 1),
            InputEvent::new(codes::EV_KEY, codes::KEY_A, 0),
            InputEvent::sync(),
        ];
        write_events(&mut tx, &sent);

        let mut batch = EventBatch::new();
        let count = batch.fill_from(rx.as_fd(), 7).unwrap();
        assert_eq!(count, 3);
        assert_eq!(batch.remaining(), 3);

        for expected in sent {
            assert_eq!(batch.next_event(), Some((expected, 7)));
        }
        assert!(batch.is_exhausted());
    }

    #[test]
    fn test_eof_is_an_error_and_leaves_batch_empty() {
        let (tx, rx) = UnixStream::pair().unwrap();
        drop(tx);

        let mut batch = EventBatch::new();
        assert!(batch.fill_from(rx.as_fd(), 1).is_err());
        assert!(batch.is_exhausted());
    }

    #[test]
    fn test_partial_record_is_an_error() {
        let (mut tx, rx) = UnixStream::pair().unwrap();
        tx.write_all(&[0u8; 3]).unwrap();

        let mut batch = EventBatch::new();
        let err = batch.fill_from(rx.as_fd(), 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
