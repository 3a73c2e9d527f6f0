//! A single registered input source.

use super::error::DeviceError;
use super::event::Role;
use std::fs::OpenOptions;
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// `EVIOCGRAB` = `_IOW('E', 0x90, int)`.
const EVIOCGRAB: libc::c_ulong = 0x4004_4590;

/// An opened, non-blocking input device tagged with a role.
///
/// The fd is closed when the source is dropped.
#[derive(Debug)]
pub struct Source {
    fd: OwnedFd,
    path: PathBuf,
    role: Role,
}

impl Source {
    /// Opens `path` read-only and non-blocking.
    pub fn open(path: impl AsRef<Path>, role: Role) -> Result<Self, DeviceError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DeviceError::Unavailable {
                path: path.to_path_buf(),
            });
        }

        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| DeviceError::OpenFailed {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            fd: file.into(),
            path: path.to_path_buf(),
            role,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Requests (or releases) exclusive access via `EVIOCGRAB`.
    pub fn grab(&self, enabled: bool) -> io::Result<()> {
        let value: libc::c_int = i32::from(enabled);
        // SAFETY: EVIOCGRAB takes an int argument by value and touches no memory of ours.
        let rc = unsafe { libc::ioctl(self.fd.as_raw_fd(), EVIOCGRAB as _, value) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

impl AsFd for Source {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_path_is_unavailable() {
        let err = Source::open("/dev/input/does-not-exist-42", 0).unwrap_err();
        assert!(matches!(err, DeviceError::Unavailable { .. }));
    }

    #[test]
    fn test_open_keeps_role_and_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = Source::open(file.path(), 3).unwrap();
        assert_eq!(source.role(), 3);
        assert_eq!(source.path(), file.path());
    }

    #[test]
    fn test_grab_fails_on_non_evdev_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = Source::open(file.path(), 0).unwrap();
        assert!(source.grab(true).is_err());
    }
}
