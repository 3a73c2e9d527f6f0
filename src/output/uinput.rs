//! Virtual input devices through the legacy `/dev/uinput` protocol.

use super::{DeviceSpec, EventSink};
use crate::device::codes;
use crate::device::event::RawInputEvent;
use std::fs::OpenOptions;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

pub const UINPUT_PATH: &str = "/dev/uinput";

const UINPUT_MAX_NAME_SIZE: usize = 80;
const ABS_CNT: usize = 0x40;

// _IO('U', n) / _IOW('U', n, int)
const UI_DEV_CREATE: libc::c_ulong = 0x5501;
const UI_DEV_DESTROY: libc::c_ulong = 0x5502;
const UI_SET_EVBIT: libc::c_ulong = 0x4004_5564;
const UI_SET_KEYBIT: libc::c_ulong = 0x4004_5565;
const UI_SET_RELBIT: libc::c_ulong = 0x4004_5566;
const UI_SET_ABSBIT: libc::c_ulong = 0x4004_5567;

/// `struct input_id`.
#[repr(C)]
#[derive(Clone, Copy, Default)]
struct InputId {
    bustype: u16,
    vendor: u16,
    product: u16,
    version: u16,
}

/// `struct uinput_user_dev`.
#[repr(C)]
struct UinputUserDev {
    name: [u8; UINPUT_MAX_NAME_SIZE],
    id: InputId,
    ff_effects_max: u32,
    absmax: [i32; ABS_CNT],
    absmin: [i32; ABS_CNT],
    absfuzz: [i32; ABS_CNT],
    absflat: [i32; ABS_CNT],
}

impl UinputUserDev {
    fn from_spec(spec: &DeviceSpec) -> Self {
        let mut dev = Self {
            name: [0; UINPUT_MAX_NAME_SIZE],
            id: InputId {
                bustype: spec.bus,
                vendor: spec.vendor,
                product: spec.product,
                version: spec.version,
            },
            ff_effects_max: 0,
            absmax: [0; ABS_CNT],
            absmin: [0; ABS_CNT],
            absfuzz: [0; ABS_CNT],
            absflat: [0; ABS_CNT],
        };

        // Leave room for the terminating NUL.
        let name = spec.name.as_bytes();
        let len = name.len().min(UINPUT_MAX_NAME_SIZE - 1);
        dev.name[..len].copy_from_slice(&name[..len]);

        // Absolute axes get a signed 16-bit range.
        for cap in spec.capabilities.iter().filter(|c| c.kind == codes::EV_ABS) {
            for &code in cap.codes.iter().filter(|&&c| (c as usize) < ABS_CNT) {
                dev.absmin[code as usize] = i16::MIN as i32;
                dev.absmax[code as usize] = i16::MAX as i32;
            }
        }
        dev
    }

    fn as_bytes(&self) -> &[u8] {
        // SAFETY: repr(C) struct of integers with no padding-dependent reads.
        unsafe {
            std::slice::from_raw_parts(
                (self as *const Self).cast::<u8>(),
                std::mem::size_of::<Self>(),
            )
        }
    }
}

/// A uinput device; destroyed when dropped.
pub struct VirtualDevice {
    fd: OwnedFd,
    name: String,
}

impl VirtualDevice {
    /// Registers a new virtual device at [`UINPUT_PATH`].
    pub fn create(spec: &DeviceSpec) -> io::Result<Self> {
        Self::create_at(UINPUT_PATH, spec)
    }

    pub fn create_at(path: impl AsRef<Path>, spec: &DeviceSpec) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;
        let fd: OwnedFd = file.into();

        for cap in &spec.capabilities {
            if let Err(e) = ioctl_int(&fd, UI_SET_EVBIT, cap.kind as libc::c_int) {
                tracing::error!(kind = cap.kind, error = %e, "Failed to add event type");
            }

            let bit = match cap.kind {
                codes::EV_KEY => UI_SET_KEYBIT,
                codes::EV_REL => UI_SET_RELBIT,
                codes::EV_ABS => UI_SET_ABSBIT,
                other => {
                    tracing::error!(kind = other, "Unsupported event type for virtual device");
                    continue;
                }
            };
            for &code in &cap.codes {
                if let Err(e) = ioctl_int(&fd, bit, code as libc::c_int) {
                    tracing::error!(kind = cap.kind, code, error = %e, "Failed to add event code");
                }
            }
        }

        let dev = UinputUserDev::from_spec(spec);
        let bytes = dev.as_bytes();
        // SAFETY: writes exactly the bytes of our own struct.
        let n = unsafe {
            libc::write(
                fd.as_raw_fd(),
                bytes.as_ptr().cast::<libc::c_void>(),
                bytes.len(),
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        if n as usize != bytes.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "short write of device description",
            ));
        }

        ioctl_none(&fd, UI_DEV_CREATE)?;
        tracing::info!(name = %spec.name, "Virtual device created");

        Ok(Self {
            fd,
            name: spec.name.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl EventSink for VirtualDevice {
    fn send(&mut self, kind: u16, code: u16, value: i32) -> bool {
        let raw = RawInputEvent::from(crate::device::InputEvent::new(kind, code, value));
        let bytes = raw.as_bytes();
        // SAFETY: writes exactly the bytes of one input_event record.
        let n = unsafe {
            libc::write(
                self.fd.as_raw_fd(),
                bytes.as_ptr().cast::<libc::c_void>(),
                bytes.len(),
            )
        };
        n >= 0 && n as usize == bytes.len()
    }
}

impl Drop for VirtualDevice {
    fn drop(&mut self) {
        match ioctl_none(&self.fd, UI_DEV_DESTROY) {
            Ok(()) => tracing::info!(name = %self.name, "Virtual device destroyed"),
            Err(e) => tracing::error!(name = %self.name, error = %e, "Failed to destroy virtual device"),
        }
    }
}

fn ioctl_int(fd: &OwnedFd, request: libc::c_ulong, arg: libc::c_int) -> io::Result<()> {
    // SAFETY: the UI_SET_* requests take an int by value.
    let rc = unsafe { libc::ioctl(fd.as_raw_fd(), request as _, arg) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn ioctl_none(fd: &OwnedFd, request: libc::c_ulong) -> io::Result<()> {
    // SAFETY: UI_DEV_CREATE / UI_DEV_DESTROY take no argument.
    let rc = unsafe { libc::ioctl(fd.as_raw_fd(), request as _) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Capability;

    #[test]
    fn test_user_dev_layout_matches_kernel() {
        // 80 + 8 + 4 + 4 * 64 * 4
        assert_eq!(std::mem::size_of::<UinputUserDev>(), 1116);
    }

    #[test]
    fn test_long_names_are_truncated_and_terminated() {
        let spec = DeviceSpec::usb("x".repeat(200), Vec::new());
        let dev = UinputUserDev::from_spec(&spec);
        assert_eq!(dev.name[UINPUT_MAX_NAME_SIZE - 1], 0);
        assert_eq!(dev.name[0], b'x');
    }

    #[test]
    fn test_abs_axes_get_a_range() {
        let spec = DeviceSpec::usb(
            "pad",
            vec![Capability::new(codes::EV_ABS, [codes::ABS_X, codes::ABS_RY])],
        );
        let dev = UinputUserDev::from_spec(&spec);
        assert_eq!(dev.absmax[codes::ABS_X as usize], i16::MAX as i32);
        assert_eq!(dev.absmin[codes::ABS_RY as usize], i16::MIN as i32);
        assert_eq!(dev.absmax[codes::ABS_Y as usize], 0);
    }

    #[test]
    fn test_create_fails_for_non_uinput_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let spec = DeviceSpec::usb("test", vec![Capability::new(codes::EV_KEY, [codes::KEY_A])]);
        assert!(VirtualDevice::create_at(file.path(), &spec).is_err());
    }
}
