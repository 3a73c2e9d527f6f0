//! Input event types and the Linux event-code constants the modules use.

/// Tag attached to a source at registration and carried by every event it produces.
pub type Role = u32;

/// A single input event: type, code and value as defined by the Linux
/// input-event convention. Timestamps are intentionally dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct InputEvent {
    /// Event type (`EV_KEY`, `EV_ABS`, ...).
    pub kind: u16,
    /// Event code within the type (`KEY_A`, `ABS_X`, ...).
    pub code: u16,
    /// Event value (key state, axis position, relative delta).
    pub value: i32,
}

impl InputEvent {
    pub const fn new(kind: u16, code: u16, value: i32) -> Self {
        Self { kind, code, value }
    }

    /// The `EV_SYN / SYN_REPORT` event that commits a batch of changes.
    pub const fn sync() -> Self {
        Self::new(codes::EV_SYN, codes::SYN_REPORT, 0)
    }

    pub fn is_key(&self) -> bool {
        self.kind == codes::EV_KEY
    }
}

/// In-memory layout of `struct input_event` as read from and written to
/// evdev/uinput file descriptors.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawInputEvent {
    pub time: libc::timeval,
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl RawInputEvent {
    pub const SIZE: usize = std::mem::size_of::<RawInputEvent>();

    pub const fn zeroed() -> Self {
        Self {
            time: libc::timeval {
                tv_sec: 0,
                tv_usec: 0,
            },
            kind: 0,
            code: 0,
            value: 0,
        }
    }

    /// Views the record as the bytes that cross the fd boundary.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: repr(C) plain-old-data, every byte pattern is initialized
        // because the struct is only ever built from zeroed() or a kernel read.
        unsafe { std::slice::from_raw_parts((self as *const Self).cast::<u8>(), Self::SIZE) }
    }
}

impl From<&RawInputEvent> for InputEvent {
    fn from(raw: &RawInputEvent) -> Self {
        Self::new(raw.kind, raw.code, raw.value)
    }
}

impl From<InputEvent> for RawInputEvent {
    fn from(event: InputEvent) -> Self {
        Self {
            kind: event.kind,
            code: event.code,
            value: event.value,
            ..Self::zeroed()
        }
    }
}

/// Linux input event codes (`linux/input-event-codes.h`).
pub mod codes {
    // Event types
    pub const EV_SYN: u16 = 0x00;
    pub const EV_KEY: u16 = 0x01;
    pub const EV_REL: u16 = 0x02;
    pub const EV_ABS: u16 = 0x03;

    pub const SYN_REPORT: u16 = 0;

    // Keys
    pub const KEY_RESERVED: u16 = 0;
    pub const KEY_ESC: u16 = 1;
    pub const KEY_BACKSPACE: u16 = 14;
    pub const KEY_Q: u16 = 16;
    pub const KEY_W: u16 = 17;
    pub const KEY_I: u16 = 23;
    pub const KEY_O: u16 = 24;
    pub const KEY_LEFTCTRL: u16 = 29;
    pub const KEY_A: u16 = 30;
    pub const KEY_S: u16 = 31;
    pub const KEY_D: u16 = 32;
    pub const KEY_K: u16 = 37;
    pub const KEY_L: u16 = 38;
    pub const KEY_Z: u16 = 44;
    pub const KEY_X: u16 = 45;
    pub const KEY_F1: u16 = 59;
    pub const KEY_F2: u16 = 60;
    pub const KEY_UP: u16 = 103;
    pub const KEY_LEFT: u16 = 105;
    pub const KEY_RIGHT: u16 = 106;
    pub const KEY_DOWN: u16 = 108;
    pub const KEY_DELETE: u16 = 111;
    pub const KEY_UNKNOWN: u16 = 240;

    // Buttons
    pub const BTN_LEFT: u16 = 0x110;
    pub const BTN_RIGHT: u16 = 0x111;
    pub const BTN_TRIGGER: u16 = 0x120;
    pub const BTN_THUMB: u16 = 0x121;
    pub const BTN_THUMB2: u16 = 0x122;
    pub const BTN_TOP: u16 = 0x123;
    pub const BTN_TOP2: u16 = 0x124;
    pub const BTN_PINKIE: u16 = 0x125;
    pub const BTN_BASE: u16 = 0x126;
    pub const BTN_BASE2: u16 = 0x127;
    pub const BTN_SOUTH: u16 = 0x130;
    pub const BTN_EAST: u16 = 0x131;
    pub const BTN_NORTH: u16 = 0x133;
    pub const BTN_WEST: u16 = 0x134;
    pub const BTN_TL: u16 = 0x136;
    pub const BTN_TR: u16 = 0x137;
    pub const BTN_TL2: u16 = 0x138;
    pub const BTN_TR2: u16 = 0x139;
    pub const BTN_SELECT: u16 = 0x13a;
    pub const BTN_START: u16 = 0x13b;
    pub const BTN_MODE: u16 = 0x13c;
    pub const BTN_THUMBL: u16 = 0x13d;
    pub const BTN_THUMBR: u16 = 0x13e;
    pub const BTN_DPAD_UP: u16 = 0x220;
    pub const BTN_DPAD_DOWN: u16 = 0x221;
    pub const BTN_DPAD_LEFT: u16 = 0x222;
    pub const BTN_DPAD_RIGHT: u16 = 0x223;

    // Relative axes
    pub const REL_X: u16 = 0x00;
    pub const REL_Y: u16 = 0x01;
    pub const REL_HWHEEL: u16 = 0x06;
    pub const REL_WHEEL: u16 = 0x08;

    // Absolute axes
    pub const ABS_X: u16 = 0x00;
    pub const ABS_Y: u16 = 0x01;
    pub const ABS_RX: u16 = 0x03;
    pub const ABS_RY: u16 = 0x04;

    // Bus types
    pub const BUS_USB: u16 = 0x03;
}
