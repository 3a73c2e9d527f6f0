//! Modal gamepad: reassigns the two analog nubs of a handheld.
//!
//! Each nub axis can drive a gamepad stick axis, the mouse pointer or the
//! scroll wheel; each nub click can be a gamepad thumb button or a mouse
//! button. Pointer movement is continuous, so a worker thread emits relative
//! motion every ~16 ms while a nub is outside its deadzone and sleeps on a
//! condition variable otherwise.
//!
//! Settings come from a `key = value` file named by a `config=FILE` module
//! argument:
//!
//! ```text
//! # comment
//! mouse.sensitivity = 15
//! mouse.deadzone = 100
//! mouse.wheel.deadzone = 500
//! nubs.left.x = left_joystick_x
//! nubs.right.y = mouse_y
//! nubs.right.click = mouse_left
//! ```

use crate::device::{codes, InputEvent, Role};
use crate::output::{Capability, DeviceSpec, EventSink, SinkFactory};
use crate::plugin::Plugin;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const NAME: &str = "modalgamepad";

const GAMEPAD_NAME: &str = "Modal Gamepad";
const MOUSE_NAME: &str = "Modal Gamepad Mouse";
const MOUSE_INTERVAL: Duration = Duration::from_millis(16);

pub fn create(sinks: SinkFactory) -> Box<dyn Plugin> {
    Box::new(ModalGamepad::new(sinks))
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisMode {
    Unknown,
    LeftJoystickX,
    LeftJoystickY,
    RightJoystickX,
    RightJoystickY,
    MouseX,
    MouseY,
    ScrollX,
    ScrollY,
}

impl AxisMode {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "left_joystick_x" => Self::LeftJoystickX,
            "left_joystick_y" => Self::LeftJoystickY,
            "right_joystick_x" => Self::RightJoystickX,
            "right_joystick_y" => Self::RightJoystickY,
            "mouse_x" => Self::MouseX,
            "mouse_y" => Self::MouseY,
            "scroll_x" => Self::ScrollX,
            "scroll_y" => Self::ScrollY,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickMode {
    Unknown,
    NubClickLeft,
    NubClickRight,
    MouseLeft,
    MouseRight,
}

impl ClickMode {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "nub_click_left" => Self::NubClickLeft,
            "nub_click_right" => Self::NubClickRight,
            "mouse_left" => Self::MouseLeft,
            "mouse_right" => Self::MouseRight,
            _ => Self::Unknown,
        }
    }
}

/// Deadzones and speed used by the pointer worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseTuning {
    pub deadzone: i32,
    pub sensitivity: i32,
    pub wheel_deadzone: i32,
}

impl Default for MouseTuning {
    fn default() -> Self {
        Self {
            deadzone: 100,
            sensitivity: 15,
            wheel_deadzone: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub left_x: AxisMode,
    pub left_y: AxisMode,
    pub right_x: AxisMode,
    pub right_y: AxisMode,
    pub left_click: ClickMode,
    pub right_click: ClickMode,
    pub mouse: MouseTuning,
    pub config_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            left_x: AxisMode::LeftJoystickX,
            left_y: AxisMode::LeftJoystickY,
            right_x: AxisMode::RightJoystickX,
            right_y: AxisMode::RightJoystickY,
            left_click: ClickMode::NubClickLeft,
            right_click: ClickMode::NubClickRight,
            mouse: MouseTuning::default(),
            config_file: None,
        }
    }
}

impl Settings {
    /// Picks up `config=FILE` from the module arguments.
    pub fn apply_args(&mut self, args: &[String]) {
        for arg in args {
            if let Some(file) = arg.strip_prefix("config=") {
                self.config_file = Some(PathBuf::from(file));
            }
        }
    }

    /// Applies every setting in `path`. Unknown keys and malformed lines are
    /// logged and skipped.
    pub fn load_file(&mut self, path: &Path) -> std::io::Result<()> {
        let contents = std::fs::read_to_string(path)?;
        self.load_str(&contents);
        Ok(())
    }

    pub fn load_str(&mut self, contents: &str) {
        for line in contents.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let Some((key, value)) = trimmed.split_once('=') else {
                tracing::warn!(line, "Invalid line in config file");
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let valid_key = !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '.');
            if !valid_key {
                tracing::warn!(line, "Invalid line in config file");
                continue;
            }
            self.apply(&key, value.trim());
        }
    }

    fn apply(&mut self, key: &str, value: &str) {
        let int = |value: &str| -> Option<i32> {
            match value.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(key, value, "Expected an integer setting");
                    None
                }
            }
        };

        match key {
            "mouse.sensitivity" => {
                if let Some(v) = int(value) {
                    self.mouse.sensitivity = v;
                }
            }
            "mouse.deadzone" => {
                if let Some(v) = int(value) {
                    self.mouse.deadzone = v;
                }
            }
            "mouse.wheel.deadzone" => {
                if let Some(v) = int(value) {
                    self.mouse.wheel_deadzone = v;
                }
            }
            "nubs.left.x" => self.left_x = AxisMode::parse(value),
            "nubs.left.y" => self.left_y = AxisMode::parse(value),
            "nubs.right.x" => self.right_x = AxisMode::parse(value),
            "nubs.right.y" => self.right_y = AxisMode::parse(value),
            "nubs.left.click" => self.left_click = ClickMode::parse(value),
            "nubs.right.click" => self.right_click = ClickMode::parse(value),
            _ => tracing::warn!(key, "Unknown setting in config file"),
        }
    }
}

// ============================================================================
// Pointer worker
// ============================================================================

/// State shared between the dispatch thread and the pointer worker.
///
/// Any use of `device` happens with the mutex held.
#[derive(Default)]
struct MouseState {
    device: Option<Box<dyn EventSink>>,
    dx: i32,
    dy: i32,
    dwx: i32,
    dwy: i32,
    stop: bool,
}

/// Whether `d` lies outside `deadzone`, without overflowing on `i32::MIN`.
fn beyond(d: i32, deadzone: i32) -> bool {
    i64::from(d).abs() > i64::from(deadzone)
}

impl MouseState {
    fn moving(&self, tuning: &MouseTuning) -> bool {
        beyond(self.dx, tuning.deadzone)
            || beyond(self.dy, tuning.deadzone)
            || beyond(self.dwx, tuning.wheel_deadzone)
            || beyond(self.dwy, tuning.wheel_deadzone)
    }

    /// Emits one step of pointer/wheel motion.
    fn step(&mut self, tuning: &MouseTuning) {
        // Widened so that large sensitivities cannot overflow.
        let pointer = |d: i32| -> i32 {
            let d = i64::from(d);
            let deadzone = i64::from(tuning.deadzone);
            let past = if d > 0 { d - deadzone } else { d + deadzone };
            let scaled = past * i64::from(tuning.sensitivity) / 1000;
            scaled.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
        };
        let wheel = |d: i32| -> i32 {
            if d > tuning.wheel_deadzone {
                1
            } else if d < tuning.wheel_deadzone.saturating_neg() {
                -1
            } else {
                0
            }
        };

        let (dx, dy, dwx, dwy) = (self.dx, self.dy, self.dwx, self.dwy);
        let Some(device) = self.device.as_mut() else {
            return;
        };

        if beyond(dx, tuning.deadzone) {
            device.send(codes::EV_REL, codes::REL_X, pointer(dx));
        }
        if beyond(dy, tuning.deadzone) {
            device.send(codes::EV_REL, codes::REL_Y, pointer(dy));
        }
        match wheel(dwx) {
            0 => {}
            step => {
                device.send(codes::EV_REL, codes::REL_HWHEEL, step);
            }
        }
        // Pushing the nub down scrolls down.
        match wheel(dwy) {
            0 => {}
            step => {
                device.send(codes::EV_REL, codes::REL_WHEEL, -step);
            }
        }
        device.sync();
    }
}

struct Mouse {
    state: Mutex<MouseState>,
    signal: Condvar,
}

fn run_mouse(mouse: Arc<Mouse>, tuning: MouseTuning) {
    tracing::debug!("Mouse worker started");
    let Ok(mut state) = mouse.state.lock() else {
        return;
    };
    loop {
        if state.stop {
            break;
        }
        if state.moving(&tuning) {
            state.step(&tuning);
            drop(state);
            thread::sleep(MOUSE_INTERVAL);
        } else {
            state = match mouse.signal.wait(state) {
                Ok(s) => s,
                Err(_) => return,
            };
            continue;
        }
        state = match mouse.state.lock() {
            Ok(s) => s,
            Err(_) => return,
        };
    }
    tracing::debug!("Mouse worker stopped");
}

// ============================================================================
// Module
// ============================================================================

pub struct ModalGamepad {
    sinks: SinkFactory,
    settings: Settings,
    gamepad: Option<Box<dyn EventSink>>,
    mouse: Arc<Mouse>,
    worker: Option<JoinHandle<()>>,
}

impl ModalGamepad {
    pub fn new(sinks: SinkFactory) -> Self {
        Self {
            sinks,
            settings: Settings::default(),
            gamepad: None,
            mouse: Arc::new(Mouse {
                state: Mutex::new(MouseState::default()),
                signal: Condvar::new(),
            }),
            worker: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn gamepad_spec() -> DeviceSpec {
        DeviceSpec::usb(
            GAMEPAD_NAME,
            vec![
                Capability::new(
                    codes::EV_KEY,
                    [
                        codes::BTN_SOUTH,
                        codes::BTN_EAST,
                        codes::BTN_NORTH,
                        codes::BTN_WEST,
                        codes::BTN_TL,
                        codes::BTN_TR,
                        codes::BTN_TL2,
                        codes::BTN_TR2,
                        codes::BTN_SELECT,
                        codes::BTN_START,
                        codes::BTN_MODE,
                        codes::BTN_DPAD_UP,
                        codes::BTN_DPAD_DOWN,
                        codes::BTN_DPAD_LEFT,
                        codes::BTN_DPAD_RIGHT,
                        codes::BTN_THUMBL,
                        codes::BTN_THUMBR,
                    ],
                ),
                Capability::new(
                    codes::EV_ABS,
                    [codes::ABS_X, codes::ABS_Y, codes::ABS_RX, codes::ABS_RY],
                ),
            ],
        )
    }

    fn mouse_spec() -> DeviceSpec {
        DeviceSpec::usb(
            MOUSE_NAME,
            vec![
                Capability::new(codes::EV_KEY, [codes::BTN_LEFT, codes::BTN_RIGHT]),
                Capability::new(
                    codes::EV_REL,
                    [codes::REL_X, codes::REL_Y, codes::REL_HWHEEL, codes::REL_WHEEL],
                ),
            ],
        )
    }

    fn gamepad_send(&mut self, kind: u16, code: u16, value: i32) {
        if let Some(gamepad) = self.gamepad.as_mut() {
            gamepad.send(kind, code, value);
            gamepad.sync();
        }
    }

    /// Updates one shared pointer delta and wakes the worker if it left the deadzone.
    fn set_delta(&self, value: i32, field: impl FnOnce(&mut MouseState) -> &mut i32) {
        let Ok(mut state) = self.mouse.state.lock() else {
            return;
        };
        *field(&mut *state) = value;
        if state.moving(&self.settings.mouse) {
            self.mouse.signal.notify_all();
        }
    }

    fn handle_axis(&mut self, mode: AxisMode, value: i32) {
        match mode {
            AxisMode::MouseX => self.set_delta(value, |s| &mut s.dx),
            AxisMode::MouseY => self.set_delta(value, |s| &mut s.dy),
            AxisMode::ScrollX => self.set_delta(value, |s| &mut s.dwx),
            AxisMode::ScrollY => self.set_delta(value, |s| &mut s.dwy),
            AxisMode::LeftJoystickX => self.gamepad_send(codes::EV_ABS, codes::ABS_X, value),
            AxisMode::LeftJoystickY => self.gamepad_send(codes::EV_ABS, codes::ABS_Y, value),
            AxisMode::RightJoystickX => self.gamepad_send(codes::EV_ABS, codes::ABS_RX, value),
            AxisMode::RightJoystickY => self.gamepad_send(codes::EV_ABS, codes::ABS_RY, value),
            AxisMode::Unknown => {}
        }
    }

    fn mouse_button(&self, button: u16, value: i32) {
        let Ok(mut state) = self.mouse.state.lock() else {
            return;
        };
        if let Some(device) = state.device.as_mut() {
            device.send(codes::EV_KEY, button, value);
            device.sync();
        }
    }

    fn handle_click(&mut self, mode: ClickMode, value: i32) {
        match mode {
            ClickMode::MouseLeft => self.mouse_button(codes::BTN_LEFT, value),
            ClickMode::MouseRight => self.mouse_button(codes::BTN_RIGHT, value),
            ClickMode::NubClickLeft => self.gamepad_send(codes::EV_KEY, codes::BTN_THUMBL, value),
            ClickMode::NubClickRight => self.gamepad_send(codes::EV_KEY, codes::BTN_THUMBR, value),
            ClickMode::Unknown => {}
        }
    }
}

impl Plugin for ModalGamepad {
    fn name(&self) -> &str {
        NAME
    }

    fn init(&mut self, args: &[String]) {
        self.settings.apply_args(args);
        if let Some(path) = self.settings.config_file.clone() {
            if let Err(e) = self.settings.load_file(&path) {
                tracing::error!(path = %path.display(), error = %e, "Could not open config file");
            }
        }

        self.gamepad = (self.sinks)(&Self::gamepad_spec());
        let mouse_device = (self.sinks)(&Self::mouse_spec());
        if let Ok(mut state) = self.mouse.state.lock() {
            state.device = mouse_device;
            state.stop = false;
        }

        let mouse = Arc::clone(&self.mouse);
        let tuning = self.settings.mouse;
        self.worker = Some(thread::spawn(move || run_mouse(mouse, tuning)));
        tracing::info!(settings = ?self.settings, "Modal gamepad initialized");
    }

    fn handle(&mut self, event: &InputEvent, _role: Role) {
        match (event.kind, event.code) {
            (codes::EV_ABS, codes::ABS_X) => self.handle_axis(self.settings.left_x, event.value),
            (codes::EV_ABS, codes::ABS_Y) => self.handle_axis(self.settings.left_y, event.value),
            (codes::EV_ABS, codes::ABS_RX) => self.handle_axis(self.settings.right_x, event.value),
            (codes::EV_ABS, codes::ABS_RY) => self.handle_axis(self.settings.right_y, event.value),
            (codes::EV_KEY, codes::BTN_THUMBL) => {
                self.handle_click(self.settings.left_click, event.value)
            }
            (codes::EV_KEY, codes::BTN_THUMBR) => {
                self.handle_click(self.settings.right_click, event.value)
            }
            _ => {}
        }
    }

    fn destroy(&mut self) {
        if let Ok(mut state) = self.mouse.state.lock() {
            state.stop = true;
        }
        self.mouse.signal.notify_all();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("Mouse worker panicked");
            }
        }

        if let Ok(mut state) = self.mouse.state.lock() {
            state.device = None;
        }
        self.gamepad = None;
    }
}
