//! 8bitdo SNES gamepad to keyboard, laid out for Cave Story.
//!
//! Start and select open the menu; inside it start resumes (F1) and select
//! restarts (F2). The d-pad reports each axis as 128 when centered, 255 for
//! right/down and anything else for left/up.

use crate::device::{codes, InputEvent, Role};
use crate::output::{Capability, DeviceSpec, EventSink, SinkFactory};
use crate::plugin::Plugin;

pub const NAME: &str = "cavestorysnes";

const DEVICE_NAME: &str = "FunKeySNES";

const AXIS_CENTER: i32 = 128;
const AXIS_HIGH: i32 = 255;

pub fn create(sinks: SinkFactory) -> Box<dyn Plugin> {
    Box::new(CaveStorySnes::new(sinks))
}

pub struct CaveStorySnes {
    sinks: SinkFactory,
    out: Option<Box<dyn EventSink>>,
    menu: bool,
}

impl CaveStorySnes {
    pub fn new(sinks: SinkFactory) -> Self {
        Self {
            sinks,
            out: None,
            menu: false,
        }
    }

    pub fn in_menu(&self) -> bool {
        self.menu
    }

    /// Key for a face, shoulder or menu button.
    fn button_key(&self, code: u16) -> Option<u16> {
        let key = match code {
            codes::BTN_THUMB => codes::KEY_W,    // A: map
            codes::BTN_THUMB2 => codes::KEY_Z,   // B: jump
            codes::BTN_TRIGGER => codes::KEY_Q,  // X: inventory
            codes::BTN_TOP => codes::KEY_X,      // Y: shoot
            codes::BTN_TOP2 => codes::KEY_A,     // L: previous gun
            codes::BTN_PINKIE => codes::KEY_S,   // R: next gun
            codes::BTN_BASE2 if self.menu => codes::KEY_F1,
            codes::BTN_BASE if self.menu => codes::KEY_F2,
            codes::BTN_BASE | codes::BTN_BASE2 => codes::KEY_ESC,
            _ => return None,
        };
        Some(key)
    }

    fn handle_button(&mut self, code: u16, value: i32) {
        let key = self.button_key(code);
        if matches!(code, codes::BTN_BASE | codes::BTN_BASE2) && value == 0 {
            self.menu = !self.menu;
            tracing::debug!(menu = self.menu, "Menu toggled");
        }

        if let (Some(key), Some(out)) = (key, self.out.as_mut()) {
            out.send(codes::EV_KEY, key, i32::from(value != 0));
            out.sync();
        }
    }

    /// Presses `high` or `low` (releasing the other) or releases both when centered.
    fn handle_axis(&mut self, value: i32, low: u16, high: u16) {
        let Some(out) = self.out.as_mut() else {
            return;
        };
        match value {
            AXIS_CENTER => {
                out.send(codes::EV_KEY, high, 0);
                out.send(codes::EV_KEY, low, 0);
            }
            AXIS_HIGH => {
                out.send(codes::EV_KEY, low, 0);
                out.send(codes::EV_KEY, high, 1);
            }
            _ => {
                out.send(codes::EV_KEY, high, 0);
                out.send(codes::EV_KEY, low, 1);
            }
        }
        out.sync();
    }
}

impl Plugin for CaveStorySnes {
    fn name(&self) -> &str {
        NAME
    }

    fn init(&mut self, _args: &[String]) {
        self.menu = false;
        let spec = DeviceSpec::usb(
            DEVICE_NAME,
            vec![Capability::new(
                codes::EV_KEY,
                [
                    codes::KEY_Q,
                    codes::KEY_W,
                    codes::KEY_A,
                    codes::KEY_S,
                    codes::KEY_Z,
                    codes::KEY_X,
                    codes::KEY_UP,
                    codes::KEY_DOWN,
                    codes::KEY_RIGHT,
                    codes::KEY_LEFT,
                    codes::KEY_ESC,
                    codes::KEY_F1,
                    codes::KEY_F2,
                ],
            )],
        );
        self.out = (self.sinks)(&spec);
    }

    fn handle(&mut self, event: &InputEvent, _role: Role) {
        match (event.kind, event.code) {
            (codes::EV_KEY, code) => self.handle_button(code, event.value),
            (codes::EV_ABS, codes::ABS_X) => {
                self.handle_axis(event.value, codes::KEY_LEFT, codes::KEY_RIGHT)
            }
            (codes::EV_ABS, codes::ABS_Y) => {
                self.handle_axis(event.value, codes::KEY_UP, codes::KEY_DOWN)
            }
            _ => {}
        }
    }

    fn destroy(&mut self) {
        self.out = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing::{recording_factory, Recording};

    fn key(code: u16, value: i32) -> InputEvent {
        InputEvent::new(codes::EV_KEY, code, value)
    }

    fn module() -> (CaveStorySnes, Recording) {
        let (factory, recording) = recording_factory();
        let mut m = CaveStorySnes::new(factory);
        m.init(&[]);
        (m, recording)
    }

    #[test]
    fn test_face_buttons_map_to_keys() {
        let (mut m, recording) = module();
        m.handle(&key(codes::BTN_THUMB2, 1), 0);
        m.handle(&key(codes::BTN_THUMB2, 0), 0);

        assert_eq!(
            recording.events_for(DEVICE_NAME),
            vec![
                key(codes::KEY_Z, 1),
                InputEvent::sync(),
                key(codes::KEY_Z, 0),
                InputEvent::sync(),
            ]
        );
    }

    #[test]
    fn test_start_release_toggles_menu() {
        let (mut m, recording) = module();

        m.handle(&key(codes::BTN_BASE2, 1), 0);
        assert!(!m.in_menu());
        m.handle(&key(codes::BTN_BASE2, 0), 0);
        assert!(m.in_menu());

        // Inside the menu start resumes, select restarts.
        m.handle(&key(codes::BTN_BASE, 1), 0);
        m.handle(&key(codes::BTN_BASE, 0), 0);
        assert!(!m.in_menu());

        let keys: Vec<InputEvent> = recording
            .all()
            .into_iter()
            .filter(|e| e.is_key())
            .collect();
        assert_eq!(
            keys,
            vec![
                key(codes::KEY_ESC, 1),
                key(codes::KEY_ESC, 0),
                key(codes::KEY_F2, 1),
                key(codes::KEY_F2, 0),
            ]
        );
    }

    #[test]
    fn test_start_in_menu_resumes() {
        let (mut m, recording) = module();
        m.handle(&key(codes::BTN_BASE, 0), 0);
        assert!(m.in_menu());
        recording.clear();

        m.handle(&key(codes::BTN_BASE2, 1), 0);
        assert_eq!(recording.all()[0], key(codes::KEY_F1, 1));
    }

    #[test]
    fn test_dpad_axis_states() {
        let (mut m, recording) = module();
        let abs_x = |value| InputEvent::new(codes::EV_ABS, codes::ABS_X, value);

        m.handle(&abs_x(255), 0);
        m.handle(&abs_x(0), 0);
        m.handle(&abs_x(128), 0);

        assert_eq!(
            recording.all(),
            vec![
                key(codes::KEY_LEFT, 0),
                key(codes::KEY_RIGHT, 1),
                InputEvent::sync(),
                key(codes::KEY_RIGHT, 0),
                key(codes::KEY_LEFT, 1),
                InputEvent::sync(),
                key(codes::KEY_RIGHT, 0),
                key(codes::KEY_LEFT, 0),
                InputEvent::sync(),
            ]
        );
    }

    #[test]
    fn test_vertical_axis_and_unmapped_buttons() {
        let (mut m, recording) = module();
        m.handle(&InputEvent::new(codes::EV_ABS, codes::ABS_Y, 255), 0);
        m.handle(&key(codes::BTN_SOUTH, 1), 0);

        assert_eq!(
            recording.all(),
            vec![
                key(codes::KEY_UP, 0),
                key(codes::KEY_DOWN, 1),
                InputEvent::sync(),
            ]
        );
    }
}
