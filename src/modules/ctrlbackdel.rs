//! Turns Ctrl+Backspace into a plain Delete.
//!
//! Left-ctrl is released around the synthetic Delete so applications do not
//! see Ctrl+Delete. Every other event, including sync, is passed through.

use crate::device::{codes, InputEvent, Role};
use crate::output::{Capability, DeviceSpec, EventSink, SinkFactory};
use crate::plugin::Plugin;

pub const NAME: &str = "ctrlbackdel";

pub fn create(sinks: SinkFactory) -> Box<dyn Plugin> {
    Box::new(CtrlBackDel::new(sinks))
}

pub struct CtrlBackDel {
    sinks: SinkFactory,
    out: Option<Box<dyn EventSink>>,
    left_ctrl_down: bool,
}

impl CtrlBackDel {
    pub fn new(sinks: SinkFactory) -> Self {
        Self {
            sinks,
            out: None,
            left_ctrl_down: false,
        }
    }
}

impl Plugin for CtrlBackDel {
    fn name(&self) -> &str {
        NAME
    }

    fn init(&mut self, _args: &[String]) {
        let spec = DeviceSpec::usb(
            "FunKeyCtrlBackDel",
            vec![Capability::new(
                codes::EV_KEY,
                codes::KEY_RESERVED..=codes::KEY_UNKNOWN,
            )],
        );
        self.out = (self.sinks)(&spec);
    }

    fn handle(&mut self, event: &InputEvent, _role: Role) {
        let Some(out) = self.out.as_mut() else {
            return;
        };

        if !event.is_key() {
            if event.kind == codes::EV_SYN {
                out.emit(*event);
            }
            return;
        }

        if event.code == codes::KEY_LEFTCTRL {
            self.left_ctrl_down = event.value != 0;
        } else if event.code == codes::KEY_BACKSPACE && self.left_ctrl_down {
            if event.value != 0 {
                out.send(codes::EV_KEY, codes::KEY_LEFTCTRL, 0);
                out.sync();
                out.send(codes::EV_KEY, codes::KEY_DELETE, 1);
            } else {
                out.send(codes::EV_KEY, codes::KEY_DELETE, 0);
                out.sync();
                out.send(codes::EV_KEY, codes::KEY_LEFTCTRL, 1);
            }
            return;
        }

        out.emit(*event);
    }

    fn destroy(&mut self) {
        self.out = None;
    }
}
