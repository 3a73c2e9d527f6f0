//! Toy module: every key release types a `k`.

use crate::device::{codes, InputEvent, Role};
use crate::output::{Capability, DeviceSpec, EventSink, SinkFactory};
use crate::plugin::Plugin;

pub const NAME: &str = "toy";

pub fn create(sinks: SinkFactory) -> Box<dyn Plugin> {
    Box::new(Toy::new(sinks))
}

pub struct Toy {
    sinks: SinkFactory,
    out: Option<Box<dyn EventSink>>,
}

impl Toy {
    pub fn new(sinks: SinkFactory) -> Self {
        Self { sinks, out: None }
    }
}

impl Plugin for Toy {
    fn name(&self) -> &str {
        NAME
    }

    fn init(&mut self, _args: &[String]) {
        let spec = DeviceSpec::usb(
            "FunKeyMonkey Toy",
            vec![Capability::new(codes::EV_KEY, [codes::KEY_K])],
        );
        self.out = (self.sinks)(&spec);
    }

    fn handle(&mut self, event: &InputEvent, _role: Role) {
        let Some(out) = self.out.as_mut() else {
            return;
        };
        if event.is_key() && event.value == 0 {
            out.send(codes::EV_KEY, codes::KEY_K, 1);
            out.send(codes::EV_KEY, codes::KEY_K, 0);
            out.sync();
        }
    }

    fn destroy(&mut self) {
        self.out = None;
    }
}
