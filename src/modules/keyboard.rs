//! Per-key keyboard remapping.
//!
//! Every key in `KEY_RESERVED..=KEY_UNKNOWN` has a [`KeyBehavior`]:
//! pass through, map to another key, map to one of two keys depending on the
//! alternate layer, or run arbitrary code. `user1` toggles the alternate
//! layer and `user2` switches it off.

use crate::device::{codes, InputEvent, Role};
use crate::output::{Capability, DeviceSpec, EventSink, SinkFactory};
use crate::plugin::Plugin;

pub const NAME: &str = "keyboard";

const FIRST_KEY: u16 = codes::KEY_RESERVED;
const LAST_KEY: u16 = codes::KEY_UNKNOWN;
const NUM_KEYS: usize = (LAST_KEY - FIRST_KEY) as usize + 1;

pub fn create(sinks: SinkFactory) -> Box<dyn Plugin> {
    Box::new(Keyboard::new(sinks, KeyBehaviors::example()))
}

type ComplexFn = Box<dyn Fn(&mut dyn EventSink, i32) + Send>;

/// What a single physical key does.
pub enum KeyBehavior {
    Passthrough,
    Mapped(u16),
    AltMapped {
        regular: u16,
        alternative: u16,
    },
    Complex(ComplexFn),
}

/// Behavior table indexed by key code.
pub struct KeyBehaviors {
    behaviors: Vec<KeyBehavior>,
}

impl KeyBehaviors {
    /// Every key passes through unchanged.
    pub fn new() -> Self {
        Self {
            behaviors: (0..NUM_KEYS).map(|_| KeyBehavior::Passthrough).collect(),
        }
    }

    /// K types L, O types I then O, and WASD become arrows on the alternate layer.
    pub fn example() -> Self {
        let mut behaviors = Self::new();
        behaviors.map(codes::KEY_K, codes::KEY_L);
        behaviors.complex(codes::KEY_O, |out, value| {
            out.send(codes::EV_KEY, codes::KEY_I, value);
            out.send(codes::EV_KEY, codes::KEY_O, value);
        });
        behaviors.altmap(codes::KEY_W, codes::KEY_W, codes::KEY_UP);
        behaviors.altmap(codes::KEY_A, codes::KEY_A, codes::KEY_LEFT);
        behaviors.altmap(codes::KEY_S, codes::KEY_S, codes::KEY_DOWN);
        behaviors.altmap(codes::KEY_D, codes::KEY_D, codes::KEY_RIGHT);
        behaviors
    }

    fn slot(&mut self, code: u16) -> Option<&mut KeyBehavior> {
        self.behaviors.get_mut(code.checked_sub(FIRST_KEY)? as usize)
    }

    fn set(&mut self, code: u16, behavior: KeyBehavior) {
        match self.slot(code) {
            Some(slot) => *slot = behavior,
            None => tracing::warn!(code, "Key code outside remappable range"),
        }
    }

    pub fn passthrough(&mut self, code: u16) {
        self.set(code, KeyBehavior::Passthrough);
    }

    pub fn map(&mut self, code: u16, result: u16) {
        self.set(code, KeyBehavior::Mapped(result));
    }

    pub fn altmap(&mut self, code: u16, regular: u16, alternative: u16) {
        self.set(
            code,
            KeyBehavior::AltMapped {
                regular,
                alternative,
            },
        );
    }

    pub fn complex(&mut self, code: u16, f: impl Fn(&mut dyn EventSink, i32) + Send + 'static) {
        self.set(code, KeyBehavior::Complex(Box::new(f)));
    }

    /// Emits whatever `code` is configured to produce. Returns false for
    /// codes outside the table.
    pub fn handle(&self, out: &mut dyn EventSink, code: u16, value: i32, alternate: bool) -> bool {
        let Some(behavior) = code
            .checked_sub(FIRST_KEY)
            .and_then(|i| self.behaviors.get(i as usize))
        else {
            return false;
        };

        match behavior {
            KeyBehavior::Passthrough => {
                out.send(codes::EV_KEY, code, value);
            }
            KeyBehavior::Mapped(mapping) => {
                out.send(codes::EV_KEY, *mapping, value);
            }
            KeyBehavior::AltMapped {
                regular,
                alternative,
            } => {
                let target = if alternate { *alternative } else { *regular };
                out.send(codes::EV_KEY, target, value);
            }
            KeyBehavior::Complex(f) => f(out, value),
        }
        true
    }
}

impl Default for KeyBehaviors {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Keyboard {
    sinks: SinkFactory,
    out: Option<Box<dyn EventSink>>,
    behaviors: KeyBehaviors,
    alternate: bool,
}

impl Keyboard {
    pub fn new(sinks: SinkFactory, behaviors: KeyBehaviors) -> Self {
        Self {
            sinks,
            out: None,
            behaviors,
            alternate: false,
        }
    }

    pub fn alternate(&self) -> bool {
        self.alternate
    }
}

impl Plugin for Keyboard {
    fn name(&self) -> &str {
        NAME
    }

    fn init(&mut self, _args: &[String]) {
        let spec = DeviceSpec::usb(
            "FunKeyMonkey keyboard",
            vec![Capability::new(codes::EV_KEY, FIRST_KEY..=LAST_KEY)],
        );
        self.out = (self.sinks)(&spec);
    }

    fn handle(&mut self, event: &InputEvent, _role: Role) {
        if !event.is_key() {
            return;
        }
        let Some(out) = self.out.as_mut() else {
            return;
        };

        if self
            .behaviors
            .handle(&mut **out, event.code, event.value, self.alternate)
        {
            out.sync();
        } else {
            tracing::trace!(code = event.code, "Ignoring key outside remappable range");
        }
    }

    fn user1(&mut self) {
        self.alternate = !self.alternate;
        tracing::info!(alternate = self.alternate, "Keyboard layer toggled");
    }

    fn user2(&mut self) {
        self.alternate = false;
        tracing::info!("Keyboard layer reset");
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

    fn keyboard() -> (Keyboard, Recording) {
        let (factory, recording) = recording_factory();
        let mut kb = Keyboard::new(factory, KeyBehaviors::example());
        kb.init(&[]);
        (kb, recording)
    }

    #[test]
    fn test_unmapped_key_passes_through_with_sync() {
        let (mut kb, recording) = keyboard();
        kb.handle(&key(codes::KEY_Q, 1), 0);
        assert_eq!(recording.all(), vec![key(codes::KEY_Q, 1), InputEvent::sync()]);
    }

    #[test]
    fn test_mapped_key() {
        let (mut kb, recording) = keyboard();
        kb.handle(&key(codes::KEY_K, 0), 0);
        assert_eq!(recording.all(), vec![key(codes::KEY_L, 0), InputEvent::sync()]);
    }

    #[test]
    fn test_complex_key_emits_sequence() {
        let (mut kb, recording) = keyboard();
        kb.handle(&key(codes::KEY_O, 1), 0);
        assert_eq!(
            recording.all(),
            vec![key(codes::KEY_I, 1), key(codes::KEY_O, 1), InputEvent::sync()]
        );
    }

    #[test]
    fn test_user1_toggles_alternate_layer() {
        let (mut kb, recording) = keyboard();

        kb.handle(&key(codes::KEY_W, 1), 0);
        kb.user1();
        assert!(kb.alternate());
        kb.handle(&key(codes::KEY_W, 1), 0);
        kb.user2();
        assert!(!kb.alternate());
        kb.handle(&key(codes::KEY_W, 1), 0);

        let keys: Vec<u16> = recording
            .all()
            .into_iter()
            .filter(|e| e.is_key())
            .map(|e| e.code)
            .collect();
        assert_eq!(keys, vec![codes::KEY_W, codes::KEY_UP, codes::KEY_W]);
    }

    #[test]
    fn test_non_key_and_out_of_range_events_are_ignored() {
        let (mut kb, recording) = keyboard();
        kb.handle(&InputEvent::new(codes::EV_REL, codes::REL_X, 3), 0);
        kb.handle(&key(codes::BTN_LEFT, 1), 0);
        assert!(recording.all().is_empty());
    }
}
