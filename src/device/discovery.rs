//! Input device discovery from `/proc/bus/input/devices`.
//!
//! The descriptor file is a sequence of blank-line separated records, e.g.
//!
//! ```text
//! I: Bus=0011 Vendor=0001 Product=0001 Version=ab41
//! N: Name="AT Translated Set 2 keyboard"
//! P: Phys=isa0060/serio0/input0
//! H: Handlers=sysrq kbd event3 leds
//! ```
//!
//! Only the `I:`, `N:` and `H:` lines are interpreted.

use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Kernel-provided list of input devices.
pub const DEVICES_PATH: &str = "/proc/bus/input/devices";

/// Directory holding the evdev nodes named by `H: Handlers=`.
pub const DEVICE_DIR: &str = "/dev/input";

/// One discoverable input device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub bus: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
    pub name: String,
    /// Path of the evdev node (`/dev/input/eventN`).
    pub path: PathBuf,
}

/// Lists the devices the kernel currently knows about.
pub fn list_available() -> io::Result<Vec<DeviceInfo>> {
    let file = File::open(DEVICES_PATH)?;
    Ok(parse_devices(BufReader::new(file), Path::new(DEVICE_DIR)))
}

/// Parses a descriptor stream into device records.
///
/// Records without an `eventN` handler are dropped; malformed fields are
/// left at their defaults.
pub fn parse_devices(reader: impl BufRead, device_dir: &Path) -> Vec<DeviceInfo> {
    let mut devices = Vec::new();
    let mut current = DeviceInfo::default();
    let mut node: Option<String> = None;

    let mut finish = |info: &mut DeviceInfo, node: &mut Option<String>| {
        if let Some(n) = node.take() {
            info.path = device_dir.join(n);
            devices.push(std::mem::take(info));
        } else {
            *info = DeviceInfo::default();
        }
    };

    for line in reader.lines().map_while(Result::ok) {
        let line = line.trim_end();
        if line.is_empty() {
            finish(&mut current, &mut node);
            continue;
        }

        if let Some(rest) = line.strip_prefix("I:") {
            parse_identity(rest, &mut current);
        } else if let Some(rest) = line.strip_prefix("N:") {
            current.name = parse_name(rest);
        } else if let Some(rest) = line.strip_prefix("H:") {
            node = parse_event_node(rest);
        }
    }
    finish(&mut current, &mut node);

    devices
}

fn parse_identity(fields: &str, info: &mut DeviceInfo) {
    for field in fields.split_whitespace() {
        let Some((key, value)) = field.split_once('=') else {
            continue;
        };
        let Ok(value) = u16::from_str_radix(value, 16) else {
            continue;
        };
        match key {
            "Bus" => info.bus = value,
            "Vendor" => info.vendor = value,
            "Product" => info.product = value,
            "Version" => info.version = value,
            _ => {}
        }
    }
}

fn parse_name(rest: &str) -> String {
    let value = rest.trim().strip_prefix("Name=").unwrap_or(rest.trim());
    value.trim_matches('"').to_string()
}

fn parse_event_node(rest: &str) -> Option<String> {
    let handlers = rest.trim().strip_prefix("Handlers=")?;
    handlers
        .split_whitespace()
        .find(|h| {
            h.strip_prefix("event")
                .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        })
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
I: Bus=0019 Vendor=0000 Product=0001 Version=0000
N: Name=\"Power Button\"
P: Phys=PNP0C0C/button/input0
S: Sysfs=/devices/LNXSYSTM:00/input/input0
H: Handlers=kbd event0
B: EV=3

I: Bus=0011 Vendor=0001 Product=0001 Version=ab41
N: Name=\"AT Translated Set 2 keyboard\"
H: Handlers=sysrq kbd event3 leds

I: Bus=0003 Vendor=046d Product=c52b Version=0111
N: Name=\"Logitech Receiver\"
H: Handlers=mouse0
";

    #[test]
    fn test_parses_records_with_event_nodes() {
        let devices = parse_devices(SAMPLE.as_bytes(), Path::new("/dev/input"));
        assert_eq!(devices.len(), 2);

        assert_eq!(devices[0].name, "Power Button");
        assert_eq!(devices[0].bus, 0x19);
        assert_eq!(devices[0].path, PathBuf::from("/dev/input/event0"));

        let keyboard = &devices[1];
        assert_eq!(keyboard.name, "AT Translated Set 2 keyboard");
        assert_eq!(keyboard.bus, 0x11);
        assert_eq!(keyboard.vendor, 0x1);
        assert_eq!(keyboard.product, 0x1);
        assert_eq!(keyboard.version, 0xab41);
        assert_eq!(keyboard.path, PathBuf::from("/dev/input/event3"));
    }

    #[test]
    fn test_record_without_event_node_is_dropped() {
        let devices = parse_devices(SAMPLE.as_bytes(), Path::new("/dev/input"));
        assert!(devices.iter().all(|d| d.name != "Logitech Receiver"));
    }

    #[test]
    fn test_fields_do_not_leak_between_records() {
        let input = "\
I: Bus=0003 Vendor=1234 Product=5678 Version=0001
N: Name=\"No Handler\"

N: Name=\"Bare\"
H: Handlers=event7
";
        let devices = parse_devices(input.as_bytes(), Path::new("/dev/input"));
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "Bare");
        assert_eq!(devices[0].vendor, 0);
        assert_eq!(devices[0].path, PathBuf::from("/dev/input/event7"));
    }

    #[test]
    fn test_handler_prefix_must_be_event_node() {
        assert_eq!(parse_event_node(" Handlers=eventful kbd"), None);
        assert_eq!(
            parse_event_node(" Handlers=kbd event12"),
            Some("event12".to_string())
        );
    }
}
