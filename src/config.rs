//! Runtime configuration.
//!
//! An optional JSON file provides defaults; command-line [`Overrides`] are
//! layered on top of it with [`Config::merge`].

use crate::device::{Role, DEFAULT_POLL_TIMEOUT};
use crate::dispatch::DEFAULT_CONTROL_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Module used when neither the file nor the command line names one.
pub const DEFAULT_MODULE: &str = "builtin:echo";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config '{}': {reason}", path.display())]
    Invalid { path: PathBuf, reason: &'static str },

    #[error("invalid input '{0}', expected PATH[:ROLE]")]
    Input(String),
}

/// Values given on the command line, layered over the file config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `PATH[:ROLE]` strings.
    pub inputs: Vec<String>,
    pub module: Option<String>,
    pub module_args: Vec<String>,
    pub grab: bool,
}

/// One input device and the role its events are tagged with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub role: Role,
}

impl InputConfig {
    /// Parses `PATH` or `PATH:ROLE`. A suffix that is not a number is part of
    /// the path.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        if s.is_empty() {
            return Err(ConfigError::Input(s.to_string()));
        }

        if let Some((path, role)) = s.rsplit_once(':') {
            if let Ok(role) = role.parse::<Role>() {
                if path.is_empty() {
                    return Err(ConfigError::Input(s.to_string()));
                }
                return Ok(Self {
                    path: PathBuf::from(path),
                    role,
                });
            }
        }

        Ok(Self {
            path: PathBuf::from(s),
            role: 0,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub inputs: Vec<InputConfig>,
    /// `builtin:<name>` or a path to a shared library.
    pub module: String,
    pub module_args: Vec<String>,
    /// Grab the inputs for exclusive access.
    pub grab: bool,
    pub poll_timeout_ms: u64,
    pub control_queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            module: DEFAULT_MODULE.to_string(),
            module_args: Vec::new(),
            grab: false,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT.as_millis() as u64,
            control_queue_capacity: DEFAULT_CONTROL_CAPACITY,
        }
    }
}

impl Config {
    /// Returns the default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("funkeymonkey")
            .join("config.json")
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        // A zero timeout would turn the dispatch loop into a busy spin.
        if config.poll_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                reason: "poll_timeout_ms must be at least 1",
            });
        }
        Ok(config)
    }

    /// Loads `explicit` if given, else the default file if it exists, else
    /// the built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let path = Self::default_path();
        if path.exists() {
            tracing::debug!(path = %path.display(), "Loading default config");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms.max(1))
    }

    /// Inputs and module args extend the file's lists, a module replaces
    /// the file's, and `grab` can only switch grabbing on.
    pub fn merge(mut self, overrides: &Overrides) -> Result<Self, ConfigError> {
        for input in &overrides.inputs {
            self.inputs.push(InputConfig::parse(input)?);
        }
        if let Some(module) = &overrides.module {
            self.module = module.clone();
        }
        self.module_args.extend(overrides.module_args.iter().cloned());
        self.grab |= overrides.grab;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_input_with_and_without_role() {
        assert_eq!(
            InputConfig::parse("/dev/input/event3:2").unwrap(),
            InputConfig {
                path: "/dev/input/event3".into(),
                role: 2
            }
        );
        assert_eq!(
            InputConfig::parse("/dev/input/event3").unwrap().role,
            0
        );
        assert_eq!(
            InputConfig::parse("/tmp/odd:name").unwrap().path,
            PathBuf::from("/tmp/odd:name")
        );
        assert!(InputConfig::parse("").is_err());
        assert!(InputConfig::parse(":4").is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"inputs": [{{"path": "/dev/input/event1", "role": 1}}, {{"path": "/dev/input/event2"}}], "grab": true}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.inputs.len(), 2);
        assert_eq!(config.inputs[1].role, 0);
        assert!(config.grab);
        assert_eq!(config.module, DEFAULT_MODULE);
        assert_eq!(config.poll_timeout(), DEFAULT_POLL_TIMEOUT);
        assert_eq!(config.control_queue_capacity, DEFAULT_CONTROL_CAPACITY);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            Config::load(&missing),
            Err(ConfigError::Io { .. })
        ));
        assert!(matches!(
            Config::resolve(Some(&missing)),
            Err(ConfigError::Io { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        let err = Config::load(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_zero_poll_timeout_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"poll_timeout_ms": 0}"#).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("poll_timeout_ms"));

        let config = Config {
            poll_timeout_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.poll_timeout(), Duration::from_millis(1));
    }

    #[test]
    fn test_overrides_extend_lists_and_replace_module() {
        let file = Config {
            inputs: vec![InputConfig::parse("/dev/input/event1:1").unwrap()],
            module: "builtin:keyboard".to_string(),
            module_args: vec!["a".to_string()],
            grab: true,
            ..Config::default()
        };
        let overrides = Overrides {
            inputs: vec!["/dev/input/event2:2".to_string()],
            module: Some("builtin:toy".to_string()),
            module_args: vec!["b".to_string()],
            grab: false,
        };

        let merged = file.merge(&overrides).unwrap();
        let roles: Vec<Role> = merged.inputs.iter().map(|i| i.role).collect();
        assert_eq!(roles, vec![1, 2]);
        assert_eq!(merged.module, "builtin:toy");
        assert_eq!(merged.module_args, vec!["a", "b"]);
        assert!(merged.grab, "absent --grab must not switch grabbing off");
    }

    #[test]
    fn test_empty_overrides_keep_file_values() {
        let merged = Config::default().merge(&Overrides::default()).unwrap();
        assert_eq!(merged, Config::default());

        let grabbed = Config::default()
            .merge(&Overrides {
                grab: true,
                ..Overrides::default()
            })
            .unwrap();
        assert!(grabbed.grab);

        let bad = Config::default().merge(&Overrides {
            inputs: vec![String::new()],
            ..Overrides::default()
        });
        assert!(matches!(bad, Err(ConfigError::Input(_))));
    }

    #[test]
    fn test_default_path_is_under_app_dir() {
        let path = Config::default_path();
        assert!(path.ends_with("funkeymonkey/config.json"));
    }
}
