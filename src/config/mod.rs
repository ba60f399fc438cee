use serde::{Deserialize, Serialize};
use std::env;

/// Container configuration.
///
/// Every field has a default, so partial JSON documents are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Log every module registration at `info` instead of `debug`.
    pub debug: bool,
    /// Treat several `#[inject]` constructors on one type as an error instead of
    /// picking the first.
    pub strict_constructors: bool,
    /// Let `register_all` skip failing types instead of aborting.
    pub continue_on_failure: bool,
}

impl ContainerConfig {
    pub const ENV_PREFIX: &'static str = "QUILL_";

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Read `QUILL_DEBUG`, `QUILL_STRICT_CONSTRUCTORS` and
    /// `QUILL_CONTINUE_ON_FAILURE` on top of the defaults.
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(Self::ENV_PREFIX) else {
                continue;
            };
            let Some(flag) = parse_flag(value.as_ref()) else {
                tracing::warn!("Ignoring {}{}: not a boolean", Self::ENV_PREFIX, name);
                continue;
            };
            match name {
                "DEBUG" => config.debug = flag,
                "STRICT_CONSTRUCTORS" => config.strict_constructors = flag,
                "CONTINUE_ON_FAILURE" => config.continue_on_failure = flag,
                _ => {}
            }
        }
        config
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
