use serde::Serialize;
use strum_macros::{AsRefStr, Display};

/// Container lifecycle.
///
/// ```text
/// Uninitialized --register--> Active --shutdown()--> ShuttingDown --> Terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    Uninitialized,
    Active,
    ShuttingDown,
    Terminated,
}

impl ContainerState {
    /// Whether `register_*` and `get_*` calls are still accepted.
    pub fn is_open(&self) -> bool {
        matches!(self, ContainerState::Uninitialized | ContainerState::Active)
    }
}
