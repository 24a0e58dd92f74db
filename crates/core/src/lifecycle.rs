//! Offline worker lifecycle states and events.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Offline worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Constructed, nothing cached yet.
    Parsed,
    /// Pre-caching the asset manifest.
    Installing,
    /// Manifest committed; waiting to activate.
    Installed,
    /// Collecting stale generations.
    Activating,
    /// Controlling clients.
    Activated,
    /// Install failed; this worker version never activates.
    Redundant,
}

impl WorkerState {
    pub fn can_install(&self) -> bool {
        matches!(self, WorkerState::Parsed)
    }

    /// Activation runs after install, and may be repeated once active.
    pub fn can_activate(&self) -> bool {
        matches!(self, WorkerState::Installed | WorkerState::Activated)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Redundant)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Parsed => write!(f, "parsed"),
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Activated => write!(f, "activated"),
            WorkerState::Redundant => write!(f, "redundant"),
        }
    }
}

/// Lifecycle notifications broadcast by the worker to page-side listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerEvent {
    /// The manifest was committed; `skip_waiting` was requested.
    Installed { version: String },
    /// Install failed and nothing was committed.
    InstallFailed { version: String, reason: String },
    /// Stale generations were removed and clients were claimed.
    ControllerChanged { version: String, deleted: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        assert!(WorkerState::Parsed.can_install());
        assert!(!WorkerState::Installed.can_install());
        assert!(!WorkerState::Parsed.can_activate());
        assert!(WorkerState::Installed.can_activate());
        assert!(WorkerState::Activated.can_activate());
        assert!(!WorkerState::Redundant.can_activate());
        assert!(WorkerState::Redundant.is_terminal());
    }

    #[test]
    fn test_event_serialization() {
        let event = WorkerEvent::Installed { version: "1.0.0".into() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "installed");
        assert_eq!(json["version"], "1.0.0");
    }
}
