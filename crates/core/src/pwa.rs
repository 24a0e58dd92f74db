//! Page-side PWA state: connectivity, install prompt, and update detection.
//!
//! `PwaMonitor` is owned by whichever composition root hosts the page; it is
//! fed browser-style signals and worker lifecycle events and answers what the
//! page should do next.

use crate::lifecycle::WorkerEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Fixed identity of the installable application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PwaConfig {
    pub name: String,
    pub short_name: String,
    pub description: String,
    pub theme_color: String,
    pub background_color: String,
}

pub fn app_info() -> PwaConfig {
    PwaConfig {
        name: "BIM 3.0 Viewer".into(),
        short_name: "BIM Viewer".into(),
        description: "A modern Building Information Modeling viewer with 3D visualization capabilities".into(),
        theme_color: "#6528d7".into(),
        background_color: "#1a1d23".into(),
    }
}

/// User response to the install prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum InstallOutcome {
    Accepted,
    Dismissed,
}

/// What the page should do in response to a worker event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageAction {
    None,
    ShowUpdateNotification,
    Reload,
}

/// Snapshot of the monitor for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PwaStatus {
    pub online: bool,
    pub offline_indicator_visible: bool,
    pub installable: bool,
    pub update_available: bool,
    pub controlled: bool,
}

#[derive(Debug)]
pub struct PwaMonitor {
    online: watch::Sender<bool>,
    deferred_prompt: bool,
    prompt_dismissed: bool,
    update_available: bool,
    controlled: bool,
}

impl PwaMonitor {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { online: tx, deferred_prompt: false, prompt_dismissed: false, update_available: false, controlled: false }
    }

    /// Record a connectivity change. Returns true if the flag changed.
    pub fn set_online(&mut self, online: bool) -> bool {
        let changed = self.online.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!(online, "connectivity changed");
        }
        changed
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    pub fn offline_indicator_visible(&self) -> bool {
        !self.is_online()
    }

    /// Watch connectivity changes.
    pub fn subscribe_online(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    /// Capture the browser's install prompt for later use.
    ///
    /// Returns whether the install banner should be shown, which is false
    /// once the user has dismissed it.
    pub fn defer_install_prompt(&mut self) -> bool {
        self.deferred_prompt = true;
        !self.prompt_dismissed
    }

    /// Remember that the install banner was dismissed.
    pub fn dismiss_install_prompt(&mut self) {
        self.prompt_dismissed = true;
    }

    pub fn is_installable(&self) -> bool {
        self.deferred_prompt
    }

    /// Consume the deferred prompt with the user's choice.
    ///
    /// Returns false when no prompt was captured.
    pub fn install_app(&mut self, outcome: InstallOutcome) -> bool {
        if !self.deferred_prompt {
            return false;
        }
        self.deferred_prompt = false;
        outcome == InstallOutcome::Accepted
    }

    /// React to a worker lifecycle event.
    ///
    /// An install while another worker controls the page surfaces an update.
    /// The next controller change reloads only if that update was surfaced.
    pub fn handle_worker_event(&mut self, event: &WorkerEvent) -> PageAction {
        match event {
            WorkerEvent::Installed { version } if self.controlled => {
                tracing::info!(%version, "update available");
                self.update_available = true;
                PageAction::ShowUpdateNotification
            }
            WorkerEvent::Installed { .. } | WorkerEvent::InstallFailed { .. } => PageAction::None,
            WorkerEvent::ControllerChanged { .. } => {
                self.controlled = true;
                if self.update_available {
                    self.update_available = false;
                    PageAction::Reload
                } else {
                    PageAction::None
                }
            }
        }
    }

    pub fn status(&self) -> PwaStatus {
        PwaStatus {
            online: self.is_online(),
            offline_indicator_visible: self.offline_indicator_visible(),
            installable: self.is_installable(),
            update_available: self.update_available,
            controlled: self.controlled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installed() -> WorkerEvent {
        WorkerEvent::Installed { version: "1.0.1".into() }
    }

    fn controller_changed() -> WorkerEvent {
        WorkerEvent::ControllerChanged { version: "1.0.1".into(), deleted: Vec::new() }
    }

    #[test]
    fn test_offline_indicator_toggles() {
        let mut monitor = PwaMonitor::new(true);
        assert!(!monitor.offline_indicator_visible());

        assert!(monitor.set_online(false));
        assert!(monitor.offline_indicator_visible());
        assert!(!monitor.set_online(false));

        assert!(monitor.set_online(true));
        assert!(!monitor.offline_indicator_visible());
    }

    #[tokio::test]
    async fn test_online_subscription() {
        let mut monitor = PwaMonitor::new(true);
        let mut rx = monitor.subscribe_online();
        monitor.set_online(false);
        rx.changed().await.unwrap();
        assert!(!*rx.borrow());
    }

    #[test]
    fn test_install_prompt() {
        let mut monitor = PwaMonitor::new(true);
        assert!(!monitor.is_installable());
        assert!(!monitor.install_app(InstallOutcome::Accepted));

        assert!(monitor.defer_install_prompt());
        assert!(monitor.is_installable());
        assert!(monitor.install_app(InstallOutcome::Accepted));
        assert!(!monitor.is_installable());

        monitor.defer_install_prompt();
        assert!(!monitor.install_app(InstallOutcome::Dismissed));
    }

    #[test]
    fn test_dismissed_prompt_stays_hidden() {
        let mut monitor = PwaMonitor::new(true);
        monitor.dismiss_install_prompt();
        assert!(!monitor.defer_install_prompt());
        assert!(monitor.is_installable());
    }

    #[test]
    fn test_first_install_is_not_an_update() {
        let mut monitor = PwaMonitor::new(true);
        assert_eq!(monitor.handle_worker_event(&installed()), PageAction::None);
        assert_eq!(monitor.handle_worker_event(&controller_changed()), PageAction::None);
        assert!(monitor.status().controlled);
    }

    #[test]
    fn test_update_then_reload() {
        let mut monitor = PwaMonitor::new(true);
        monitor.handle_worker_event(&controller_changed());

        assert_eq!(monitor.handle_worker_event(&installed()), PageAction::ShowUpdateNotification);
        assert!(monitor.status().update_available);
        assert_eq!(monitor.handle_worker_event(&controller_changed()), PageAction::Reload);
        assert!(!monitor.status().update_available);
    }

    #[test]
    fn test_app_info() {
        let info = app_info();
        assert_eq!(info.short_name, "BIM Viewer");
        assert_eq!(info.theme_color, "#6528d7");
    }
}
