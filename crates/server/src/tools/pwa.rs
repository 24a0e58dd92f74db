//! PWA collaborator tools: push, notification click, background sync, page status.

use super::json_result;
use bimview_client::worker::push::{self, ClickAction, Notification};
use bimview_core::pwa::{self as page, InstallOutcome, PageAction, PwaConfig, PwaMonitor, PwaStatus};
use bimview_core::{WorkerEvent, WorkerState};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};

/// Parameters for the push_notify tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PushNotifyParams {
    /// Push payload text. Omit for the default message.
    #[serde(default)]
    pub payload: Option<String>,
}

pub async fn push_impl(params: PushNotifyParams) -> Result<CallToolResult, McpError> {
    json_result(&Notification::from_push(params.payload.as_deref()))
}

/// Parameters for the notification_click tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// The action button that was clicked, if any.
    #[serde(default)]
    pub action: Option<String>,
}

pub async fn click_impl(params: NotificationClickParams) -> Result<CallToolResult, McpError> {
    let action: ClickAction = push::on_notification_click(params.action.as_deref());
    json_result(&action)
}

/// Parameters for the background_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BackgroundSyncParams {
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BackgroundSyncOutput {
    pub tag: String,
    pub handled: bool,
}

pub async fn sync_impl(params: BackgroundSyncParams) -> Result<CallToolResult, McpError> {
    let handled = push::handle_sync(&params.tag);
    json_result(&BackgroundSyncOutput { tag: params.tag, handled })
}

/// Parameters for the pwa_status tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PwaStatusParams {
    /// Report a connectivity change before reading the status.
    #[serde(default)]
    pub online: Option<bool>,

    /// A captured install prompt is available.
    #[serde(default)]
    pub install_prompt: bool,

    /// The user answered the install prompt.
    #[serde(default)]
    pub install_outcome: Option<InstallOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PwaStatusOutput {
    pub app: PwaConfig,
    pub worker: WorkerState,
    #[serde(flatten)]
    pub page: PwaStatus,
    /// Present when an install outcome was reported.
    pub installed: Option<bool>,
}

pub async fn status_impl(
    monitor: &Mutex<PwaMonitor>, worker: WorkerState, params: PwaStatusParams,
) -> Result<CallToolResult, McpError> {
    let mut monitor = monitor.lock().await;

    if let Some(online) = params.online {
        monitor.set_online(online);
    }

    if params.install_prompt && monitor.defer_install_prompt() {
        tracing::info!("install prompt available");
    }

    let installed = params.install_outcome.map(|outcome| monitor.install_app(outcome));

    let output = PwaStatusOutput { app: page::app_info(), worker, page: monitor.status(), installed };
    json_result(&output)
}

/// Feed worker lifecycle events to the page monitor until the worker goes away.
pub async fn forward_worker_events(mut events: broadcast::Receiver<WorkerEvent>, monitor: Arc<Mutex<PwaMonitor>>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let action = monitor.lock().await.handle_worker_event(&event);
                match action {
                    PageAction::ShowUpdateNotification => tracing::info!("new version available"),
                    PageAction::Reload => tracing::info!("controller changed, reloading"),
                    PageAction::None => tracing::debug!(?event, "worker event"),
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "missed worker events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::output;

    #[tokio::test]
    async fn test_push_default_body() {
        let notification: Notification = output(&push_impl(PushNotifyParams::default()).await.unwrap());
        assert_eq!(notification.title, "BIM Viewer");
        assert_eq!(notification.body, "New BIM model available");
    }

    #[tokio::test]
    async fn test_click_explore_opens_root() {
        let params = NotificationClickParams { action: Some("explore".into()) };
        let action: ClickAction = output(&click_impl(params).await.unwrap());
        assert_eq!(action, ClickAction::OpenWindow("/".into()));
    }

    #[tokio::test]
    async fn test_sync() {
        let out: BackgroundSyncOutput =
            output(&sync_impl(BackgroundSyncParams { tag: "background-sync".into() }).await.unwrap());
        assert!(out.handled);
    }

    #[tokio::test]
    async fn test_status_tracks_connectivity_and_install() {
        let monitor = Mutex::new(PwaMonitor::new(true));

        let params = PwaStatusParams { online: Some(false), install_prompt: true, install_outcome: None };
        let out: PwaStatusOutput = output(&status_impl(&monitor, WorkerState::Activated, params).await.unwrap());
        assert!(!out.page.online);
        assert!(out.page.offline_indicator_visible);
        assert!(out.page.installable);
        assert_eq!(out.app.short_name, "BIM Viewer");
        assert_eq!(out.installed, None);

        let params = PwaStatusParams { install_outcome: Some(InstallOutcome::Accepted), ..Default::default() };
        let out: PwaStatusOutput = output(&status_impl(&monitor, WorkerState::Activated, params).await.unwrap());
        assert_eq!(out.installed, Some(true));
        assert!(!out.page.installable);
    }

    #[tokio::test]
    async fn test_forward_worker_events_surfaces_update() {
        let (tx, rx) = broadcast::channel(4);
        let monitor = Arc::new(Mutex::new(PwaMonitor::new(true)));
        let bridge = tokio::spawn(forward_worker_events(rx, monitor.clone()));

        tx.send(WorkerEvent::ControllerChanged { version: "1.0.0".into(), deleted: Vec::new() }).unwrap();
        tx.send(WorkerEvent::Installed { version: "1.0.1".into() }).unwrap();
        drop(tx);
        bridge.await.unwrap();

        let status = monitor.lock().await.status();
        assert!(status.controlled);
        assert!(status.update_available);
    }
}
