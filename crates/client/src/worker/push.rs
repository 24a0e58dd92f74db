//! Push notifications, notification clicks, and background sync.

use serde::{Deserialize, Serialize};

const TITLE: &str = "BIM Viewer";
const DEFAULT_BODY: &str = "New BIM model available";
const ACTION_ICON: &str = "/icons/icon-96x96.png";

/// Tag of the only background sync the worker handles.
pub const SYNC_TAG: &str = "background-sync";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

/// Notification payload handed to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    /// Milliseconds since the Unix epoch.
    pub date_of_arrival: i64,
    pub primary_key: u32,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Build the notification for a push event; an absent payload uses the default body.
    pub fn from_push(payload: Option<&str>) -> Self {
        let body = payload.unwrap_or(DEFAULT_BODY).to_string();
        tracing::info!(%body, "push notification received");

        Self {
            title: TITLE.into(),
            body,
            icon: "/icons/icon-192x192.png".into(),
            badge: "/icons/icon-72x72.png".into(),
            vibrate: vec![100, 50, 100],
            date_of_arrival: chrono::Utc::now().timestamp_millis(),
            primary_key: 1,
            actions: vec![
                NotificationAction { action: "explore".into(), title: "Open BIM Viewer".into(), icon: ACTION_ICON.into() },
                NotificationAction { action: "close".into(), title: "Close".into(), icon: ACTION_ICON.into() },
            ],
        }
    }
}

/// What follows a notification click. The notification is always closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", content = "url", rename_all = "snake_case")]
pub enum ClickAction {
    OpenWindow(String),
    Close,
}

pub fn on_notification_click(action: Option<&str>) -> ClickAction {
    match action {
        Some("explore") => ClickAction::OpenWindow("/".into()),
        _ => ClickAction::Close,
    }
}

/// Dispatch a background sync. Returns whether the tag was handled.
pub fn handle_sync(tag: &str) -> bool {
    if tag != SYNC_TAG {
        tracing::debug!(tag, "ignoring background sync");
        return false;
    }
    tracing::info!(tag, "background sync triggered");
    true
}
