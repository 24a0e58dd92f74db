//! Settings categories and their defaults.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Language {
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "es-ES")]
    EsEs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Viewport {
    Perspective,
    Orthographic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Pro,
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BackupFrequency {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum UpdateChannel {
    Stable,
    Beta,
    Alpha,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub theme: Theme,
    pub language: Language,
    pub auto_save: bool,
    pub hardware_acceleration: bool,
    pub default_viewport: Viewport,
    pub grid_enabled: bool,
    pub grid_size: f64,
    pub grid_color: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            language: Language::ZhCn,
            auto_save: true,
            hardware_acceleration: false,
            default_viewport: Viewport::Perspective,
            grid_enabled: true,
            grid_size: 2.0,
            grid_color: "#494b50".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRecord {
    pub timestamp: String,
    pub device: String,
    pub location: String,
    pub ip_address: String,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySettings {
    pub two_factor_enabled: bool,
    /// Minutes.
    pub session_timeout: u32,
    pub max_devices: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_last_changed: Option<String>,
    #[serde(default)]
    pub login_history: Vec<LoginRecord>,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            two_factor_enabled: false,
            session_timeout: 60,
            max_devices: 3,
            password_last_changed: None,
            login_history: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub update_reminders: bool,
    pub project_shares: bool,
    pub collaboration_updates: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            push_notifications: false,
            update_reminders: true,
            project_shares: true,
            collaboration_updates: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataSettings {
    /// Bytes.
    pub storage_used: u64,
    /// Bytes.
    pub storage_limit: u64,
    pub auto_backup: bool,
    pub backup_frequency: BackupFrequency,
    /// Days.
    pub retention_period: u32,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            storage_used: 2_576_980_378, // 2.4 GiB
            storage_limit: 10 * 1024 * 1024 * 1024,
            auto_backup: true,
            backup_frequency: BackupFrequency::Weekly,
            retention_period: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(rename = "type")]
    pub tier: SubscriptionTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub subscription: Subscription,
    pub preferences: UserPreferences,
    pub security: SecuritySettings,
    pub notifications: NotificationSettings,
    pub data: DataSettings,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            id: "default-user".into(),
            username: "user".into(),
            email: "user@example.com".into(),
            avatar: None,
            subscription: Subscription {
                tier: SubscriptionTier::Free,
                expires_at: None,
                features: vec!["basic-viewer".into(), "local-storage".into()],
            },
            preferences: UserPreferences::default(),
            security: SecuritySettings::default(),
            notifications: NotificationSettings::default(),
            data: DataSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub version: String,
    pub build_number: String,
    pub last_update_check: String,
    pub update_channel: UpdateChannel,
}

impl AppSettings {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            build_number: "2024.1.0".into(),
            last_update_check: chrono::Utc::now().to_rfc3339(),
            update_channel: UpdateChannel::Stable,
        }
    }
}
