//! Partial updates, one variant per settings category.

use super::model::{
    AppSettings, BackupFrequency, DataSettings, Language, NotificationSettings, SecuritySettings, Theme,
    UpdateChannel, UserPreferences, UserProfile, Viewport,
};
use super::SettingsValue;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A partial update to one settings category.
///
/// Absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "category", content = "changes", rename_all = "snake_case")]
pub enum SettingsPatch {
    Profile(ProfilePatch),
    Preferences(PreferencesPatch),
    Security(SecurityPatch),
    Notifications(NotificationsPatch),
    Data(DataPatch),
    App(AppSettingsPatch),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    pub theme: Option<Theme>,
    pub language: Option<Language>,
    pub auto_save: Option<bool>,
    pub hardware_acceleration: Option<bool>,
    pub default_viewport: Option<Viewport>,
    pub grid_enabled: Option<bool>,
    pub grid_size: Option<f64>,
    pub grid_color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecurityPatch {
    pub two_factor_enabled: Option<bool>,
    pub session_timeout: Option<u32>,
    pub max_devices: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsPatch {
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
    pub update_reminders: Option<bool>,
    pub project_shares: Option<bool>,
    pub collaboration_updates: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataPatch {
    pub storage_limit: Option<u64>,
    pub auto_backup: Option<bool>,
    pub backup_frequency: Option<BackupFrequency>,
    pub retention_period: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppSettingsPatch {
    pub update_channel: Option<UpdateChannel>,
}

impl SettingsPatch {
    /// Apply a profile-scoped patch and return the updated category value.
    ///
    /// Returns `None` for `App`, which is stored separately from the profile.
    pub fn apply_to_profile(&self, profile: &mut UserProfile) -> Option<SettingsValue> {
        let value = match self {
            SettingsPatch::Profile(p) => {
                p.apply(profile);
                SettingsValue::Profile(profile.clone())
            }
            SettingsPatch::Preferences(p) => {
                p.apply(&mut profile.preferences);
                SettingsValue::Preferences(profile.preferences.clone())
            }
            SettingsPatch::Security(p) => {
                p.apply(&mut profile.security);
                SettingsValue::Security(profile.security.clone())
            }
            SettingsPatch::Notifications(p) => {
                p.apply(&mut profile.notifications);
                SettingsValue::Notifications(profile.notifications.clone())
            }
            SettingsPatch::Data(p) => {
                p.apply(&mut profile.data);
                SettingsValue::Data(profile.data.clone())
            }
            SettingsPatch::App(_) => return None,
        };
        Some(value)
    }
}

fn set<T>(field: &mut T, value: &Option<T>)
where
    T: Clone,
{
    if let Some(value) = value {
        *field = value.clone();
    }
}

impl ProfilePatch {
    pub fn apply(&self, profile: &mut UserProfile) {
        set(&mut profile.username, &self.username);
        set(&mut profile.email, &self.email);
        if self.avatar.is_some() {
            profile.avatar = self.avatar.clone();
        }
    }
}

impl PreferencesPatch {
    pub fn apply(&self, prefs: &mut UserPreferences) {
        set(&mut prefs.theme, &self.theme);
        set(&mut prefs.language, &self.language);
        set(&mut prefs.auto_save, &self.auto_save);
        set(&mut prefs.hardware_acceleration, &self.hardware_acceleration);
        set(&mut prefs.default_viewport, &self.default_viewport);
        set(&mut prefs.grid_enabled, &self.grid_enabled);
        set(&mut prefs.grid_size, &self.grid_size);
        set(&mut prefs.grid_color, &self.grid_color);
    }
}

impl SecurityPatch {
    pub fn apply(&self, security: &mut SecuritySettings) {
        set(&mut security.two_factor_enabled, &self.two_factor_enabled);
        set(&mut security.session_timeout, &self.session_timeout);
        set(&mut security.max_devices, &self.max_devices);
    }
}

impl NotificationsPatch {
    pub fn apply(&self, notifications: &mut NotificationSettings) {
        set(&mut notifications.email_notifications, &self.email_notifications);
        set(&mut notifications.push_notifications, &self.push_notifications);
        set(&mut notifications.update_reminders, &self.update_reminders);
        set(&mut notifications.project_shares, &self.project_shares);
        set(&mut notifications.collaboration_updates, &self.collaboration_updates);
    }
}

impl DataPatch {
    pub fn apply(&self, data: &mut DataSettings) {
        set(&mut data.storage_limit, &self.storage_limit);
        set(&mut data.auto_backup, &self.auto_backup);
        set(&mut data.backup_frequency, &self.backup_frequency);
        set(&mut data.retention_period, &self.retention_period);
    }
}

impl AppSettingsPatch {
    pub fn apply(&self, app: &mut AppSettings) {
        set(&mut app.update_channel, &self.update_channel);
    }
}
