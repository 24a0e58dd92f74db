//! User and application settings.
//!
//! `SettingsService` is constructed once by the composition root and shared
//! by reference. Every successful update is published on a broadcast channel;
//! subscribers hold a receiver for as long as they want updates and drop it to
//! unsubscribe.
//!
//! Documents are persisted as JSON in the cache database under the keys
//! `bim-user-profile` and `bim-app-settings`.

pub mod model;
pub mod patch;
mod store;

pub use model::{
    AppSettings, DataSettings, NotificationSettings, SecuritySettings, UserPreferences, UserProfile,
};
pub use patch::SettingsPatch;

use crate::Error;
use crate::cache::CacheDb;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast};

const PROFILE_KEY: &str = "bim-user-profile";
const APP_KEY: &str = "bim-app-settings";
const CHANNEL_CAPACITY: usize = 32;

/// Settings category selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SettingsCategory {
    Profile,
    Preferences,
    Security,
    Notifications,
    Data,
    App,
}

/// The current value of one settings category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "category", content = "value", rename_all = "snake_case")]
pub enum SettingsValue {
    Profile(UserProfile),
    Preferences(UserPreferences),
    Security(SecuritySettings),
    Notifications(NotificationSettings),
    Data(DataSettings),
    App(AppSettings),
}

/// Export encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Tsv,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Export {
    pub content_type: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UpdateCheck {
    pub available: bool,
    pub version: Option<String>,
    pub changelog: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClearReport {
    pub generations: u64,
    pub settings: u64,
}

struct SettingsState {
    profile: Option<UserProfile>,
    app: AppSettings,
}

pub struct SettingsService {
    db: CacheDb,
    app_version: String,
    state: Mutex<SettingsState>,
    changes: broadcast::Sender<SettingsValue>,
}

impl SettingsService {
    /// Load persisted settings.
    ///
    /// A stored document that fails to parse is treated as absent.
    pub async fn open(db: CacheDb, app_version: &str) -> Result<Self, Error> {
        let profile = load::<UserProfile>(&db, PROFILE_KEY).await?;
        let app = load::<AppSettings>(&db, APP_KEY)
            .await?
            .unwrap_or_else(|| AppSettings::new(app_version));
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);

        Ok(Self { db, app_version: app_version.to_string(), state: Mutex::new(SettingsState { profile, app }), changes })
    }

    /// Receive every subsequent settings update.
    pub fn subscribe(&self) -> broadcast::Receiver<SettingsValue> {
        self.changes.subscribe()
    }

    /// The stored profile, creating and persisting the default one if none exists.
    pub async fn user_profile(&self) -> Result<UserProfile, Error> {
        let mut state = self.state.lock().await;
        if let Some(profile) = &state.profile {
            return Ok(profile.clone());
        }

        let profile = UserProfile::default();
        self.db.put_setting(PROFILE_KEY, serde_json::to_string(&profile)?).await?;
        state.profile = Some(profile.clone());
        Ok(profile)
    }

    pub async fn app_settings(&self) -> AppSettings {
        self.state.lock().await.app.clone()
    }

    /// Current value of one category.
    pub async fn get(&self, category: SettingsCategory) -> Result<SettingsValue, Error> {
        Ok(match category {
            SettingsCategory::App => SettingsValue::App(self.app_settings().await),
            SettingsCategory::Profile => SettingsValue::Profile(self.user_profile().await?),
            SettingsCategory::Preferences => SettingsValue::Preferences(self.user_profile().await?.preferences),
            SettingsCategory::Security => SettingsValue::Security(self.user_profile().await?.security),
            SettingsCategory::Notifications => SettingsValue::Notifications(self.user_profile().await?.notifications),
            SettingsCategory::Data => SettingsValue::Data(self.user_profile().await?.data),
        })
    }

    /// Apply a partial update, persist it, and publish the new category value.
    ///
    /// # Errors
    ///
    /// Returns `Error::Settings` when a profile category is patched before a
    /// profile exists.
    pub async fn apply(&self, patch: &SettingsPatch) -> Result<SettingsValue, Error> {
        let mut state = self.state.lock().await;

        // Patch a copy; the shared state only changes once the write lands.
        let value = if let SettingsPatch::App(app_patch) = patch {
            let mut app = state.app.clone();
            app_patch.apply(&mut app);
            self.db.put_setting(APP_KEY, serde_json::to_string(&app)?).await?;
            state.app = app.clone();
            SettingsValue::App(app)
        } else {
            let mut profile = state
                .profile
                .clone()
                .ok_or_else(|| Error::Settings("no user profile found".into()))?;
            let value = patch
                .apply_to_profile(&mut profile)
                .ok_or_else(|| Error::InvalidInput("patch does not target the profile".into()))?;
            self.db.put_setting(PROFILE_KEY, serde_json::to_string(&profile)?).await?;
            state.profile = Some(profile);
            value
        };

        // No receivers is not an error.
        let _ = self.changes.send(value.clone());
        tracing::debug!(receivers = self.changes.receiver_count(), "settings updated");

        Ok(value)
    }

    /// Export the profile and application settings.
    pub async fn export(&self, format: ExportFormat) -> Result<Export, Error> {
        let state = self.state.lock().await;
        let data = serde_json::json!({
            "profile": state.profile,
            "settings": state.app,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let export = match format {
            ExportFormat::Json => {
                Export { content_type: "application/json".into(), content: serde_json::to_string_pretty(&data)? }
            }
            ExportFormat::Csv => Export { content_type: "text/csv".into(), content: delimited(&data, ',')? },
            ExportFormat::Tsv => {
                Export { content_type: "text/tab-separated-values".into(), content: delimited(&data, '\t')? }
            }
        };
        Ok(export)
    }

    /// Drop every cache generation and every stored settings document.
    pub async fn clear_cache(&self) -> Result<ClearReport, Error> {
        let mut state = self.state.lock().await;
        let generations = self.db.clear_generations().await?;
        let settings = self.db.clear_settings().await?;

        state.profile = None;
        state.app = AppSettings::new(&self.app_version);

        tracing::info!(generations, settings, "cleared cache and settings");
        Ok(ClearReport { generations, settings })
    }

    /// Record an update check. No update source is configured, so nothing is
    /// ever reported as available.
    pub async fn check_for_updates(&self) -> Result<UpdateCheck, Error> {
        let mut state = self.state.lock().await;
        let mut app = state.app.clone();
        app.last_update_check = chrono::Utc::now().to_rfc3339();
        self.db.put_setting(APP_KEY, serde_json::to_string(&app)?).await?;
        state.app = app;
        Ok(UpdateCheck { available: false, version: None, changelog: None })
    }
}

async fn load<T>(db: &CacheDb, key: &str) -> Result<Option<T>, Error>
where
    T: serde::de::DeserializeOwned,
{
    let Some(json) = db.get_setting(key).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&json) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(key, error = %e, "ignoring unreadable stored settings");
            Ok(None)
        }
    }
}

/// One `key<sep>json` row per top-level field.
fn delimited(data: &serde_json::Value, separator: char) -> Result<String, Error> {
    let Some(object) = data.as_object() else {
        return Err(Error::Settings("export data is not an object".into()));
    };

    let rows = object
        .iter()
        .map(|(key, value)| -> Result<String, Error> {
            Ok(format!("{key}{separator}{}", serde_json::to_string(value)?))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.join("\n"))
}
