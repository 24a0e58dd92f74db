//! Settings tools: read, update, export, reset, update check.

use super::json_result;
use bimview_core::SettingsService;
use bimview_core::settings::{ExportFormat, SettingsCategory, SettingsPatch};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the settings_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SettingsGetParams {
    /// Which category to read.
    pub category: SettingsCategory,
}

pub async fn get_impl(settings: &SettingsService, params: SettingsGetParams) -> Result<CallToolResult, McpError> {
    let value = settings.get(params.category).await?;
    json_result(&value)
}

/// Parameters for the settings_update tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SettingsUpdateParams {
    /// `{"category": "...", "changes": {...}}`; absent fields are left as they are.
    pub patch: SettingsPatch,
}

pub async fn update_impl(
    settings: &SettingsService, params: SettingsUpdateParams,
) -> Result<CallToolResult, McpError> {
    let value = settings.apply(&params.patch).await?;
    json_result(&value)
}

/// Parameters for the settings_export tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SettingsExportParams {
    /// json, csv or tsv (default: json).
    #[serde(default = "default_format")]
    pub format: ExportFormat,
}

fn default_format() -> ExportFormat {
    ExportFormat::Json
}

pub async fn export_impl(
    settings: &SettingsService, params: SettingsExportParams,
) -> Result<CallToolResult, McpError> {
    let export = settings.export(params.format).await?;
    json_result(&export)
}

/// Clears every cache generation and stored settings document.
pub async fn reset_impl(settings: &SettingsService) -> Result<CallToolResult, McpError> {
    let report = settings.clear_cache().await?;
    json_result(&report)
}

pub async fn check_updates_impl(settings: &SettingsService) -> Result<CallToolResult, McpError> {
    let check = settings.check_for_updates().await?;
    json_result(&check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::output;
    use bimview_core::CacheDb;
    use bimview_core::settings::{ClearReport, Export, SettingsValue, UpdateCheck};

    async fn service() -> SettingsService {
        let db = CacheDb::open_in_memory().await.unwrap();
        SettingsService::open(db, "1.0.0").await.unwrap()
    }

    #[tokio::test]
    async fn test_get_preferences() {
        let settings = service().await;
        let params = SettingsGetParams { category: SettingsCategory::Preferences };

        let value: SettingsValue = output(&get_impl(&settings, params).await.unwrap());
        assert!(matches!(value, SettingsValue::Preferences(_)));
    }

    #[tokio::test]
    async fn test_update_from_json_params() {
        let settings = service().await;
        settings.user_profile().await.unwrap();
        let mut changes = settings.subscribe();

        let params: SettingsUpdateParams = serde_json::from_str(
            r#"{"patch": {"category": "preferences", "changes": {"theme": "light", "gridSize": 2.5}}}"#,
        )
        .unwrap();

        let value: SettingsValue = output(&update_impl(&settings, params).await.unwrap());
        match value {
            SettingsValue::Preferences(prefs) => assert_eq!(prefs.grid_size, 2.5),
            other => panic!("unexpected value: {other:?}"),
        }
        assert!(matches!(changes.recv().await.unwrap(), SettingsValue::Preferences(_)));
    }

    #[tokio::test]
    async fn test_export_tsv() {
        let settings = service().await;
        let params = SettingsExportParams { format: ExportFormat::Tsv };

        let export: Export = output(&export_impl(&settings, params).await.unwrap());
        assert!(export.content.contains('\t'));
    }

    #[test]
    fn test_export_format_defaults_to_json() {
        let params: SettingsExportParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.format, ExportFormat::Json);
    }

    #[tokio::test]
    async fn test_reset_and_check_updates() {
        let settings = service().await;
        settings.user_profile().await.unwrap();

        let report: ClearReport = output(&reset_impl(&settings).await.unwrap());
        assert_eq!(report.settings, 1);

        let check: UpdateCheck = output(&check_updates_impl(&settings).await.unwrap());
        assert!(!check.available);
    }
}
