//! PWA readiness checks over a project directory.
//!
//! Each check reads one file or directory relative to the project root and
//! yields an optional problem. Required checks fail the run; optional ones
//! only warn.

use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

const REQUIRED_ICON_SIZES: [&str; 2] = ["192x192", "512x512"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub path: &'static str,
    pub outcome: Outcome,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub checks: Vec<CheckResult>,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
}

impl Report {
    pub fn ok(&self) -> bool {
        self.failed == 0
    }
}

enum Target {
    File(fn(&str) -> Option<String>),
    Dir(fn(&Path) -> Option<String>),
}

struct Requirement {
    name: &'static str,
    path: &'static str,
    required: bool,
    target: Target,
}

const REQUIREMENTS: [Requirement; 5] = [
    Requirement {
        name: "Web App Manifest",
        path: "public/manifest.json",
        required: true,
        target: Target::File(check_manifest),
    },
    Requirement { name: "Service Worker", path: "public/sw.js", required: true, target: Target::File(check_worker) },
    // Only needed for production deployments.
    Requirement { name: "HTTPS/SSL", path: "vite.config.ts", required: false, target: Target::File(check_https) },
    Requirement { name: "Icons Directory", path: "public/icons", required: true, target: Target::Dir(check_icons) },
    Requirement { name: "PWA Meta Tags", path: "index.html", required: true, target: Target::File(check_meta_tags) },
];

/// Run every check against `root`.
pub fn validate(root: &Path) -> Report {
    let mut checks = Vec::with_capacity(REQUIREMENTS.len());

    for req in &REQUIREMENTS {
        let full = root.join(req.path);
        let problem = match req.target {
            Target::Dir(check) => check(&full),
            Target::File(check) => match fs::read(&full) {
                Ok(bytes) => check(&String::from_utf8_lossy(&bytes)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Some(format!("File not found: {}", req.path)),
                Err(e) => Some(format!("Error checking file - {e}")),
            },
        };

        let outcome = match (&problem, req.required) {
            (None, _) => Outcome::Passed,
            (Some(_), true) => Outcome::Failed,
            (Some(_), false) => Outcome::Warning,
        };

        tracing::debug!(check = req.name, ?outcome, "checked");
        checks.push(CheckResult { name: req.name, path: req.path, outcome, message: problem });
    }

    let count = |o: Outcome| checks.iter().filter(|c| c.outcome == o).count();
    let (passed, failed, warnings) = (count(Outcome::Passed), count(Outcome::Failed), count(Outcome::Warning));
    Report { checks, passed, failed, warnings }
}

/// JSON truthiness: missing, null, false, 0 and "" count as absent.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn check_manifest(content: &str) -> Option<String> {
    let manifest: Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(e) => return Some(format!("Invalid JSON: {e}")),
    };

    let missing: Vec<&str> = ["name", "short_name", "start_url", "display", "icons"]
        .into_iter()
        .filter(|field| !truthy(manifest.get(field)))
        .collect();
    if !missing.is_empty() {
        return Some(format!("Missing required fields: {}", missing.join(", ")));
    }

    let icons = manifest["icons"].as_array().map(Vec::as_slice).unwrap_or_default();
    if icons.is_empty() {
        return Some("No icons defined in manifest".into());
    }

    let has_size = |size: &str| icons.iter().any(|icon| icon["sizes"].as_str() == Some(size));
    if !REQUIRED_ICON_SIZES.into_iter().all(has_size) {
        return Some("Missing required icon sizes (192x192 and 512x512)".into());
    }

    None
}

fn check_worker(content: &str) -> Option<String> {
    if !content.contains("addEventListener") {
        return Some("Service worker missing event listeners".into());
    }
    if !content.contains("caches") {
        return Some("Service worker missing caching functionality".into());
    }
    None
}

fn check_https(content: &str) -> Option<String> {
    if content.contains("https") {
        None
    } else {
        Some("HTTPS not configured (required for production PWA)".into())
    }
}

fn check_icons(dir: &Path) -> Option<String> {
    if !dir.is_dir() {
        return Some("Icons directory does not exist".into());
    }

    let files: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(e) => return Some(format!("Error checking file - {e}")),
    };

    if files.is_empty() {
        return Some("No icon files found".into());
    }

    let missing: Vec<&str> = REQUIRED_ICON_SIZES
        .into_iter()
        .filter(|size| !files.iter().any(|f| f.contains(size)))
        .collect();
    if !missing.is_empty() {
        return Some(format!("Missing required icon sizes: {}", missing.join(", ")));
    }

    None
}

fn check_meta_tags(content: &str) -> Option<String> {
    let missing: Vec<&str> = ["theme-color", "apple-mobile-web-app-capable", "viewport"]
        .into_iter()
        .filter(|tag| !content.contains(tag))
        .collect();
    if !missing.is_empty() {
        return Some(format!("Missing meta tags: {}", missing.join(", ")));
    }

    if !content.contains("manifest.json") {
        return Some("Manifest not linked in HTML".into());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{
        "name": "BIM 3.0 Viewer",
        "short_name": "BIM Viewer",
        "start_url": "/",
        "display": "standalone",
        "icons": [
            {"src": "/icons/icon-192x192.png", "sizes": "192x192"},
            {"src": "/icons/icon-512x512.png", "sizes": "512x512"}
        ]
    }"#;

    const INDEX: &str = r##"<meta name="viewport" content="width=device-width">
<meta name="theme-color" content="#6528d7">
<meta name="apple-mobile-web-app-capable" content="yes">
<link rel="manifest" href="/manifest.json">"##;

    fn project() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("public/icons")).unwrap();
        fs::write(root.join("public/manifest.json"), MANIFEST).unwrap();
        fs::write(root.join("public/sw.js"), "self.addEventListener('install', () => caches.open('x'));").unwrap();
        fs::write(root.join("public/icons/icon-192x192.png"), b"png").unwrap();
        fs::write(root.join("public/icons/icon-512x512.png"), b"png").unwrap();
        fs::write(root.join("vite.config.ts"), "export default { server: { https: true } }").unwrap();
        fs::write(root.join("index.html"), INDEX).unwrap();
        dir
    }

    fn result<'a>(report: &'a Report, name: &str) -> &'a CheckResult {
        report.checks.iter().find(|c| c.name == name).unwrap()
    }

    #[test]
    fn test_complete_project_passes() {
        let dir = project();
        let report = validate(dir.path());
        assert!(report.ok());
        assert_eq!(report.passed, 5);
        assert_eq!(report.warnings, 0);
    }

    #[test]
    fn test_missing_https_is_only_a_warning() {
        let dir = project();
        fs::write(dir.path().join("vite.config.ts"), "export default {}").unwrap();

        let report = validate(dir.path());
        assert!(report.ok());
        assert_eq!(report.warnings, 1);
        assert_eq!(result(&report, "HTTPS/SSL").outcome, Outcome::Warning);
    }

    #[test]
    fn test_manifest_missing_fields() {
        let dir = project();
        fs::write(dir.path().join("public/manifest.json"), r#"{"name": "x", "short_name": "", "icons": []}"#).unwrap();

        let report = validate(dir.path());
        assert!(!report.ok());
        let check = result(&report, "Web App Manifest");
        assert_eq!(check.message.as_deref(), Some("Missing required fields: short_name, start_url, display"));
    }

    #[test]
    fn test_manifest_empty_icons_and_sizes() {
        assert_eq!(
            check_manifest(r#"{"name":"a","short_name":"b","start_url":"/","display":"standalone","icons":[]}"#)
                .as_deref(),
            Some("No icons defined in manifest")
        );
        assert_eq!(
            check_manifest(
                r#"{"name":"a","short_name":"b","start_url":"/","display":"standalone","icons":[{"sizes":"192x192"}]}"#
            )
            .as_deref(),
            Some("Missing required icon sizes (192x192 and 512x512)")
        );
        assert!(check_manifest("{not json").unwrap().starts_with("Invalid JSON"));
    }

    #[test]
    fn test_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let report = validate(dir.path());

        assert_eq!(report.failed, 4);
        assert_eq!(report.warnings, 1);
        assert_eq!(result(&report, "Service Worker").message.as_deref(), Some("File not found: public/sw.js"));
        assert_eq!(result(&report, "Icons Directory").message.as_deref(), Some("Icons directory does not exist"));
    }

    #[test]
    fn test_icons_missing_size() {
        let dir = project();
        fs::remove_file(dir.path().join("public/icons/icon-512x512.png")).unwrap();

        let report = validate(dir.path());
        assert_eq!(
            result(&report, "Icons Directory").message.as_deref(),
            Some("Missing required icon sizes: 512x512")
        );
    }

    #[test]
    fn test_non_utf8_file_is_still_checked() {
        let dir = project();
        let mut html = INDEX.as_bytes().to_vec();
        html.extend_from_slice(&[0xff, 0xfe, b'\n']);
        fs::write(dir.path().join("index.html"), html).unwrap();

        let report = validate(dir.path());
        assert_eq!(result(&report, "PWA Meta Tags").outcome, Outcome::Passed);
        assert!(report.ok());
    }

    #[test]
    fn test_worker_and_meta_checks() {
        assert_eq!(check_worker("caches.open()").as_deref(), Some("Service worker missing event listeners"));
        assert_eq!(
            check_worker("addEventListener('fetch')").as_deref(),
            Some("Service worker missing caching functionality")
        );
        assert_eq!(
            check_meta_tags("viewport theme-color").as_deref(),
            Some("Missing meta tags: apple-mobile-web-app-capable")
        );
        assert_eq!(
            check_meta_tags("viewport theme-color apple-mobile-web-app-capable").as_deref(),
            Some("Manifest not linked in HTML")
        );
    }
}
