//! Synthetic responses returned when neither network nor cache can answer.

use super::{ResponseSource, WorkerResponse};
use bytes::Bytes;
use std::collections::BTreeMap;

const OFFLINE_PAGE: &str = "<!DOCTYPE html>
<html>
  <head><title>BIM Viewer - Offline</title></head>
  <body>
    <h1>BIM Viewer</h1>
    <p>You're currently offline. Please check your connection and try again.</p>
  </body>
</html>
";

const CONNECTION_ERROR_PAGE: &str = "<!DOCTYPE html>
<html>
  <head><title>BIM Viewer - Connection Error</title></head>
  <body>
    <h1>Connection Error</h1>
    <p>Unable to load the requested resource. Please check your connection and try again.</p>
  </body>
</html>
";

fn synthetic(url: &str, status: u16, content_type: &str, body: &'static str) -> WorkerResponse {
    let mut headers = BTreeMap::new();
    headers.insert("content-type".to_string(), content_type.to_string());
    WorkerResponse {
        url: url.to_string(),
        status,
        content_type: Some(content_type.to_string()),
        headers,
        body: Bytes::from_static(body.as_bytes()),
        source: ResponseSource::Fallback,
    }
}

/// Minimal offline page for document requests.
pub fn offline_page(url: &str) -> WorkerResponse {
    synthetic(url, 200, "text/html", OFFLINE_PAGE)
}

/// Plain 503 for other cache-first failures.
pub fn network_error(url: &str) -> WorkerResponse {
    synthetic(url, 503, "text/plain", "Network error")
}

/// 503 page once network-first has exhausted the cache.
pub fn connection_error_page(url: &str) -> WorkerResponse {
    synthetic(url, 503, "text/html", CONNECTION_ERROR_PAGE)
}

/// Whether a failed cache-first request should get the offline page.
pub fn wants_offline_page(url: &str) -> bool {
    url.contains("index.html") || url.ends_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_page() {
        let response = offline_page("http://localhost:5173/");
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type.as_deref(), Some("text/html"));
        assert!(response.text().contains("You're currently offline"));
        assert_eq!(response.source, ResponseSource::Fallback);
    }

    #[test]
    fn test_network_error() {
        let response = network_error("http://localhost:5173/src/main.ts");
        assert_eq!(response.status, 503);
        assert_eq!(response.content_type.as_deref(), Some("text/plain"));
        assert_eq!(response.text(), "Network error");
    }

    #[test]
    fn test_connection_error_page() {
        let response = connection_error_page("https://api.example.org/models");
        assert_eq!(response.status, 503);
        assert_eq!(response.content_type.as_deref(), Some("text/html"));
        assert!(response.text().contains("Connection Error"));
    }

    #[test]
    fn test_wants_offline_page() {
        assert!(wants_offline_page("http://localhost:5173/"));
        assert!(wants_offline_page("http://localhost:5173/index.html"));
        assert!(wants_offline_page("http://localhost:5173/index.html?v=2"));
        assert!(wants_offline_page("http://localhost:5173/docs/"));
        assert!(!wants_offline_page("http://localhost:5173/src/main.ts"));
    }
}
