use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;
use ureq::{http::Response, Body};

use crate::{
    error::{DownloadError, Result},
    http_client::SHARED_AGENT,
};

pub struct Http;

impl Http {
    /// Sends a GET request and returns the response once headers arrive.
    ///
    /// Non-2xx statuses are turned into [`DownloadError::NotFound`] or
    /// [`DownloadError::HttpError`].
    pub fn fetch(url: &str, timeout: Duration) -> Result<Response<Body>> {
        debug!("GET {url}");
        SHARED_AGENT
            .get(url)
            .config()
            .timeout_global(Some(timeout))
            .build()
            .call()
            .map_err(|err| DownloadError::from_ureq(url, err, None))
    }

    /// Fetches `url` and decodes the body as JSON, reading at most `limit` bytes.
    pub fn json<T: DeserializeOwned>(url: &str, timeout: Duration, limit: u64) -> Result<T> {
        debug!("GET {url} (json, limit {limit})");
        let mut resp = SHARED_AGENT
            .get(url)
            .header("Accept", "application/json")
            .config()
            .timeout_global(Some(timeout))
            .build()
            .call()
            .map_err(|err| DownloadError::from_ureq(url, err, Some(limit)))?;

        resp.body_mut()
            .with_config()
            .limit(limit)
            .read_json()
            .map_err(|err| DownloadError::from_ureq(url, err, Some(limit)))
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Server, ServerGuard};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Doc {
        name: String,
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn serve_json(status: usize, body: &str) -> (ServerGuard, mockito::Mock) {
        let mut server = Server::new();
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create();
        (server, mock)
    }

    #[test]
    fn test_json_decodes_body() {
        let (server, mock) = serve_json(200, r#"{"name":"left-pad"}"#);
        let doc: Doc = Http::json(&format!("{}/left-pad", server.url()), TIMEOUT, 1024).unwrap();
        assert_eq!(doc.name, "left-pad");
        mock.assert();
    }

    #[test]
    fn test_json_not_found() {
        let (server, _mock) = serve_json(404, r#"{"error":"Not found"}"#);
        let err = Http::json::<Doc>(&format!("{}/nope", server.url()), TIMEOUT, 1024).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_json_respects_limit() {
        let body = format!(r#"{{"name":"{}"}}"#, "x".repeat(4096));
        let (server, _mock) = serve_json(200, &body);
        let err = Http::json::<Doc>(&format!("{}/big", server.url()), TIMEOUT, 128).unwrap_err();
        assert!(matches!(err, DownloadError::TooLarge { limit: 128, .. }));
    }

    #[test]
    fn test_json_rejects_garbage() {
        let (server, _mock) = serve_json(200, "not json");
        let err = Http::json::<Doc>(&format!("{}/bad", server.url()), TIMEOUT, 1024).unwrap_err();
        assert!(matches!(err, DownloadError::InvalidResponse { .. }));
    }
}
