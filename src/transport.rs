//! Authenticated HTTP plumbing shared by both transports.
//!
//! Maps non-2xx responses into the structured error kinds the retry policy
//! and fallback protocol branch on. Carries a hard request timeout so an
//! unresponsive upstream cannot block a logical flow forever.

use crate::config::ClientConfig;
use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::env;
use std::time::Duration;

/// Content type for work-item patch documents.
pub const JSON_PATCH: &str = "application/json-patch+json";

pub(crate) struct RestTransport {
    client: reqwest::Client,
}

impl RestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let timeout_secs = env::var("WORKLINK_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        let mut headers = HeaderMap::new();
        // PAT goes out as Basic auth with an empty user name.
        let token = BASE64.encode(format!(":{}", config.pat));
        let mut auth = HeaderValue::from_str(&format!("Basic {}", token))
            .map_err(|_| Error::validation("personal access token contains invalid characters"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    /// Issue a request and decode the JSON body; empty 2xx bodies come back
    /// as `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        content_type: Option<&'static str>,
    ) -> Result<Value> {
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = match content_type {
                Some(ct) => request
                    .header(reqwest::header::CONTENT_TYPE, ct)
                    .body(serde_json::to_vec(body)?),
                None => request.json(body),
            };
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status.as_u16(), message));
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn get(&self, url: &str) -> Result<Value> {
        self.request(Method::GET, url, None, None).await
    }

    pub async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        self.request(Method::POST, url, Some(body), None).await
    }

    pub async fn patch(&self, url: &str, body: &Value) -> Result<Value> {
        self.request(Method::PATCH, url, Some(body), None).await
    }

    pub async fn put(&self, url: &str, body: &Value) -> Result<Value> {
        self.request(Method::PUT, url, Some(body), None).await
    }

    pub async fn delete(&self, url: &str) -> Result<Value> {
        self.request(Method::DELETE, url, None, None).await
    }

    /// POST/PATCH with a JSON-patch document body.
    pub async fn send_patch_document(
        &self,
        method: Method,
        url: &str,
        document: &Value,
    ) -> Result<Value> {
        self.request(method, url, Some(document), Some(JSON_PATCH))
            .await
    }
}

/// Append `api-version` to a path that may already carry a query string.
pub(crate) fn with_api_version(url: String, api_version: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}api-version={}", url, sep, api_version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_version_uses_correct_separator() {
        assert_eq!(
            with_api_version("http://x/_apis/wit/wiql".to_string(), "7.1"),
            "http://x/_apis/wit/wiql?api-version=7.1"
        );
        assert_eq!(
            with_api_version("http://x/_apis/wit/workitems?ids=1,2".to_string(), "7.1"),
            "http://x/_apis/wit/workitems?ids=1,2&api-version=7.1"
        );
    }
}
