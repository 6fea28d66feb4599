//! Client configuration: where the platform lives and how to authenticate.

use crate::{Error, ErrorContext, Result};
use std::env;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://dev.azure.com";
/// REST api-version spoken by the full-coverage HTTP transport.
pub const HTTP_API_VERSION: &str = "7.1";
/// Older api-version the SDK-style transport pins to.
pub const SDK_API_VERSION: &str = "5.1";

/// Connection settings for one organization/project pair.
///
/// Constructor-time only; the client clones this into both transports and the
/// fallback resolver at build time.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service root, without the organization segment.
    pub base_url: String,
    pub organization: String,
    pub project: String,
    /// Personal access token, sent as Basic auth.
    pub pat: String,
}

impl ClientConfig {
    pub fn new(
        organization: impl Into<String>,
        project: impl Into<String>,
        pat: impl Into<String>,
    ) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            organization: organization.into(),
            project: project.into(),
            pat: pat.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Load settings from `WORKLINK_ORG`, `WORKLINK_PROJECT`, `WORKLINK_PAT`
    /// and optionally `WORKLINK_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        let organization = require_env("WORKLINK_ORG")?;
        let project = require_env("WORKLINK_PROJECT")?;
        let pat = require_env("WORKLINK_PAT")?;
        let mut config = Self::new(organization, project, pat);
        if let Ok(base) = env::var("WORKLINK_BASE_URL") {
            if !base.trim().is_empty() {
                config.base_url = base;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Shape check: non-empty fields and a parseable base URL.
    pub fn validate(&self) -> Result<()> {
        if self.organization.trim().is_empty() {
            return Err(config_error("organization must not be empty", "organization"));
        }
        if self.project.trim().is_empty() {
            return Err(config_error("project must not be empty", "project"));
        }
        if self.pat.trim().is_empty() {
            return Err(config_error("personal access token must not be empty", "pat"));
        }
        Url::parse(&self.base_url)
            .map_err(|e| config_error(format!("invalid base URL: {}", e), "base_url"))?;
        Ok(())
    }

    /// Organization root, e.g. `https://dev.azure.com/fabrikam`.
    pub fn organization_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.organization
        )
    }

    /// Project root, e.g. `https://dev.azure.com/fabrikam/fleet`.
    pub fn project_url(&self) -> String {
        format!("{}/{}", self.organization_url(), self.project)
    }
}

fn config_error(msg: impl Into<String>, field: &str) -> Error {
    Error::validation_with_context(
        msg,
        ErrorContext::new().with_source("config").with_target(field),
    )
}

fn require_env(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(config_error(
            format!("environment variable {} is required", key),
            key,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organization_and_project_urls() {
        let config = ClientConfig::new("fabrikam", "fleet", "secret");
        assert_eq!(config.organization_url(), "https://dev.azure.com/fabrikam");
        assert_eq!(config.project_url(), "https://dev.azure.com/fabrikam/fleet");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config =
            ClientConfig::new("fabrikam", "fleet", "secret").with_base_url("http://localhost:8080/");
        assert_eq!(config.organization_url(), "http://localhost:8080/fabrikam");
    }

    #[test]
    fn validate_rejects_empty_fields() {
        assert!(ClientConfig::new("", "fleet", "secret").validate().is_err());
        assert!(ClientConfig::new("fabrikam", "", "secret").validate().is_err());
        assert!(ClientConfig::new("fabrikam", "fleet", "").validate().is_err());
        assert!(ClientConfig::new("fabrikam", "fleet", "secret")
            .with_base_url("not a url")
            .validate()
            .is_err());
        assert!(ClientConfig::new("fabrikam", "fleet", "secret")
            .validate()
            .is_ok());
    }
}
