//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Binaries read the environment (after loading `.env`) and hand the
//! raw values to the `*_from_env_value` helpers below; nothing in request handling reads
//! process-wide environment variables.

use crate::constants::{DEFAULT_BACKEND_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::validation::validate_backend_url;
use crate::{PortalError, PortalResult};
use std::time::Duration;

/// What the capture pipeline shows when the interest catalog cannot be loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CatalogFallback {
    /// Surface the failure as an error state.
    #[default]
    ErrorState,
    /// Show the built-in sample interest area instead (development use).
    Placeholder,
}

impl std::str::FromStr for CatalogFallback {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::ErrorState),
            "placeholder" => Ok(Self::Placeholder),
            other => Err(PortalError::InvalidInput(format!(
                "unknown catalog fallback '{other}' (expected 'error' or 'placeholder')"
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct PortalConfig {
    backend_url: String,
    access_token: Option<String>,
    request_timeout: Duration,
    catalog_fallback: CatalogFallback,
}

impl PortalConfig {
    /// Create a new `PortalConfig`.
    ///
    /// A trailing `/` on `backend_url` is dropped so that endpoint paths can be appended
    /// directly.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::InvalidInput` if the URL is invalid or the timeout is zero.
    pub fn new(
        backend_url: impl Into<String>,
        access_token: Option<String>,
        request_timeout: Duration,
        catalog_fallback: CatalogFallback,
    ) -> PortalResult<Self> {
        let backend_url = backend_url.into().trim().trim_end_matches('/').to_string();
        validate_backend_url(&backend_url)?;

        if request_timeout.is_zero() {
            return Err(PortalError::InvalidInput(
                "request timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            backend_url,
            access_token,
            request_timeout,
            catalog_fallback,
        })
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn catalog_fallback(&self) -> CatalogFallback {
        self.catalog_fallback
    }
}

/// Parse the backend base URL from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_BACKEND_URL`].
pub fn backend_url_from_env_value(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.into())
}

/// Parse the bearer token from an optional string value; blank means "no token".
pub fn access_token_from_env_value(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the request timeout (whole seconds) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default of
/// [`DEFAULT_REQUEST_TIMEOUT_SECS`].
pub fn request_timeout_from_env_value(value: Option<String>) -> PortalResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let secs = match value {
        Some(v) => v.parse::<u64>().map_err(|e| {
            PortalError::InvalidInput(format!("invalid request timeout '{v}': {e}"))
        })?,
        None => DEFAULT_REQUEST_TIMEOUT_SECS,
    };

    Ok(Duration::from_secs(secs))
}

/// Parse the catalog fallback policy from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`CatalogFallback::ErrorState`].
pub fn catalog_fallback_from_env_value(value: Option<String>) -> PortalResult<CatalogFallback> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| v.parse::<CatalogFallback>()).transpose()?;

    Ok(parsed.unwrap_or_default())
}

/// Resolve a full [`PortalConfig`] from raw environment values.
///
/// # Arguments
///
/// * `backend_url` - `PORTAL_BACKEND_URL`
/// * `access_token` - `PORTAL_ACCESS_TOKEN`
/// * `request_timeout` - `PORTAL_REQUEST_TIMEOUT_SECS`
/// * `catalog_fallback` - `PORTAL_CATALOG_FALLBACK`
///
/// # Errors
///
/// Returns `PortalError::InvalidInput` if any value is invalid.
pub fn config_from_env_values(
    backend_url: Option<String>,
    access_token: Option<String>,
    request_timeout: Option<String>,
    catalog_fallback: Option<String>,
) -> PortalResult<PortalConfig> {
    PortalConfig::new(
        backend_url_from_env_value(backend_url),
        access_token_from_env_value(access_token),
        request_timeout_from_env_value(request_timeout)?,
        catalog_fallback_from_env_value(catalog_fallback)?,
    )
}
