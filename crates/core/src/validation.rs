//! Input validation utilities.
//!
//! This module contains functions for validating configuration inputs before they are
//! used to build backend requests.

use crate::{PortalError, PortalResult};

/// Validates that a backend base URL is usable as a request prefix.
///
/// Every backend path is appended to this value, so it is checked once at startup:
/// - Rejects empty or whitespace-only strings
/// - Requires an `http://` or `https://` scheme
/// - Restricts characters to visible ASCII without whitespace
///
/// # Arguments
///
/// * `url` - The base URL to validate.
///
/// # Errors
///
/// Returns a `PortalError::InvalidInput` if the URL is invalid.
pub fn validate_backend_url(url: &str) -> PortalResult<()> {
    const MAX_URL_LEN: usize = 2048;

    if url.trim().is_empty() {
        return Err(PortalError::InvalidInput(
            "backend URL cannot be empty".into(),
        ));
    }

    if url.len() > MAX_URL_LEN {
        return Err(PortalError::InvalidInput(format!(
            "backend URL exceeds maximum length of {} characters",
            MAX_URL_LEN
        )));
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(PortalError::InvalidInput(
            "backend URL must start with http:// or https://".into(),
        ));
    }

    if !url.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(PortalError::InvalidInput(
            "backend URL must contain only visible ASCII characters".into(),
        ));
    }

    Ok(())
}
