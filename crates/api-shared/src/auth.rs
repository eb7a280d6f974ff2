/// Reasons a request fails the API key check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing x-api-key header")]
    Missing,
    #[error("invalid API key")]
    Invalid,
}

/// Name of the header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Validates the provided API key against the expected key.
///
/// The expected key is read once at startup; pass it in rather than reading the
/// environment per request.
///
/// # Errors
///
/// Returns [`AuthError::Missing`] when no key was provided and [`AuthError::Invalid`] when
/// it does not match.
pub fn validate_api_key(provided_key: Option<&str>, expected_key: &str) -> Result<(), AuthError> {
    match provided_key {
        None => Err(AuthError::Missing),
        Some(key) if key == expected_key => Ok(()),
        Some(_) => Err(AuthError::Invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_api_key() {
        assert_eq!(validate_api_key(Some("k1"), "k1"), Ok(()));
        assert_eq!(validate_api_key(Some("k2"), "k1"), Err(AuthError::Invalid));
        assert_eq!(validate_api_key(None, "k1"), Err(AuthError::Missing));
    }
}
