//! Wire/boundary models for the patient portal backend.
//!
//! This crate provides **wire models** and **parse helpers** for the three backend
//! endpoints the diary pipelines consume:
//! - `GET /person/interest-areas` (the interest catalog)
//! - `POST /diaries/` (diary creation)
//! - `GET /diaries/{id}/` (a stored diary)
//!
//! The backend is loosely typed: values change shape between deployments and older
//! records use older layouts. Models here are therefore lenient on input and exact on
//! output. Deciding what a shape *means* is left to `portal-core`.

pub mod catalog;
pub mod diary;
pub mod submission;

pub use catalog::{CatalogBody, CatalogRes};
pub use diary::{DiaryEntryRes, DiaryInterestAreaRes, DiaryRes, DiaryTriggerRes, TriggerValue};
pub use submission::{
    DateRangeTypeWire, DiaryCreateReq, InterestAreaDictWire, InterestAreaWire, TriggerDictEntry,
};

/// Errors returned by the `portal-wire` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`WireError`].
pub type WireResult<T> = Result<T, WireError>;

/// Deserialise `value` into `T`, reporting the failing field path on mismatch.
pub(crate) fn from_value_with_path<T>(value: serde_json::Value, what: &str) -> WireResult<T>
where
    T: serde::de::DeserializeOwned,
{
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let path = err.path().to_string();
        let source = err.into_inner();
        let path = if path.is_empty() {
            "<root>"
        } else {
            path.as_str()
        };
        WireError::Translation(format!("{what} schema mismatch at {path}: {source}"))
    })
}

/// JavaScript-style truthiness, which is how the backend's flags have always been read.
pub fn truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value;

    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub(crate) mod lenient {
    //! Field deserialisers that degrade instead of failing.

    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// A string field; any non-string value reads as absent.
    pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => Some(s),
            _ => None,
        })
    }

    /// A flag field read with truthiness.
    pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Value>::deserialize(deserializer)?
            .as_ref()
            .is_some_and(super::truthy))
    }

    /// An integer field. Whole floats such as `10.0` count; anything else reads as absent.
    pub fn integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| whole_number(&v)))
    }

    fn whole_number(value: &Value) -> Option<i64> {
        let Value::Number(n) = value else {
            return None;
        };
        if let Some(i) = n.as_i64() {
            return Some(i);
        }
        n.as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| f as i64)
    }

    /// A list field where `null` reads as empty.
    ///
    /// The container must be a list. Elements are read one at a time and any element that
    /// does not fit `T` is skipped.
    pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(Option::<Vec<Value>>::deserialize(deserializer)?
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect())
    }
}
