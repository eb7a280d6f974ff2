//! Stored diary wire model (`GET /diaries/{id}/`).
//!
//! Stored diaries come in more than one layout. Current records group trigger answers
//! under `{interest, shared_with_provider, triggers}`; older records list flat
//! per-area rows, and some trigger values are double-wrapped as `{value: ...}`. The
//! models below accept all of them and never fail on a field of the wrong kind, so
//! that shape decisions can be made by the caller.

use crate::{from_value_with_path, lenient, WireResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Wire representation of a stored diary.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct DiaryRes {
    /// Identifier as sent by the server (number or string). Kept raw so that a falsy
    /// identifier can be told apart from a missing one.
    #[serde(default)]
    pub diary_id: Option<Value>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub date: Option<String>,

    /// `"today"` or `"since_last"`.
    #[serde(default, deserialize_with = "lenient::string")]
    pub scope: Option<String>,

    #[serde(default, deserialize_with = "lenient::list")]
    pub entries: Vec<DiaryEntryRes>,

    #[serde(default, deserialize_with = "lenient::list")]
    pub interest_areas: Vec<DiaryInterestAreaRes>,
}

/// A flat free-text record.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct DiaryEntryRes {
    #[serde(default, deserialize_with = "lenient::integer")]
    pub observation_id: Option<i64>,

    /// Only string values count; anything else reads as absent.
    #[serde(default, deserialize_with = "lenient::string")]
    pub value_as_string: Option<String>,

    #[serde(default, deserialize_with = "lenient::flag")]
    pub shared_with_provider: bool,

    #[serde(default, deserialize_with = "lenient::string")]
    pub created_at: Option<String>,
}

/// One element of `interest_areas`, in whichever layout it was stored.
///
/// Only the current layout populates both `interest` and `triggers`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct DiaryInterestAreaRes {
    #[serde(default, deserialize_with = "lenient::string")]
    pub interest: Option<String>,

    #[serde(default, deserialize_with = "lenient::flag")]
    pub shared_with_provider: bool,

    /// `None` unless the server sent an array.
    #[serde(default, deserialize_with = "trigger_list")]
    pub triggers: Option<Vec<DiaryTriggerRes>>,
}

/// One trigger answer of the current layout.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct DiaryTriggerRes {
    #[serde(default, deserialize_with = "lenient::string")]
    pub trigger: Option<String>,

    #[serde(default)]
    pub value: Option<TriggerValue>,
}

/// A trigger answer as stored: a plain string, or an object wrapping the answer in
/// its own `value` field (possibly more than once).
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum TriggerValue {
    Plain(String),
    Wrapped { value: Option<Box<TriggerValue>> },
    Other(Value),
}

impl TriggerValue {
    /// Classify a raw JSON trigger value.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Plain(s),
            Value::Object(mut map) => Self::Wrapped {
                value: map
                    .remove("value")
                    .filter(|inner| !inner.is_null())
                    .map(|inner| Box::new(Self::from_json(inner))),
            },
            other => Self::Other(other),
        }
    }
}

impl<'de> Deserialize<'de> for TriggerValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self::from_json(Value::deserialize(deserializer)?))
    }
}

impl DiaryRes {
    /// Parse a stored diary from an already-decoded JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WireError::Translation`] with the failing path when the body is
    /// not an object.
    pub fn from_value(value: Value) -> WireResult<Self> {
        if !value.is_object() {
            return Err(crate::WireError::InvalidInput(format!(
                "diary body must be an object, got {}",
                kind_of(&value)
            )));
        }
        from_value_with_path(value, "Diary")
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn trigger_list<'de, D>(deserializer: D) -> Result<Option<Vec<DiaryTriggerRes>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        _ => None,
    })
}
