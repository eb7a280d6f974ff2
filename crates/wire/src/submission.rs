//! Diary creation wire model (`POST /diaries/`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire spelling of the time window a diary covers.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DateRangeTypeWire {
    Today,
    SinceLast,
}

/// Request body accepted by the diary-create endpoint.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct DiaryCreateReq {
    pub date_range_type: DateRangeTypeWire,
    pub text: String,
    pub text_shared: bool,
    pub diary_shared: bool,
    pub interest_areas: InterestAreaDictWire,
}

/// The backend expects the per-area map wrapped in an `interest_area_dict` object.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct InterestAreaDictWire {
    pub interest_area_dict: BTreeMap<String, InterestAreaWire>,
}

/// One answered interest area.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct InterestAreaWire {
    pub trigger_dict: BTreeMap<String, TriggerDictEntry>,
}

/// A value in `trigger_dict`.
///
/// Trigger answers carry their local `trigger_id`; the area-level answer stored under
/// `general_response` does not.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum TriggerDictEntry {
    Trigger {
        trigger_id: i64,
        value: String,
        shared: bool,
    },
    General {
        value: String,
        shared: bool,
    },
}

impl DiaryCreateReq {
    /// Render the request body as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WireError::InvalidJson`] if serialisation fails.
    pub fn render(&self) -> crate::WireResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
