//! Capture-side form model.
//!
//! Interest areas and triggers only live for the duration of one capture session. Their
//! ids are derived from catalog position at normalisation time, never assigned by the
//! server, so they are stable within a session and nowhere else.
//!
//! Entries are held behind `Arc` so that an edit replaces exactly one area (and, for a
//! trigger edit, exactly one trigger) while every other entry keeps its identity.

use crate::constants::{UNNAMED_INTEREST_PREFIX, UNTITLED_INTEREST_LABEL};
use portal_types::non_blank;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The editable list of interest areas of one capture session.
pub type InterestAreas = Vec<Arc<InterestArea>>;

/// Session-local interest area id (`observation_id + position`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterestAreaId(pub i64);

/// Session-local trigger id (`area_position * 1000 + trigger_position`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerId(pub i64);

impl fmt::Display for InterestAreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Time window a diary covers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRangeType {
    Today,
    #[default]
    SinceLast,
}

impl DateRangeType {
    /// Read a stored diary's `scope`. Anything other than `"today"` is "since last".
    pub fn from_scope(scope: Option<&str>) -> Self {
        match scope {
            Some("today") => Self::Today,
            _ => Self::SinceLast,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::SinceLast => "Since the last diary",
        }
    }

    /// The stored spelling: `"today"` or `"since_last"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::SinceLast => "since_last",
        }
    }

    pub(crate) fn to_wire(self) -> portal_wire::DateRangeTypeWire {
        match self {
            Self::Today => portal_wire::DateRangeTypeWire::Today,
            Self::SinceLast => portal_wire::DateRangeTypeWire::SinceLast,
        }
    }
}

impl std::str::FromStr for DateRangeType {
    type Err = crate::PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "today" => Ok(Self::Today),
            "since_last" | "sincelast" => Ok(Self::SinceLast),
            other => Err(crate::PortalError::InvalidInput(format!(
                "unknown date range '{other}' (expected 'today' or 'since-last')"
            ))),
        }
    }
}

/// A prompt nested under an interest area.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: TriggerId,
    /// Catalog text; also the key the answer is submitted under.
    pub name: String,
    /// User-defined text shown instead of `name`.
    pub custom_name: Option<String>,
    /// Concept vocabulary id; 0 when synthetic.
    pub concept_id: i64,
    pub response: Option<String>,
    pub shared: bool,
}

impl Trigger {
    /// A catalog trigger with no answer yet.
    pub fn new(id: TriggerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            custom_name: None,
            concept_id: 0,
            response: None,
            shared: false,
        }
    }

    /// Text to show for this trigger.
    pub fn label(&self) -> &str {
        non_blank(self.custom_name.as_deref()).unwrap_or(&self.name)
    }

    /// `true` when the response has a non-whitespace character.
    pub fn is_answered(&self) -> bool {
        non_blank(self.response.as_deref()).is_some()
    }
}

/// A topic the diary solicits input about, with its triggers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestArea {
    pub id: InterestAreaId,
    /// Catalog name; `None` when the catalog key was empty.
    pub name: Option<String>,
    /// Display label for areas that carry no catalog name.
    pub custom_name: Option<String>,
    pub concept_id: i64,
    pub response: Option<String>,
    pub shared: bool,
    pub triggers: Vec<Arc<Trigger>>,
}

impl InterestArea {
    /// A catalog interest area with no answers yet.
    pub fn new(id: InterestAreaId, name: Option<String>, triggers: Vec<Trigger>) -> Self {
        Self {
            id,
            name,
            custom_name: None,
            concept_id: 0,
            response: None,
            shared: false,
            triggers: triggers.into_iter().map(Arc::new).collect(),
        }
    }

    /// Key this area is submitted under: its name, or `interest_<id>` without one.
    pub fn submission_key(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{UNNAMED_INTEREST_PREFIX}{}", self.id),
        }
    }

    /// Text to show for this area.
    pub fn label(&self) -> &str {
        non_blank(self.name.as_deref())
            .or_else(|| non_blank(self.custom_name.as_deref()))
            .unwrap_or(UNTITLED_INTEREST_LABEL)
    }

    /// `true` when the area response or any trigger response is non-blank.
    pub fn is_answered(&self) -> bool {
        non_blank(self.response.as_deref()).is_some() || self.triggers.iter().any(|t| t.is_answered())
    }

    /// `true` when the area or any of its triggers is flagged for sharing.
    pub fn has_shared_flag(&self) -> bool {
        self.shared || self.triggers.iter().any(|t| t.shared)
    }

    pub fn trigger(&self, id: TriggerId) -> Option<&Trigger> {
        self.triggers.iter().map(Arc::as_ref).find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_key_falls_back_for_unnamed_areas() {
        let named = InterestArea::new(InterestAreaId(10), Some("Sleep".into()), vec![]);
        assert_eq!(named.submission_key(), "Sleep");

        let unnamed = InterestArea::new(InterestAreaId(7), None, vec![]);
        assert_eq!(unnamed.submission_key(), "interest_7");

        let empty = InterestArea::new(InterestAreaId(8), Some(String::new()), vec![]);
        assert_eq!(empty.submission_key(), "interest_8");
    }

    #[test]
    fn answered_ignores_whitespace() {
        let mut area = InterestArea::new(
            InterestAreaId(1),
            Some("Mood".into()),
            vec![Trigger::new(TriggerId(0), "Energy?")],
        );
        area.response = Some("   ".into());
        assert!(!area.is_answered());

        let mut trigger = Trigger::new(TriggerId(0), "Energy?");
        trigger.response = Some(" low ".into());
        area.triggers = vec![Arc::new(trigger)];
        assert!(area.is_answered());
    }

    #[test]
    fn labels_prefer_custom_text_for_triggers() {
        let mut trigger = Trigger::new(TriggerId(3), "Catalog text");
        assert_eq!(trigger.label(), "Catalog text");
        trigger.custom_name = Some("My words".into());
        assert_eq!(trigger.label(), "My words");
    }

    #[test]
    fn date_range_parses_cli_spellings() {
        assert_eq!("today".parse::<DateRangeType>().unwrap(), DateRangeType::Today);
        assert_eq!(
            "since-last".parse::<DateRangeType>().unwrap(),
            DateRangeType::SinceLast
        );
        assert!("yesterday".parse::<DateRangeType>().is_err());
    }

    #[test]
    fn scope_reads_anything_but_today_as_since_last() {
        assert_eq!(DateRangeType::from_scope(Some("today")), DateRangeType::Today);
        assert_eq!(
            DateRangeType::from_scope(Some("since_last")),
            DateRangeType::SinceLast
        );
        assert_eq!(DateRangeType::from_scope(None), DateRangeType::SinceLast);
    }
}
