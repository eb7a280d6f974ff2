//! Shape-aware rendering of a stored diary (playback pipeline).
//!
//! Ingestion resolves every layout difference once: trigger values become a single
//! canonical string, flags become booleans and the identifier becomes text. Rendering
//! then only has to decide what is worth showing.

use crate::constants::{UNTITLED_INTEREST_LABEL, UNTITLED_TRIGGER_LABEL};
use crate::diary::model::DateRangeType;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use portal_types::{is_blank, non_blank};
use portal_wire::{DiaryInterestAreaRes, DiaryRes, TriggerValue};
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// Ingested diary
// ============================================================================

/// A stored diary after ingestion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredDiary {
    pub diary_id: String,
    pub date: Option<String>,
    pub scope: DateRangeType,
    pub entries: Vec<StoredEntry>,
    pub interest_areas: Vec<StoredInterestArea>,
}

/// A flat free-text record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEntry {
    pub text: Option<String>,
    pub shared: bool,
}

/// One stored interest area. `triggers` is `None` for layouts without a trigger list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredInterestArea {
    pub interest: Option<String>,
    pub shared: bool,
    pub triggers: Option<Vec<StoredTrigger>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredTrigger {
    pub label: Option<String>,
    pub value: Option<String>,
}

/// Resolve a stored trigger value to the string it carries.
///
/// Wrapped values are unwrapped down to the innermost value. Non-zero numbers and `true`
/// use their text form. `false`, `0`, `null`, arrays and empty wrappers carry nothing, so
/// a falsy stored value never renders as an answer.
pub fn canonical_value(value: &TriggerValue) -> Option<String> {
    match value {
        TriggerValue::Plain(s) => Some(s.clone()),
        TriggerValue::Wrapped { value } => value.as_deref().and_then(canonical_value),
        TriggerValue::Other(v) if !portal_wire::truthy(v) => None,
        TriggerValue::Other(Value::Number(n)) => Some(n.to_string()),
        TriggerValue::Other(Value::Bool(b)) => Some(b.to_string()),
        TriggerValue::Other(_) => None,
    }
}

impl StoredDiary {
    /// Ingest a parsed wire diary.
    ///
    /// Returns `None` when `diary_id` is missing or falsy (`0`, `""`, `false`, `null`).
    pub fn from_wire(res: DiaryRes) -> Option<Self> {
        let diary_id = match res.diary_id {
            Some(id) if portal_wire::truthy(&id) => match id {
                Value::String(s) => s,
                other => other.to_string(),
            },
            _ => return None,
        };

        Some(Self {
            diary_id,
            date: res.date,
            scope: DateRangeType::from_scope(res.scope.as_deref()),
            entries: res
                .entries
                .into_iter()
                .map(|entry| StoredEntry {
                    text: entry.value_as_string,
                    shared: entry.shared_with_provider,
                })
                .collect(),
            interest_areas: res.interest_areas.into_iter().map(ingest_area).collect(),
        })
    }
}

fn ingest_area(area: DiaryInterestAreaRes) -> StoredInterestArea {
    StoredInterestArea {
        interest: area.interest,
        shared: area.shared_with_provider,
        triggers: area.triggers.map(|triggers| {
            triggers
                .into_iter()
                .map(|t| StoredTrigger {
                    label: t.trigger,
                    value: t.value.as_ref().and_then(canonical_value),
                })
                .collect()
        }),
    }
}

// ============================================================================
// Rendered view
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GeneralNote {
    pub text: String,
    pub shared: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TriggerAnswer {
    pub label: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InterestSection {
    pub title: String,
    pub shared: bool,
    pub answers: Vec<TriggerAnswer>,
}

/// Read-only view of a stored diary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlaybackView {
    pub diary_id: String,
    /// Date as stored.
    pub date: Option<String>,
    /// `dd/mm/yyyy` when the stored date could be read, otherwise the stored text.
    pub date_display: Option<String>,
    pub scope: DateRangeType,
    pub scope_label: String,
    pub general_note: Option<GeneralNote>,
    pub sections: Vec<InterestSection>,
    /// `false` means the "no content" placeholder should be shown instead.
    pub has_content: bool,
}

/// Select what to show for a stored diary.
///
/// The general note is the first entry with non-blank text. Only areas in the current
/// layout (an interest name and a trigger list) become sections, and only when at least
/// one trigger has a non-empty value.
pub fn render_diary(diary: &StoredDiary) -> PlaybackView {
    let general_note = diary.entries.iter().find_map(|entry| {
        non_blank(entry.text.as_deref()).map(|text| GeneralNote {
            text: text.to_string(),
            shared: entry.shared,
        })
    });

    let sections: Vec<InterestSection> = diary
        .interest_areas
        .iter()
        .filter_map(render_section)
        .collect();

    let has_content = general_note.is_some() || !sections.is_empty();

    PlaybackView {
        diary_id: diary.diary_id.clone(),
        date: diary.date.clone(),
        date_display: diary.date.as_deref().map(format_date),
        scope: diary.scope,
        scope_label: diary.scope.label().to_string(),
        general_note,
        sections,
        has_content,
    }
}

fn render_section(area: &StoredInterestArea) -> Option<InterestSection> {
    let interest = area.interest.as_deref().filter(|name| !name.is_empty())?;
    let triggers = area.triggers.as_ref()?;

    let answers: Vec<TriggerAnswer> = triggers
        .iter()
        .filter_map(|trigger| {
            let value = trigger.value.as_deref().filter(|v| !v.is_empty())?;
            Some(TriggerAnswer {
                label: non_blank(trigger.label.as_deref())
                    .unwrap_or(UNTITLED_TRIGGER_LABEL)
                    .to_string(),
                value: value.to_string(),
            })
        })
        .collect();

    if answers.is_empty() {
        return None;
    }

    let title = if is_blank(interest) {
        UNTITLED_INTEREST_LABEL
    } else {
        interest
    };

    Some(InterestSection {
        title: title.to_string(),
        shared: area.shared,
        answers,
    })
}

/// Format a stored date as `dd/mm/yyyy`, falling back to the stored text.
pub fn format_date(raw: &str) -> String {
    let trimmed = raw.trim();
    let date = DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|dt| dt.date())
                .ok()
        });

    match date {
        Some(date) => date.format("%d/%m/%Y").to_string(),
        None => raw.to_string(),
    }
}
