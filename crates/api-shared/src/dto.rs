//! REST/CLI data transfer objects.
//!
//! Each DTO mirrors one core type with plain field types so that it can carry an
//! OpenAPI schema. Conversions from the core types live next to the DTOs.

use portal_core::{
    CaptureProgress, CaptureSession, FoldedSubmission, GeneralNote, InterestArea,
    InterestSection, NameCollision, PlaybackView, Trigger, TriggerAnswer,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================================================
// Health
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

// ============================================================================
// Capture
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TriggerDto {
    pub id: i64,
    pub name: String,
    pub label: String,
    pub response: Option<String>,
    pub shared: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InterestAreaDto {
    pub id: i64,
    pub name: Option<String>,
    pub label: String,
    /// Key the area's answers are submitted under.
    pub submission_key: String,
    pub response: Option<String>,
    pub shared: bool,
    pub answered: bool,
    pub triggers: Vec<TriggerDto>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProgressDto {
    pub answered: usize,
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CaptureSessionRes {
    pub id: String,
    /// `today` or `since_last`.
    pub date_range_type: String,
    pub free_text: String,
    pub share_text: bool,
    /// `true` when the areas are the placeholder rather than the patient's catalog.
    pub degraded: bool,
    pub in_flight: bool,
    pub progress: ProgressDto,
    pub areas: Vec<InterestAreaDto>,
}

/// Diary-level fields; absent fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateFieldsReq {
    /// `today`, `since_last` or `since-last`.
    pub date_range_type: Option<String>,
    pub free_text: Option<String>,
    pub share_text: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResponseReq {
    pub response: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SharedReq {
    pub shared: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NameCollisionDto {
    pub area: String,
    pub key: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PreviewRes {
    /// The exact body that would be posted to the backend.
    #[schema(value_type = Object)]
    pub body: serde_json::Value,
    pub name_collisions: Vec<NameCollisionDto>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubmitRes {
    pub submitted: bool,
    pub answered_areas: usize,
}

impl From<&Trigger> for TriggerDto {
    fn from(trigger: &Trigger) -> Self {
        Self {
            id: trigger.id.0,
            name: trigger.name.clone(),
            label: trigger.label().to_string(),
            response: trigger.response.clone(),
            shared: trigger.shared,
        }
    }
}

impl From<&InterestArea> for InterestAreaDto {
    fn from(area: &InterestArea) -> Self {
        Self {
            id: area.id.0,
            name: area.name.clone(),
            label: area.label().to_string(),
            submission_key: area.submission_key(),
            response: area.response.clone(),
            shared: area.shared,
            answered: area.is_answered(),
            triggers: area.triggers.iter().map(|t| TriggerDto::from(t.as_ref())).collect(),
        }
    }
}

impl From<CaptureProgress> for ProgressDto {
    fn from(progress: CaptureProgress) -> Self {
        Self {
            answered: progress.answered,
            total: progress.total,
        }
    }
}

impl CaptureSessionRes {
    pub fn from_session(id: impl Into<String>, session: &CaptureSession) -> Self {
        let fields = session.fields();
        Self {
            id: id.into(),
            date_range_type: fields.date_range_type.as_str().to_string(),
            free_text: fields.free_text.clone(),
            share_text: fields.share_text,
            degraded: session.is_degraded(),
            in_flight: session.is_in_flight(),
            progress: session.progress().into(),
            areas: session
                .areas()
                .iter()
                .map(|area| InterestAreaDto::from(area.as_ref()))
                .collect(),
        }
    }
}

impl From<&NameCollision> for NameCollisionDto {
    fn from(collision: &NameCollision) -> Self {
        Self {
            area: collision.area.clone(),
            key: collision.key.clone(),
        }
    }
}

impl PreviewRes {
    /// # Errors
    ///
    /// Returns a serialisation error if the wire body cannot be represented as JSON.
    pub fn from_folded(folded: &FoldedSubmission) -> Result<Self, serde_json::Error> {
        Ok(Self {
            body: serde_json::to_value(folded.payload.to_wire())?,
            name_collisions: folded.name_collisions.iter().map(Into::into).collect(),
        })
    }
}

// ============================================================================
// Playback
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeneralNoteDto {
    pub text: String,
    pub shared: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TriggerAnswerDto {
    pub label: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InterestSectionDto {
    pub title: String,
    pub shared: bool,
    pub answers: Vec<TriggerAnswerDto>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlaybackViewRes {
    pub diary_id: String,
    pub date: Option<String>,
    pub date_display: Option<String>,
    pub scope: String,
    pub scope_label: String,
    pub general_note: Option<GeneralNoteDto>,
    pub sections: Vec<InterestSectionDto>,
    pub has_content: bool,
}

impl From<&GeneralNote> for GeneralNoteDto {
    fn from(note: &GeneralNote) -> Self {
        Self {
            text: note.text.clone(),
            shared: note.shared,
        }
    }
}

impl From<&TriggerAnswer> for TriggerAnswerDto {
    fn from(answer: &TriggerAnswer) -> Self {
        Self {
            label: answer.label.clone(),
            value: answer.value.clone(),
        }
    }
}

impl From<&InterestSection> for InterestSectionDto {
    fn from(section: &InterestSection) -> Self {
        Self {
            title: section.title.clone(),
            shared: section.shared,
            answers: section.answers.iter().map(Into::into).collect(),
        }
    }
}

impl From<&PlaybackView> for PlaybackViewRes {
    fn from(view: &PlaybackView) -> Self {
        Self {
            diary_id: view.diary_id.clone(),
            date: view.date.clone(),
            date_display: view.date_display.clone(),
            scope: view.scope.as_str().to_string(),
            scope_label: view.scope_label.clone(),
            general_note: view.general_note.as_ref().map(Into::into),
            sections: view.sections.iter().map(Into::into).collect(),
            has_content: view.has_content,
        }
    }
}
