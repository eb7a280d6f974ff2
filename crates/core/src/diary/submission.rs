//! Folding the form model into a diary submission (capture pipeline egress).
//!
//! Only answered entries are sent. Within an area, answers are collected by trigger id and
//! projected to trigger *names* at the end, because the backend keys `trigger_dict` by
//! name. Two triggers with the same name in one area collapse to the later one; every
//! such overwrite is reported in [`FoldedSubmission::name_collisions`].

use crate::backend::{BackendError, PortalBackend};
use crate::constants::GENERAL_RESPONSE_KEY;
use crate::diary::model::{DateRangeType, InterestArea, TriggerId};
use portal_types::non_blank;
use portal_wire::{DiaryCreateReq, InterestAreaDictWire, InterestAreaWire, TriggerDictEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Diary-level fields captured alongside the interest areas.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryFields {
    pub date_range_type: DateRangeType,
    pub free_text: String,
    pub share_text: bool,
}

/// One value of an area's answer dictionary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerEntry {
    /// The area-level response, stored under `general_response`.
    General { value: String, shared: bool },
    /// A trigger response, stored under the trigger's name.
    Trigger {
        trigger_id: TriggerId,
        value: String,
        shared: bool,
    },
}

/// Answers of one included interest area, keyed as the backend expects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaSubmission {
    pub trigger_dict: BTreeMap<String, AnswerEntry>,
}

/// The answered subset of a capture session, ready to send.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub date_range_type: DateRangeType,
    pub text: String,
    pub text_shared: bool,
    /// `text_shared`, or any area/trigger sharing flag in the whole form.
    pub diary_shared: bool,
    pub interest_areas: BTreeMap<String, AreaSubmission>,
}

/// A key written twice while folding; the later value won.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameCollision {
    /// Submission key of the area.
    pub area: String,
    /// Trigger-dictionary key that was overwritten; `None` when the whole area key was.
    pub key: Option<String>,
}

/// Result of [`fold_submission`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoldedSubmission {
    pub payload: SubmissionPayload,
    pub name_collisions: Vec<NameCollision>,
}

/// Submission failures, each mapped to what the form shows.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("a submission is already in flight")]
    AlreadyInFlight,
    #[error("diary submission failed: {0}")]
    Failed(#[from] BackendError),
}

impl SubmissionError {
    /// Message suitable for the person filling in the diary.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::AlreadyInFlight => "Your diary is already being saved.",
            Self::Failed(_) => "Something went wrong while saving your diary. Please try again.",
        }
    }

    /// Whether resubmitting the same form may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

pub type SubmissionResult<T> = std::result::Result<T, SubmissionError>;

/// Fold the form into a submission payload.
///
/// An area is included iff its own response or any trigger response is non-blank. Within
/// an included area, `general_response` carries the area response when it is non-blank and
/// each answered trigger is keyed by its name. Response text is sent as typed.
pub fn fold_submission(areas: &[Arc<InterestArea>], fields: &DiaryFields) -> FoldedSubmission {
    let mut interest_areas = BTreeMap::new();
    let mut name_collisions = Vec::new();

    for area in areas.iter().filter(|area| area.is_answered()) {
        let area_key = area.submission_key();
        let mut trigger_dict = BTreeMap::new();

        if let Some(value) = non_blank(area.response.as_deref()) {
            trigger_dict.insert(
                GENERAL_RESPONSE_KEY.to_string(),
                AnswerEntry::General {
                    value: value.to_string(),
                    shared: area.shared,
                },
            );
        }

        let mut by_id: Vec<(TriggerId, &str, AnswerEntry)> = Vec::new();
        for trigger in &area.triggers {
            if let Some(value) = non_blank(trigger.response.as_deref()) {
                by_id.push((
                    trigger.id,
                    trigger.name.as_str(),
                    AnswerEntry::Trigger {
                        trigger_id: trigger.id,
                        value: value.to_string(),
                        shared: trigger.shared,
                    },
                ));
            }
        }

        for (trigger_id, name, entry) in by_id {
            if trigger_dict.insert(name.to_string(), entry).is_some() {
                tracing::warn!(
                    "trigger {} in interest area '{}' overwrites an earlier answer keyed '{}'",
                    trigger_id,
                    area_key,
                    name
                );
                name_collisions.push(NameCollision {
                    area: area_key.clone(),
                    key: Some(name.to_string()),
                });
            }
        }

        if interest_areas
            .insert(area_key.clone(), AreaSubmission { trigger_dict })
            .is_some()
        {
            tracing::warn!("interest area key '{}' appears twice; keeping the later one", area_key);
            name_collisions.push(NameCollision {
                area: area_key,
                key: None,
            });
        }
    }

    let diary_shared = fields.share_text || areas.iter().any(|area| area.has_shared_flag());

    FoldedSubmission {
        payload: SubmissionPayload {
            date_range_type: fields.date_range_type,
            text: fields.free_text.clone(),
            text_shared: fields.share_text,
            diary_shared,
            interest_areas,
        },
        name_collisions,
    }
}

impl SubmissionPayload {
    /// Project the payload onto the backend request body.
    pub fn to_wire(&self) -> DiaryCreateReq {
        let interest_area_dict = self
            .interest_areas
            .iter()
            .map(|(name, area)| {
                let trigger_dict = area
                    .trigger_dict
                    .iter()
                    .map(|(key, entry)| {
                        let wire = match entry {
                            AnswerEntry::General { value, shared } => TriggerDictEntry::General {
                                value: value.clone(),
                                shared: *shared,
                            },
                            AnswerEntry::Trigger {
                                trigger_id,
                                value,
                                shared,
                            } => TriggerDictEntry::Trigger {
                                trigger_id: trigger_id.0,
                                value: value.clone(),
                                shared: *shared,
                            },
                        };
                        (key.clone(), wire)
                    })
                    .collect();
                (name.clone(), InterestAreaWire { trigger_dict })
            })
            .collect();

        DiaryCreateReq {
            date_range_type: self.date_range_type.to_wire(),
            text: self.text.clone(),
            text_shared: self.text_shared,
            diary_shared: self.diary_shared,
            interest_areas: InterestAreaDictWire { interest_area_dict },
        }
    }
}

/// Send a folded payload to the backend. All-or-nothing: there is no partial success.
///
/// # Errors
///
/// Returns [`SubmissionError::Failed`] when the backend rejects or cannot be reached.
pub async fn submit_payload<B>(backend: &B, payload: &SubmissionPayload) -> SubmissionResult<()>
where
    B: PortalBackend + ?Sized,
{
    match backend.create_diary(&payload.to_wire()).await {
        Ok(()) => {
            tracing::info!(
                "diary submitted with {} answered interest areas",
                payload.interest_areas.len()
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("diary submission failed: {e}");
            Err(SubmissionError::Failed(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diary::editor;
    use crate::diary::model::{InterestAreaId, Trigger};

    fn sleep() -> Vec<Arc<InterestArea>> {
        vec![Arc::new(InterestArea::new(
            InterestAreaId(10),
            Some("Sleep".into()),
            vec![
                Trigger::new(TriggerId(0), "How many hours?"),
                Trigger::new(TriggerId(1), "Quality?"),
            ],
        ))]
    }

    #[test]
    fn single_answered_trigger_is_folded_by_name() {
        let areas = editor::set_trigger_response(&sleep(), InterestAreaId(10), TriggerId(1), "Good");
        let folded = fold_submission(&areas, &DiaryFields::default());

        let sleep = &folded.payload.interest_areas["Sleep"];
        assert_eq!(sleep.trigger_dict.len(), 1);
        assert_eq!(
            sleep.trigger_dict["Quality?"],
            AnswerEntry::Trigger {
                trigger_id: TriggerId(1),
                value: "Good".into(),
                shared: false
            }
        );
        assert!(!sleep.trigger_dict.contains_key(GENERAL_RESPONSE_KEY));
        assert!(folded.name_collisions.is_empty());
    }

    #[test]
    fn unanswered_areas_are_left_out() {
        let mut areas = editor::set_area_response(&sleep(), InterestAreaId(10), "   ");
        areas = editor::set_trigger_response(&areas, InterestAreaId(10), TriggerId(0), "\t\n");
        let folded = fold_submission(&areas, &DiaryFields::default());
        assert!(folded.payload.interest_areas.is_empty());
    }

    #[test]
    fn general_response_is_kept_apart_from_triggers() {
        let mut areas = editor::set_area_response(&sleep(), InterestAreaId(10), " Restless ");
        areas = editor::set_area_shared(&areas, InterestAreaId(10), true);
        let folded = fold_submission(&areas, &DiaryFields::default());

        let sleep = &folded.payload.interest_areas["Sleep"];
        assert_eq!(
            sleep.trigger_dict[GENERAL_RESPONSE_KEY],
            AnswerEntry::General {
                value: " Restless ".into(),
                shared: true
            }
        );
        assert_eq!(sleep.trigger_dict.len(), 1);
    }

    #[test]
    fn unnamed_area_uses_synthetic_key() {
        let areas = vec![Arc::new(InterestArea::new(
            InterestAreaId(4),
            None,
            vec![Trigger::new(TriggerId(0), "Q")],
        ))];
        let areas = editor::set_trigger_response(&areas, InterestAreaId(4), TriggerId(0), "yes");
        let folded = fold_submission(&areas, &DiaryFields::default());
        assert!(folded.payload.interest_areas.contains_key("interest_4"));
    }

    #[test]
    fn duplicate_trigger_names_keep_the_later_answer() {
        let areas = vec![Arc::new(InterestArea::new(
            InterestAreaId(0),
            Some("Pain".into()),
            vec![
                Trigger::new(TriggerId(0), "Where?"),
                Trigger::new(TriggerId(1), "Where?"),
            ],
        ))];
        let areas = editor::set_trigger_response(&areas, InterestAreaId(0), TriggerId(0), "Head");
        let areas = editor::set_trigger_response(&areas, InterestAreaId(0), TriggerId(1), "Back");
        let folded = fold_submission(&areas, &DiaryFields::default());

        assert_eq!(
            folded.payload.interest_areas["Pain"].trigger_dict["Where?"],
            AnswerEntry::Trigger {
                trigger_id: TriggerId(1),
                value: "Back".into(),
                shared: false
            }
        );
        assert_eq!(
            folded.name_collisions,
            vec![NameCollision {
                area: "Pain".into(),
                key: Some("Where?".into())
            }]
        );
    }

    #[test]
    fn diary_shared_over_the_boolean_lattice() {
        for bits in 0..8u8 {
            let share_text = bits & 1 != 0;
            let area_shared = bits & 2 != 0;
            let trigger_shared = bits & 4 != 0;

            let mut areas = editor::set_area_shared(&sleep(), InterestAreaId(10), area_shared);
            areas = editor::set_trigger_shared(&areas, InterestAreaId(10), TriggerId(0), trigger_shared);
            let fields = DiaryFields {
                share_text,
                ..DiaryFields::default()
            };

            let folded = fold_submission(&areas, &fields);
            assert_eq!(
                folded.payload.diary_shared,
                share_text || area_shared || trigger_shared,
                "bits = {bits:03b}"
            );
            assert_eq!(folded.payload.text_shared, share_text);
        }
    }

    #[test]
    fn shared_flag_counts_even_when_area_is_not_included() {
        let areas = editor::set_area_shared(&sleep(), InterestAreaId(10), true);
        let folded = fold_submission(&areas, &DiaryFields::default());
        assert!(folded.payload.interest_areas.is_empty());
        assert!(folded.payload.diary_shared);
    }

    #[test]
    fn wire_projection_matches_backend_shape() {
        let areas = editor::set_trigger_response(&sleep(), InterestAreaId(10), TriggerId(1), "Good");
        let fields = DiaryFields {
            date_range_type: DateRangeType::Today,
            free_text: "Long day".into(),
            share_text: false,
        };
        let wire = fold_submission(&areas, &fields).payload.to_wire();

        assert_eq!(
            serde_json::to_value(&wire).unwrap(),
            serde_json::json!({
                "date_range_type": "today",
                "text": "Long day",
                "text_shared": false,
                "diary_shared": false,
                "interest_areas": {"interest_area_dict": {
                    "Sleep": {"trigger_dict": {
                        "Quality?": {"trigger_id": 1, "value": "Good", "shared": false}
                    }}
                }}
            })
        );
    }

    #[tokio::test]
    async fn submit_payload_maps_backend_failure() {
        let backend = crate::backend::testing::FakeBackend {
            fail_create: true,
            ..Default::default()
        };
        let payload = fold_submission(&sleep(), &DiaryFields::default()).payload;
        let err = submit_payload(&backend, &payload).await.expect_err("backend fails");
        assert!(err.is_retryable());
        assert!(matches!(err, SubmissionError::Failed(BackendError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn submit_payload_sends_wire_body() {
        let backend = crate::backend::testing::FakeBackend::default();
        let payload = fold_submission(&sleep(), &DiaryFields::default()).payload;
        submit_payload(&backend, &payload).await.expect("submitted");
        let created = backend.created.lock().unwrap();
        assert_eq!(created.as_slice(), &[payload.to_wire()]);
    }
}
