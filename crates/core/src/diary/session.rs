//! Capture session: the transient form state of one diary being written.

use crate::backend::PortalBackend;
use crate::diary::editor;
use crate::diary::model::{DateRangeType, InterestArea, InterestAreaId, InterestAreas, TriggerId};
use crate::diary::submission::{
    fold_submission, submit_payload, DiaryFields, FoldedSubmission, SubmissionError,
    SubmissionPayload, SubmissionResult,
};
use crate::error::{PortalError, PortalResult};
use serde::Serialize;
use std::sync::Arc;

/// How much of the form has been filled in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CaptureProgress {
    /// Areas that would be included in a submission.
    pub answered: usize,
    pub total: usize,
}

/// Form state for a single diary capture.
///
/// Edits go through the pure functions in [`editor`], so the area list is replaced on
/// every change and untouched entries keep their identity. At most one submission may be
/// outstanding; a failed submission leaves every answer in place.
#[derive(Clone, Debug)]
pub struct CaptureSession {
    areas: InterestAreas,
    fields: DiaryFields,
    degraded: bool,
    in_flight: bool,
}

impl CaptureSession {
    /// Start a session over normalised catalog areas.
    ///
    /// # Arguments
    ///
    /// * `areas` - Interest areas from the catalog (or the placeholder).
    /// * `degraded` - `true` when `areas` is the placeholder rather than the real catalog.
    pub fn new(areas: InterestAreas, degraded: bool) -> Self {
        Self {
            areas,
            fields: DiaryFields::default(),
            degraded,
            in_flight: false,
        }
    }

    pub fn areas(&self) -> &[Arc<InterestArea>] {
        &self.areas
    }

    pub fn fields(&self) -> &DiaryFields {
        &self.fields
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn set_date_range(&mut self, date_range_type: DateRangeType) {
        self.fields.date_range_type = date_range_type;
    }

    pub fn set_free_text(&mut self, text: impl Into<String>) {
        self.fields.free_text = text.into();
    }

    pub fn set_share_text(&mut self, shared: bool) {
        self.fields.share_text = shared;
    }

    /// Set an area's own response.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::NotFound`] if no area has `area_id`.
    pub fn set_area_response(&mut self, area_id: InterestAreaId, text: &str) -> PortalResult<()> {
        self.require_area(area_id)?;
        self.areas = editor::set_area_response(&self.areas, area_id, text);
        Ok(())
    }

    /// Set an area's sharing flag.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::NotFound`] if no area has `area_id`.
    pub fn set_area_shared(&mut self, area_id: InterestAreaId, shared: bool) -> PortalResult<()> {
        self.require_area(area_id)?;
        self.areas = editor::set_area_shared(&self.areas, area_id, shared);
        Ok(())
    }

    /// Set one trigger's response.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::NotFound`] if the area or the trigger does not exist.
    pub fn set_trigger_response(
        &mut self,
        area_id: InterestAreaId,
        trigger_id: TriggerId,
        text: &str,
    ) -> PortalResult<()> {
        self.require_trigger(area_id, trigger_id)?;
        self.areas = editor::set_trigger_response(&self.areas, area_id, trigger_id, text);
        Ok(())
    }

    /// Set one trigger's sharing flag.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::NotFound`] if the area or the trigger does not exist.
    pub fn set_trigger_shared(
        &mut self,
        area_id: InterestAreaId,
        trigger_id: TriggerId,
        shared: bool,
    ) -> PortalResult<()> {
        self.require_trigger(area_id, trigger_id)?;
        self.areas = editor::set_trigger_shared(&self.areas, area_id, trigger_id, shared);
        Ok(())
    }

    pub fn progress(&self) -> CaptureProgress {
        CaptureProgress {
            answered: self.areas.iter().filter(|area| area.is_answered()).count(),
            total: self.areas.len(),
        }
    }

    /// What would be sent if the form were submitted now.
    pub fn preview(&self) -> FoldedSubmission {
        fold_submission(&self.areas, &self.fields)
    }

    /// Mark a submission as started and fold the form.
    ///
    /// # Errors
    ///
    /// Returns [`SubmissionError::AlreadyInFlight`] while an earlier submission is
    /// outstanding.
    pub fn begin_submit(&mut self) -> SubmissionResult<SubmissionPayload> {
        if self.in_flight {
            tracing::warn!("ignoring submit while a submission is in flight");
            return Err(SubmissionError::AlreadyInFlight);
        }
        self.in_flight = true;
        Ok(self.preview().payload)
    }

    /// Clear the in-flight flag after the backend answered. Answers are kept either way.
    pub fn finish_submit<T>(&mut self, outcome: &SubmissionResult<T>) {
        self.in_flight = false;
        if let Err(e) = outcome {
            tracing::warn!("submission left the form populated for retry: {e}");
        }
    }

    /// Fold, send and settle one submission.
    ///
    /// # Errors
    ///
    /// Returns [`SubmissionError::AlreadyInFlight`] or [`SubmissionError::Failed`].
    pub async fn submit<B>(&mut self, backend: &B) -> SubmissionResult<()>
    where
        B: PortalBackend + ?Sized,
    {
        let payload = self.begin_submit()?;
        let outcome = submit_payload(backend, &payload).await;
        self.finish_submit(&outcome);
        outcome
    }

    fn require_area(&self, area_id: InterestAreaId) -> PortalResult<&InterestArea> {
        self.areas
            .iter()
            .map(Arc::as_ref)
            .find(|area| area.id == area_id)
            .ok_or_else(|| PortalError::NotFound(format!("interest area {area_id}")))
    }

    fn require_trigger(&self, area_id: InterestAreaId, trigger_id: TriggerId) -> PortalResult<()> {
        self.require_area(area_id)?
            .trigger(trigger_id)
            .map(|_| ())
            .ok_or_else(|| {
                PortalError::NotFound(format!("trigger {trigger_id} in interest area {area_id}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::FakeBackend;
    use crate::diary::model::Trigger;

    fn session() -> CaptureSession {
        let areas = vec![
            Arc::new(InterestArea::new(
                InterestAreaId(10),
                Some("Sleep".into()),
                vec![
                    Trigger::new(TriggerId(0), "How many hours?"),
                    Trigger::new(TriggerId(1), "Quality?"),
                ],
            )),
            Arc::new(InterestArea::new(InterestAreaId(11), Some("Mood".into()), vec![])),
        ];
        CaptureSession::new(areas, false)
    }

    #[test]
    fn progress_counts_included_areas() {
        let mut s = session();
        assert_eq!(s.progress(), CaptureProgress { answered: 0, total: 2 });

        s.set_trigger_response(InterestAreaId(10), TriggerId(1), "Good").unwrap();
        s.set_area_response(InterestAreaId(11), "  ").unwrap();
        assert_eq!(s.progress(), CaptureProgress { answered: 1, total: 2 });
    }

    #[test]
    fn unknown_targets_are_rejected() {
        let mut s = session();
        assert!(matches!(
            s.set_area_response(InterestAreaId(99), "x"),
            Err(PortalError::NotFound(_))
        ));
        assert!(matches!(
            s.set_trigger_shared(InterestAreaId(11), TriggerId(0), true),
            Err(PortalError::NotFound(_))
        ));
    }

    #[test]
    fn fields_flow_into_the_preview() {
        let mut s = session();
        s.set_date_range(DateRangeType::Today);
        s.set_free_text("Tired");
        s.set_share_text(true);

        let payload = s.preview().payload;
        assert_eq!(payload.date_range_type, DateRangeType::Today);
        assert_eq!(payload.text, "Tired");
        assert!(payload.text_shared);
        assert!(payload.diary_shared);
    }

    #[test]
    fn second_submit_is_refused_while_in_flight() {
        let mut s = session();
        s.begin_submit().expect("first submit");
        assert!(s.is_in_flight());
        assert!(matches!(s.begin_submit(), Err(SubmissionError::AlreadyInFlight)));

        s.finish_submit::<()>(&Ok(()));
        assert!(!s.is_in_flight());
        assert!(s.begin_submit().is_ok());
    }

    #[tokio::test]
    async fn failed_submit_keeps_answers_for_retry() {
        let mut s = session();
        s.set_trigger_response(InterestAreaId(10), TriggerId(1), "Good").unwrap();

        let backend = FakeBackend {
            fail_create: true,
            ..FakeBackend::default()
        };
        let err = s.submit(&backend).await.expect_err("backend fails");
        assert!(err.is_retryable());
        assert!(!s.is_in_flight());
        assert_eq!(
            s.areas()[0].triggers[1].response.as_deref(),
            Some("Good")
        );

        let backend = FakeBackend::default();
        s.submit(&backend).await.expect("retry succeeds");
        assert_eq!(backend.created.lock().unwrap().len(), 1);
    }
}
