//! # Portal Core
//!
//! Core business logic for the patient portal's diary feature.
//!
//! This crate contains the two diary pipelines and nothing that talks HTTP directly:
//! - **Capture**: interest catalog -> editable form model -> folded submission body
//! - **Playback**: stored diary (any layout) -> read-only view grouped by interest area
//!
//! The backend is reached through the [`backend::PortalBackend`] trait; the reqwest
//! implementation lives in `portal-client`. REST routing belongs in `api-rest`.

pub mod backend;
pub mod config;
pub mod constants;
pub mod diary;
pub mod error;
pub mod validation;

pub use backend::{BackendError, BackendResult, PortalBackend};
pub use config::{config_from_env_values, CatalogFallback, PortalConfig};
pub use constants::*;
pub use error::{PortalError, PortalResult};

pub use diary::catalog::{load_catalog, normalize_catalog, resolve_catalog, CatalogError};
pub use diary::editor;
pub use diary::fetch::{load_diary, DiaryViewer, PlaybackError, PlaybackState};
pub use diary::model::{
    DateRangeType, InterestArea, InterestAreaId, InterestAreas, Trigger, TriggerId,
};
pub use diary::playback::{
    canonical_value, render_diary, GeneralNote, InterestSection, PlaybackView, StoredDiary,
    TriggerAnswer,
};
pub use diary::session::{CaptureProgress, CaptureSession};
pub use diary::submission::{
    fold_submission, submit_payload, AnswerEntry, AreaSubmission, DiaryFields, FoldedSubmission,
    NameCollision, SubmissionError, SubmissionPayload, SubmissionResult,
};

pub use portal_types::{DiaryId, NonEmptyText, TextError};
