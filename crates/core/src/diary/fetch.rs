//! Diary fetcher (playback pipeline ingress).
//!
//! One fetch per identifier, no automatic retry. Every failure is converted into one of
//! three user-visible states before it leaves this module.

use crate::backend::{BackendError, PortalBackend};
use crate::diary::playback::{render_diary, PlaybackView, StoredDiary};
use portal_types::DiaryId;
use portal_wire::DiaryRes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Why a diary could not be shown.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    /// No such diary, or no identifier to look one up with.
    #[error("diary not found")]
    NotFound,
    /// The backend answered with something that is not a diary.
    #[error("diary has an unexpected format: {0}")]
    InvalidFormat(String),
    /// The backend could not be reached or failed.
    #[error("diary could not be fetched: {0}")]
    FetchFailed(String),
}

impl PlaybackError {
    /// Message suitable for the patient.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound => "This diary could not be found.",
            Self::InvalidFormat(_) => "This diary could not be displayed.",
            Self::FetchFailed(_) => {
                "Something went wrong while loading this diary. Please try again."
            }
        }
    }

    /// Only fetch failures may succeed when the same diary is opened again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchFailed(_))
    }
}

/// Fetch one diary and render it.
///
/// # Arguments
///
/// * `backend` - Backend to read from.
/// * `id` - Raw identifier, e.g. from a route segment. Blank or missing fails fast.
///
/// # Errors
///
/// Returns a [`PlaybackError`] describing which user-visible state to show.
pub async fn load_diary<B>(backend: &B, id: Option<&str>) -> Result<PlaybackView, PlaybackError>
where
    B: PortalBackend + ?Sized,
{
    let Ok(diary_id) = DiaryId::parse(id) else {
        tracing::debug!("no diary id given; not fetching");
        return Err(PlaybackError::NotFound);
    };

    let body = match backend.diary_by_id(&diary_id).await {
        Ok(Some(body)) => body,
        Ok(None) => {
            return Err(PlaybackError::InvalidFormat(
                "empty response body".to_string(),
            ))
        }
        Err(BackendError::NotFound) => {
            tracing::info!("diary {diary_id} not found");
            return Err(PlaybackError::NotFound);
        }
        Err(e) => {
            tracing::error!("fetching diary {diary_id} failed: {e}");
            return Err(PlaybackError::FetchFailed(e.to_string()));
        }
    };

    let res = DiaryRes::from_value(body).map_err(|e| {
        tracing::warn!("diary {diary_id} is not in a known format: {e}");
        PlaybackError::InvalidFormat(e.to_string())
    })?;

    let diary = StoredDiary::from_wire(res).ok_or_else(|| {
        tracing::warn!("diary {diary_id} response has no diary_id");
        PlaybackError::InvalidFormat("missing diary_id".to_string())
    })?;

    Ok(render_diary(&diary))
}

/// Outcome committed to a viewer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Loaded(PlaybackView),
    Failed(PlaybackError),
}

impl From<Result<PlaybackView, PlaybackError>> for PlaybackState {
    fn from(result: Result<PlaybackView, PlaybackError>) -> Self {
        match result {
            Ok(view) => Self::Loaded(view),
            Err(e) => Self::Failed(e),
        }
    }
}

/// Shows one diary at a time, discarding results of superseded requests.
///
/// Each [`DiaryViewer::show`] takes a fresh generation number. A result is committed only
/// if no later `show` has started by the time it arrives.
pub struct DiaryViewer<B: ?Sized> {
    generation: AtomicU64,
    current: Mutex<Option<PlaybackState>>,
    backend: Arc<B>,
}

impl<B> DiaryViewer<B>
where
    B: PortalBackend + ?Sized,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            generation: AtomicU64::new(0),
            current: Mutex::new(None),
            backend,
        }
    }

    /// Fetch and commit a diary.
    ///
    /// Returns the committed state, or `None` when a newer request superseded this one.
    pub async fn show(&self, id: Option<&str>) -> Option<PlaybackState> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let state = PlaybackState::from(load_diary(self.backend.as_ref(), id).await);

        let mut current = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("discarding diary result of superseded request {generation}");
            return None;
        }
        *current = Some(state.clone());
        Some(state)
    }

    /// The last committed state, if any request has completed.
    pub fn current(&self) -> Option<PlaybackState> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
