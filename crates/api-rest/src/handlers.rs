//! Route handlers.
//!
//! Failures are mapped to a status code and the stable user-facing message of the
//! pipeline error, so the frontend can show them as they are.

use crate::AppState;
use api_shared::{
    CaptureSessionRes, HealthRes, HealthService, PlaybackViewRes, PreviewRes, ResponseReq,
    SharedReq, SubmitRes, UpdateFieldsReq,
};
use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::Json,
};
use portal_core::{
    load_catalog, load_diary, resolve_catalog, submit_payload, CaptureSession, DateRangeType,
    InterestAreaId, PlaybackError, PortalError, SubmissionError, TriggerId,
};
use uuid::Uuid;

type ApiError = (StatusCode, &'static str);

const SESSION_NOT_FOUND: ApiError = (StatusCode::NOT_FOUND, "Capture session not found");
const SESSION_BUSY: ApiError = (StatusCode::CONFLICT, "Your diary is already being saved.");

fn portal_error(e: PortalError) -> ApiError {
    match e {
        PortalError::NotFound(what) => {
            tracing::debug!("edit target not found: {what}");
            (StatusCode::NOT_FOUND, "Interest area or trigger not found")
        }
        PortalError::InvalidInput(msg) => {
            tracing::debug!("rejected edit: {msg}");
            (StatusCode::BAD_REQUEST, "Invalid value")
        }
        PortalError::Text(_) => (StatusCode::BAD_REQUEST, "Invalid value"),
    }
}

fn submission_error(e: &SubmissionError) -> ApiError {
    match e {
        SubmissionError::AlreadyInFlight => (StatusCode::CONFLICT, e.user_message()),
        SubmissionError::Failed(_) => (StatusCode::BAD_GATEWAY, e.user_message()),
    }
}

fn playback_error(e: &PlaybackError) -> ApiError {
    let status = match e {
        PlaybackError::NotFound => StatusCode::NOT_FOUND,
        PlaybackError::InvalidFormat(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PlaybackError::FetchFailed(_) => StatusCode::BAD_GATEWAY,
    };
    (status, e.user_message())
}

/// Run `read` against one open session.
fn read_session<T>(
    state: &AppState,
    id: Uuid,
    read: impl FnOnce(&CaptureSession) -> T,
) -> Result<T, ApiError> {
    let mut sessions = state.sessions();
    let session = sessions.get_mut(&id).ok_or(SESSION_NOT_FOUND)?;
    Ok(read(session))
}

/// Run `edit` against one open session and return its new state.
///
/// Edits are refused with `409 Conflict` while the session's submit is in flight.
fn edit_session<F>(state: &AppState, id: Uuid, edit: F) -> Result<Json<CaptureSessionRes>, ApiError>
where
    F: FnOnce(&mut CaptureSession) -> Result<(), ApiError>,
{
    let mut sessions = state.sessions();
    let session = sessions.get_mut(&id).ok_or(SESSION_NOT_FOUND)?;
    if session.is_in_flight() {
        tracing::debug!("rejected edit to capture session {id} during submit");
        return Err(SESSION_BUSY);
    }
    edit(session)?;
    Ok(Json(CaptureSessionRes::from_session(id.to_string(), session)))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks. Not behind the API key.
#[axum::debug_handler]
pub(crate) async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/capture-sessions",
    responses(
        (status = 201, description = "Capture session opened", body = CaptureSessionRes),
        (status = 503, description = "Interest catalog unavailable")
    )
)]
/// Open a capture session
///
/// Loads the patient's interest catalog and applies the configured fallback policy. With the
/// placeholder policy a failed load still opens a session, flagged as `degraded`.
///
/// # Errors
/// Returns `503 Service Unavailable` if the catalog cannot be loaded and the policy is
/// to show an error state.
#[axum::debug_handler]
pub(crate) async fn create_capture_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CaptureSessionRes>), ApiError> {
    let loaded = load_catalog(state.backend.as_ref()).await;
    let (areas, degraded) = resolve_catalog(loaded, state.cfg.catalog_fallback())
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.user_message()))?;

    let id = Uuid::new_v4();
    let session = CaptureSession::new(areas, degraded);
    let res = CaptureSessionRes::from_session(id.to_string(), &session);
    let open = {
        let mut sessions = state.sessions();
        sessions.insert(id, session);
        sessions.len()
    };

    tracing::info!(
        "opened capture session {id} with {} areas ({open} open)",
        res.areas.len()
    );
    Ok((StatusCode::CREATED, Json(res)))
}

#[utoipa::path(
    get,
    path = "/capture-sessions/{id}",
    params(("id" = String, Path, description = "Capture session id")),
    responses(
        (status = 200, description = "Current session state", body = CaptureSessionRes),
        (status = 404, description = "Capture session not found")
    )
)]
/// Read the current state of a capture session
#[axum::debug_handler]
pub(crate) async fn get_capture_session(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
) -> Result<Json<CaptureSessionRes>, ApiError> {
    read_session(&state, id, |session| {
        Json(CaptureSessionRes::from_session(id.to_string(), session))
    })
}

#[utoipa::path(
    delete,
    path = "/capture-sessions/{id}",
    params(("id" = String, Path, description = "Capture session id")),
    responses(
        (status = 204, description = "Capture session discarded"),
        (status = 404, description = "Capture session not found"),
        (status = 409, description = "A submission is in flight")
    )
)]
/// Discard a capture session without submitting it
#[axum::debug_handler]
pub(crate) async fn delete_capture_session(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut sessions = state.sessions();
    let session = sessions.get_mut(&id).ok_or(SESSION_NOT_FOUND)?;
    if session.is_in_flight() {
        return Err(SESSION_BUSY);
    }
    sessions.remove(&id);
    tracing::info!("capture session {id} discarded");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/capture-sessions/{id}/fields",
    params(("id" = String, Path, description = "Capture session id")),
    request_body = UpdateFieldsReq,
    responses(
        (status = 200, description = "Fields updated", body = CaptureSessionRes),
        (status = 400, description = "Unknown date range"),
        (status = 404, description = "Capture session not found"),
        (status = 409, description = "A submission is in flight")
    )
)]
/// Update the diary-level fields (date range, free text, text sharing)
#[axum::debug_handler]
pub(crate) async fn update_fields(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
    Json(req): Json<UpdateFieldsReq>,
) -> Result<Json<CaptureSessionRes>, ApiError> {
    let date_range = req
        .date_range_type
        .as_deref()
        .map(str::parse::<DateRangeType>)
        .transpose()
        .map_err(portal_error)?;

    edit_session(&state, id, |session| {
        if let Some(date_range) = date_range {
            session.set_date_range(date_range);
        }
        if let Some(text) = req.free_text {
            session.set_free_text(text);
        }
        if let Some(shared) = req.share_text {
            session.set_share_text(shared);
        }
        Ok(())
    })
}

#[utoipa::path(
    put,
    path = "/capture-sessions/{id}/areas/{area_id}/response",
    params(
        ("id" = String, Path, description = "Capture session id"),
        ("area_id" = i64, Path, description = "Interest area id")
    ),
    request_body = ResponseReq,
    responses(
        (status = 200, description = "Response recorded", body = CaptureSessionRes),
        (status = 404, description = "Session or interest area not found"),
        (status = 409, description = "A submission is in flight")
    )
)]
/// Set an interest area's own response
#[axum::debug_handler]
pub(crate) async fn set_area_response(
    State(state): State<AppState>,
    AxumPath((id, area_id)): AxumPath<(Uuid, i64)>,
    Json(req): Json<ResponseReq>,
) -> Result<Json<CaptureSessionRes>, ApiError> {
    edit_session(&state, id, |session| {
        session
            .set_area_response(InterestAreaId(area_id), &req.response)
            .map_err(portal_error)
    })
}

#[utoipa::path(
    put,
    path = "/capture-sessions/{id}/areas/{area_id}/shared",
    params(
        ("id" = String, Path, description = "Capture session id"),
        ("area_id" = i64, Path, description = "Interest area id")
    ),
    request_body = SharedReq,
    responses(
        (status = 200, description = "Sharing flag recorded", body = CaptureSessionRes),
        (status = 404, description = "Session or interest area not found"),
        (status = 409, description = "A submission is in flight")
    )
)]
/// Set an interest area's sharing flag
#[axum::debug_handler]
pub(crate) async fn set_area_shared(
    State(state): State<AppState>,
    AxumPath((id, area_id)): AxumPath<(Uuid, i64)>,
    Json(req): Json<SharedReq>,
) -> Result<Json<CaptureSessionRes>, ApiError> {
    edit_session(&state, id, |session| {
        session
            .set_area_shared(InterestAreaId(area_id), req.shared)
            .map_err(portal_error)
    })
}

#[utoipa::path(
    put,
    path = "/capture-sessions/{id}/areas/{area_id}/triggers/{trigger_id}/response",
    params(
        ("id" = String, Path, description = "Capture session id"),
        ("area_id" = i64, Path, description = "Interest area id"),
        ("trigger_id" = i64, Path, description = "Trigger id")
    ),
    request_body = ResponseReq,
    responses(
        (status = 200, description = "Response recorded", body = CaptureSessionRes),
        (status = 404, description = "Session, interest area or trigger not found"),
        (status = 409, description = "A submission is in flight")
    )
)]
/// Set one trigger's response
#[axum::debug_handler]
pub(crate) async fn set_trigger_response(
    State(state): State<AppState>,
    AxumPath((id, area_id, trigger_id)): AxumPath<(Uuid, i64, i64)>,
    Json(req): Json<ResponseReq>,
) -> Result<Json<CaptureSessionRes>, ApiError> {
    edit_session(&state, id, |session| {
        session
            .set_trigger_response(InterestAreaId(area_id), TriggerId(trigger_id), &req.response)
            .map_err(portal_error)
    })
}

#[utoipa::path(
    put,
    path = "/capture-sessions/{id}/areas/{area_id}/triggers/{trigger_id}/shared",
    params(
        ("id" = String, Path, description = "Capture session id"),
        ("area_id" = i64, Path, description = "Interest area id"),
        ("trigger_id" = i64, Path, description = "Trigger id")
    ),
    request_body = SharedReq,
    responses(
        (status = 200, description = "Sharing flag recorded", body = CaptureSessionRes),
        (status = 404, description = "Session, interest area or trigger not found"),
        (status = 409, description = "A submission is in flight")
    )
)]
/// Set one trigger's sharing flag
#[axum::debug_handler]
pub(crate) async fn set_trigger_shared(
    State(state): State<AppState>,
    AxumPath((id, area_id, trigger_id)): AxumPath<(Uuid, i64, i64)>,
    Json(req): Json<SharedReq>,
) -> Result<Json<CaptureSessionRes>, ApiError> {
    edit_session(&state, id, |session| {
        session
            .set_trigger_shared(InterestAreaId(area_id), TriggerId(trigger_id), req.shared)
            .map_err(portal_error)
    })
}

#[utoipa::path(
    get,
    path = "/capture-sessions/{id}/preview",
    params(("id" = String, Path, description = "Capture session id")),
    responses(
        (status = 200, description = "Body that would be submitted", body = PreviewRes),
        (status = 404, description = "Capture session not found")
    )
)]
/// Preview the submission body without sending it
#[axum::debug_handler]
pub(crate) async fn preview_submission(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
) -> Result<Json<PreviewRes>, ApiError> {
    let folded = read_session(&state, id, CaptureSession::preview)?;

    PreviewRes::from_folded(&folded).map(Json).map_err(|e| {
        tracing::error!("could not serialise submission preview: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    })
}

#[utoipa::path(
    post,
    path = "/capture-sessions/{id}/submit",
    params(("id" = String, Path, description = "Capture session id")),
    responses(
        (status = 201, description = "Diary submitted", body = SubmitRes),
        (status = 404, description = "Capture session not found"),
        (status = 409, description = "A submission is already in flight"),
        (status = 502, description = "Backend rejected the diary; the session is kept for retry")
    )
)]
/// Submit a capture session
///
/// The session is locked against a second submit while the backend call is outstanding. On
/// success it is closed; on failure it stays open with every answer intact.
///
/// # Errors
/// Returns `409 Conflict` while in flight and `502 Bad Gateway` if the backend fails.
#[axum::debug_handler]
pub(crate) async fn submit_capture_session(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
) -> Result<(StatusCode, Json<SubmitRes>), ApiError> {
    let payload = {
        let mut sessions = state.sessions();
        let session = sessions.get_mut(&id).ok_or(SESSION_NOT_FOUND)?;
        session.begin_submit().map_err(|e| submission_error(&e))?
    };

    let outcome = submit_payload(state.backend.as_ref(), &payload).await;

    let mut sessions = state.sessions();
    match outcome {
        Ok(()) => {
            sessions.remove(&id);
            tracing::info!("capture session {id} submitted and closed");
            Ok((
                StatusCode::CREATED,
                Json(SubmitRes {
                    submitted: true,
                    answered_areas: payload.interest_areas.len(),
                }),
            ))
        }
        Err(e) => {
            let api_error = submission_error(&e);
            let outcome: Result<(), SubmissionError> = Err(e);
            if let Some(session) = sessions.get_mut(&id) {
                session.finish_submit(&outcome);
            }
            Err(api_error)
        }
    }
}

#[utoipa::path(
    get,
    path = "/diaries/{id}",
    params(("id" = String, Path, description = "Diary id")),
    responses(
        (status = 200, description = "Rendered diary", body = PlaybackViewRes),
        (status = 404, description = "Diary not found"),
        (status = 422, description = "Diary has an unexpected format"),
        (status = 502, description = "Diary could not be fetched; retry may succeed")
    )
)]
/// Fetch and render a stored diary
#[axum::debug_handler]
pub(crate) async fn get_diary(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<PlaybackViewRes>, ApiError> {
    load_diary(state.backend.as_ref(), Some(&id))
        .await
        .map(|view| Json(PlaybackViewRes::from(&view)))
        .map_err(|e| playback_error(&e))
}
