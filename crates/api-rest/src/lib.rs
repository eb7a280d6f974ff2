//! # API REST
//!
//! REST backend-for-frontend for the patient portal diary.
//!
//! Handles:
//! - Capture sessions: load the interest catalog, edit answers, preview and submit
//! - Playback: fetch a stored diary and return its rendered view
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialisation, CORS, API key)
//!
//! Uses `api-shared` for DTOs and `portal-core` for all diary behaviour.

#![warn(rust_2018_idioms)]

mod handlers;
mod sessions;

pub use sessions::{session_ttl_from_env_value, DEFAULT_SESSION_IDLE_TTL};

use api_shared::auth::{validate_api_key, AuthError, API_KEY_HEADER};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use portal_core::{PortalBackend, PortalConfig};
use sessions::SessionStore;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state for the REST API server
///
/// Holds the resolved configuration, the backend client and the open capture sessions.
/// Sessions live in memory only. They are dropped once submitted, when deleted, or after
/// sitting idle longer than the session TTL.
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<PortalConfig>,
    backend: Arc<dyn PortalBackend>,
    sessions: Arc<Mutex<SessionStore>>,
    api_key: Option<Arc<str>>,
}

impl AppState {
    /// Create the state shared by all handlers.
    ///
    /// # Arguments
    /// * `cfg` - Configuration resolved at startup
    /// * `backend` - Backend the diary pipelines talk to
    /// * `api_key` - When set, every route except `/health` requires a matching `x-api-key`
    pub fn new(
        cfg: Arc<PortalConfig>,
        backend: Arc<dyn PortalBackend>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            cfg,
            backend,
            sessions: Arc::new(Mutex::new(SessionStore::new(DEFAULT_SESSION_IDLE_TTL))),
            api_key: api_key.map(Arc::from),
        }
    }

    /// Replace the session idle TTL (default [`DEFAULT_SESSION_IDLE_TTL`]).
    ///
    /// Call before the router is built; open sessions are not carried over.
    #[must_use]
    pub fn with_session_ttl(mut self, idle_ttl: Duration) -> Self {
        self.sessions = Arc::new(Mutex::new(SessionStore::new(idle_ttl)));
        self
    }

    pub(crate) fn sessions(&self) -> MutexGuard<'_, SessionStore> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::create_capture_session,
        handlers::get_capture_session,
        handlers::delete_capture_session,
        handlers::update_fields,
        handlers::set_area_response,
        handlers::set_area_shared,
        handlers::set_trigger_response,
        handlers::set_trigger_shared,
        handlers::preview_submission,
        handlers::submit_capture_session,
        handlers::get_diary,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::CaptureSessionRes,
        api_shared::InterestAreaDto,
        api_shared::TriggerDto,
        api_shared::ProgressDto,
        api_shared::UpdateFieldsReq,
        api_shared::ResponseReq,
        api_shared::SharedReq,
        api_shared::PreviewRes,
        api_shared::NameCollisionDto,
        api_shared::SubmitRes,
        api_shared::PlaybackViewRes,
        api_shared::GeneralNoteDto,
        api_shared::InterestSectionDto,
        api_shared::TriggerAnswerDto,
    ))
)]
pub struct ApiDoc;

/// Build the full router: health, capture sessions, diaries and Swagger UI.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/capture-sessions", post(handlers::create_capture_session))
        .route(
            "/capture-sessions/:id",
            get(handlers::get_capture_session).delete(handlers::delete_capture_session),
        )
        .route("/capture-sessions/:id/fields", put(handlers::update_fields))
        .route(
            "/capture-sessions/:id/areas/:area_id/response",
            put(handlers::set_area_response),
        )
        .route(
            "/capture-sessions/:id/areas/:area_id/shared",
            put(handlers::set_area_shared),
        )
        .route(
            "/capture-sessions/:id/areas/:area_id/triggers/:trigger_id/response",
            put(handlers::set_trigger_response),
        )
        .route(
            "/capture-sessions/:id/areas/:area_id/triggers/:trigger_id/shared",
            put(handlers::set_trigger_shared),
        )
        .route(
            "/capture-sessions/:id/preview",
            get(handlers::preview_submission),
        )
        .route(
            "/capture-sessions/:id/submit",
            post(handlers::submit_capture_session),
        )
        .route("/diaries/:id", get(handlers::get_diary))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Reject requests without the configured `x-api-key`.
async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    if let Some(expected) = state.api_key.as_deref() {
        let provided = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        validate_api_key(provided, expected).map_err(|e| {
            tracing::warn!("rejected {} {}: {e}", req.method(), req.uri().path());
            match e {
                AuthError::Missing => (StatusCode::UNAUTHORIZED, "Missing x-api-key header"),
                AuthError::Invalid => (StatusCode::UNAUTHORIZED, "Invalid API key"),
            }
        })?;
    }
    Ok(next.run(req).await)
}
