//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the portal REST backend-for-frontend on its own.
//!
//! ## Intended use
//! Useful for development against a local backend. The workspace's main `portal-run`
//! binary starts the same router.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{build_router, session_ttl_from_env_value, AppState};
use portal_client::HttpPortalBackend;
use portal_core::config_from_env_values;

/// Main entry point for the portal REST API server
///
/// # Environment Variables
/// - `PORTAL_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `PORTAL_BACKEND_URL`, `PORTAL_ACCESS_TOKEN`, `PORTAL_REQUEST_TIMEOUT_SECS`,
///   `PORTAL_CATALOG_FALLBACK`: backend client configuration
/// - `API_KEY`: optional key required in `x-api-key`
/// - `PORTAL_SESSION_TTL_SECS`: idle seconds before an open capture session is dropped
///   (default 1800)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("PORTAL_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(config_from_env_values(
        std::env::var("PORTAL_BACKEND_URL").ok(),
        std::env::var("PORTAL_ACCESS_TOKEN").ok(),
        std::env::var("PORTAL_REQUEST_TIMEOUT_SECS").ok(),
        std::env::var("PORTAL_CATALOG_FALLBACK").ok(),
    )?);
    let backend = Arc::new(HttpPortalBackend::new(&cfg)?);
    let api_key = std::env::var("API_KEY").ok().filter(|k| !k.trim().is_empty());
    let session_ttl = session_ttl_from_env_value(std::env::var("PORTAL_SESSION_TTL_SECS").ok())?;

    tracing::info!(
        "-- Starting portal REST API on {} (backend {})",
        addr,
        cfg.backend_url()
    );

    let app = build_router(AppState::new(cfg, backend, api_key).with_session_ttl(session_ttl));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
