use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{build_router, session_ttl_from_env_value, AppState};
use portal_client::HttpPortalBackend;
use portal_core::config_from_env_values;

/// Main entry point for the patient portal BFF
///
/// Resolves configuration once, builds the backend client and serves the REST router until
/// Ctrl-C.
///
/// # Environment Variables
/// - `PORTAL_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `PORTAL_BACKEND_URL`: Portal backend base URL (default: "http://localhost:8000")
/// - `PORTAL_ACCESS_TOKEN`: Bearer token sent to the backend
/// - `PORTAL_REQUEST_TIMEOUT_SECS`: Backend request timeout (default: 30)
/// - `PORTAL_CATALOG_FALLBACK`: `error` or `placeholder` (default: `error`)
/// - `API_KEY`: API key required in `x-api-key` for everything but `/health`
/// - `PORTAL_SESSION_TTL_SECS`: Idle seconds before an open capture session is dropped (default: 1800)
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("portal=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("PORTAL_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(config_from_env_values(
        std::env::var("PORTAL_BACKEND_URL").ok(),
        std::env::var("PORTAL_ACCESS_TOKEN").ok(),
        std::env::var("PORTAL_REQUEST_TIMEOUT_SECS").ok(),
        std::env::var("PORTAL_CATALOG_FALLBACK").ok(),
    )?);
    let api_key = std::env::var("API_KEY").ok().filter(|k| !k.trim().is_empty());
    let session_ttl = session_ttl_from_env_value(std::env::var("PORTAL_SESSION_TTL_SECS").ok())?;
    if api_key.is_none() {
        tracing::warn!("API_KEY not set; REST routes are open");
    }

    tracing::info!("++ Starting portal REST on {}", rest_addr);
    tracing::info!(
        "++ Backend {} (catalog fallback {:?})",
        cfg.backend_url(),
        cfg.catalog_fallback()
    );

    let backend = Arc::new(HttpPortalBackend::new(&cfg)?);
    let rest_app = build_router(AppState::new(cfg, backend, api_key).with_session_ttl(session_ttl));

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, rest_app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {e}");
            }
            tracing::info!("-- Shutting down portal REST");
        })
        .await?;

    Ok(())
}
