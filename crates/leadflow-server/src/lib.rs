pub mod error;
pub mod notify;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use leadflow_core::config::Config;
use leadflow_core::db::Db;
use tower_http::cors::{Any, CorsLayer};

/// Build the axum Router with all API routes and middleware.
/// Used by `serve_on` and available for integration testing.
pub fn build_router(db: Arc<Db>, config: Config) -> anyhow::Result<Router> {
    let app_state = state::AppState::new(db, config)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Pipeline definition
        .route("/api/pipeline", get(routes::pipeline::get_pipeline))
        // Leads
        .route("/api/leads", get(routes::leads::list_leads))
        .route("/api/leads", post(routes::leads::create_lead))
        .route("/api/leads/{id}", get(routes::leads::get_lead))
        .route("/api/leads/{id}/advance", post(routes::leads::advance_lead))
        .route("/api/leads/{id}/stage", put(routes::leads::override_stage))
        .route("/api/leads/{id}/activity", get(routes::leads::get_activity))
        .route(
            "/api/leads/{id}/reminders",
            get(routes::reminders::list_for_lead),
        )
        // Reminders
        .route("/api/reminders/due", get(routes::reminders::list_due))
        .route(
            "/api/reminders/{id}/dismiss",
            post(routes::reminders::dismiss),
        )
        .route(
            "/api/reminders/{id}/sent",
            post(routes::reminders::mark_sent),
        )
        .layer(cors)
        .with_state(app_state);

    Ok(router)
}

/// Start the API server on `port`.
pub async fn serve(db: Arc<Db>, config: Config, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    serve_on(db, config, listener).await
}

/// Start the API server on a pre-bound listener.
///
/// Accepting a `TcpListener` lets the caller read the actual port before
/// starting (useful when `port = 0` and the OS picks a free one).
pub async fn serve_on(
    db: Arc<Db>,
    config: Config,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let port = listener.local_addr()?.port();
    let app = build_router(db, config)?;

    tracing::info!("leadflow API listening on http://localhost:{port}");

    axum::serve(listener, app).await?;
    Ok(())
}
