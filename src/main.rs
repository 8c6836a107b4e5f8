use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use dental_voice::config::AppConfig;
use dental_voice::db::{self, SqliteStore};
use dental_voice::handlers;
use dental_voice::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    let store = Arc::new(SqliteStore::new(conn));

    if config.webhook_secret().is_none() {
        tracing::warn!("WEBHOOK_SECRET not set, voice webhooks are unauthenticated");
    }
    tracing::info!(
        environment = %config.environment,
        faq_threshold = config.faq_similarity_threshold,
        "configuration loaded"
    );

    let state = Arc::new(AppState::new(store, config.clone()));

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/vapi/incoming_call", post(handlers::webhook::incoming_call))
        .route("/vapi/analyze_intent", post(handlers::webhook::analyze_intent))
        .route(
            "/vapi/appointment_store",
            post(handlers::webhook::appointment_store),
        )
        .route("/api/admin/status", get(handlers::admin::get_status))
        .route(
            "/api/admin/practices",
            get(handlers::admin::list_practices).post(handlers::admin::create_practice),
        )
        .route("/api/admin/calls", get(handlers::admin::list_calls))
        .route("/api/admin/sessions/:id", get(handlers::admin::get_session))
        .route(
            "/api/admin/sessions/:id/end",
            post(handlers::admin::end_session),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
