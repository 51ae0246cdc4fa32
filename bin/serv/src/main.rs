use std::net::SocketAddr;

use axum::{Router, middleware, routing::get};
use qg_api::{config::ApiConfig, router::MAX_BODY_BYTES, state::ApiState};
use tower_http::{
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment variables
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env()?;

    qg_api::tracing::init_tracing(&config.env);

    let metrics_handle = qg_api::metrics::init_metrics()?;
    tracing::info!("Prometheus metrics exporter initialized");

    let state = ApiState::new(&config)?;

    let _job_handles =
        qg_api::jobs::start_background_jobs(state.sessions.clone(), state.session_idle_timeout);
    tracing::info!(
        idle_minutes = config.session_idle_minutes,
        "Background jobs started (idle session sweep)"
    );

    let cors = qg_api::middleware::cors::create_cors_layer(&config.parsed_allowed_origins());

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let metrics_app = Router::new()
        .route("/metrics", get(qg_api::metrics::metrics_handler))
        .with_state(metrics_handle);

    let app = qg_api::router::router()
        .with_state(state)
        .merge(metrics_app)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(trace_layer)
        .layer(middleware::from_fn(qg_api::metrics::track_metrics))
        .layer(middleware::from_fn(
            qg_api::middleware::request_id::request_id_middleware,
        ));

    let app = qg_api::middleware::security_headers::apply_security_headers(app, config.env.clone());

    tracing::info!("Environment: {:?}", config.env);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server running on http://{}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
