//! Voice survey - response coordination service
//!
//! Hosts the answer store for one survey session and coordinates the two
//! channels that write to it: the survey page and a realtime voice agent.

mod api;
mod config;
mod connection;
mod controller;
mod projector;
mod store;
mod survey;
mod tools;
mod transcript;
mod voice;

use api::{create_router, AppState};
use config::AppConfig;
use controller::{ControllerSettings, SessionController};
use std::net::SocketAddr;
use std::sync::Arc;
use store::ResponseStore;
use survey::Catalog;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voice::{OpenAiTokenIssuer, RelayBackend, RelayHub};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_survey=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!(?config, "Configuration loaded");
    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; voice connections will fail until it is.");
    }

    let catalog = Arc::new(Catalog::genai_impact());
    if catalog.is_empty() {
        return Err("survey catalog has no questions".into());
    }
    tracing::info!(questions = catalog.len(), "Survey catalog loaded");
    let store = ResponseStore::new(catalog);

    let issuer = OpenAiTokenIssuer::new(
        config.openai_api_key.clone(),
        &config.openai_base_url,
        config.realtime_model.clone(),
    )?;
    tracing::info!(endpoint = issuer.endpoint(), "Token issuer ready");

    let relay = RelayHub::new();
    let controller = Arc::new(SessionController::new(
        store,
        Arc::new(issuer),
        Arc::new(RelayBackend::new(relay.clone())),
        ControllerSettings::from(&config),
    ));

    let state = AppState::new(Arc::clone(&controller), relay);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(compression),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Voice survey server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    controller.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
