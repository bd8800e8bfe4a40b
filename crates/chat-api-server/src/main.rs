use anyhow::Result;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

mod config;
mod handlers;
mod models;
mod services;
mod utils;

use config::Settings;
use services::chat_service::{LlmProvider, RetrievalProvider};
use services::{ChatService, LlmService, RetrievalService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,chat_api_server=debug".to_string()),
        )
        .with_target(true)
        .json()
        .init();

    info!("Starting chat API server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("Configuration loaded");

    // Collaborator clients are stateless and shared across requests; all
    // conversation state travels in the request/response payloads.
    let llm_service: Arc<dyn LlmProvider> = Arc::new(LlmService::new(settings.llm.clone()));
    let retrieval_service: Arc<dyn RetrievalProvider> =
        Arc::new(RetrievalService::new(settings.retrieval.clone()));

    let chat_service = Arc::new(ChatService::new(
        llm_service,
        retrieval_service,
        &settings,
    ));

    let app = build_router(chat_service);

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(chat_service: Arc<ChatService>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    let api_routes = Router::new()
        .route("/api/v1/chat", post(handlers::chat::chat_handler))
        .route("/api/v1/ws/chat", get(handlers::ws::ws_chat_handler))
        .layer(Extension(chat_service));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(
            CorsLayer::permissive()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
}
