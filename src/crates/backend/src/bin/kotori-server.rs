//! The kotori server binary: wires the LLM gateway, the flashcard client,
//! and the session registry into one axum service.

use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use anki::AnkiClient;
use backend::api;
use backend::app::{AppState, ServerConfig};
use dialog_graph::llm::ChatModel;
use llm::{OpenAiClient, RemoteLlmConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();

    let llm_config = RemoteLlmConfig::from_env(
        &config.llm_api_key_var,
        &config.llm_base_url,
        &config.llm_model,
    )
    .context("LLM gateway configuration")?;
    let model: Arc<dyn ChatModel> = Arc::new(OpenAiClient::new(llm_config)?);

    let anki_client = Arc::new(AnkiClient::with_url(&config.anki_url)?);

    let state = AppState::new(model, anki_client);
    let app = api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("binding {}:{}", config.host, config.port))?;
    tracing::info!(host = %config.host, port = config.port, "kotori server listening");

    axum::serve(listener, app).await.context("server loop")?;
    Ok(())
}
