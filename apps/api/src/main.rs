mod analysis;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::orchestrator::CvAnalyzer;
use crate::config::Config;
use crate::extraction::ocr::OcrEngine;
use crate::llm_client::{ClaudeExtractor, ProfileExtractor};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV analysis API v{}", env!("CARGO_PKG_VERSION"));

    // Optional OCR capability, probed once at startup
    let ocr = OcrEngine::detect(config.ocr.clone());

    // Model extractor is injected explicitly; absence means heuristic-only
    let extractor: Option<Arc<dyn ProfileExtractor>> = match &config.anthropic_api_key {
        Some(key) => {
            info!("model extractor enabled (model: {})", config.anthropic_model);
            Some(Arc::new(ClaudeExtractor::new(
                key.clone(),
                config.anthropic_model.clone(),
            )))
        }
        None => {
            info!("no ANTHROPIC_API_KEY set, running heuristic-only");
            None
        }
    };

    let analyzer = Arc::new(CvAnalyzer::new(
        extractor,
        config.scanned_pdf_strategy,
        ocr,
    ));

    let state = AppState {
        analyzer,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
