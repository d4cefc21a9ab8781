mod analysis;
mod config;
mod embedding;
mod errors;
mod history;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::keywords::{ReferenceCorpus, StopWords};
use crate::analysis::{Pipeline, PipelineResources};
use crate::config::Config;
use crate::embedding::{Embedder, HashedEmbedder, HttpEmbedder};
use crate::history::InMemoryHistory;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Analyzer v{}", env!("CARGO_PKG_VERSION"));

    let embedder = build_embedder(&config)?;
    info!(
        "Embedder initialized (backend: {}, dims: {})",
        embedder.backend(),
        embedder.dimensions()
    );

    let resources = build_resources(&config, embedder)?;
    let pipeline = Pipeline::new(config.analysis_config(), resources)
        .context("Invalid analysis configuration")?;

    let history = Arc::new(InMemoryHistory::new(config.history_capacity));
    info!("History store initialized (capacity: {})", config.history_capacity);

    let state = AppState { pipeline, history };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// HTTP embedder when an API key is configured, otherwise the offline hashed embedder.
fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    match &config.embedding_api_key {
        Some(api_key) => {
            let embedder = HttpEmbedder::new(
                config.embedding_api_url.clone(),
                api_key.clone(),
                config.embedding_model.clone(),
                config.embedding_dims,
            )
            .context("Failed to build HTTP embedding client")?;
            info!("Using embedding model {}", config.embedding_model);
            Ok(Arc::new(embedder))
        }
        None => Ok(Arc::new(HashedEmbedder::new(config.hashed_embedding_dims))),
    }
}

/// Stopwords and background corpus, from files when configured.
fn build_resources(config: &Config, embedder: Arc<dyn Embedder>) -> Result<PipelineResources> {
    let stopwords = match &config.stopwords_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read stopwords from '{path}'"))?;
            StopWords::from_lines(&text)
        }
        None => StopWords::english(),
    };
    if stopwords.is_empty() {
        warn!("Stopword list is empty; every word is a keyword candidate");
    } else {
        info!("Loaded {} stopwords", stopwords.len());
    }

    let corpus = match &config.reference_corpus_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read reference corpus from '{path}'"))?;
            ReferenceCorpus::from_lines(&text, &stopwords)
        }
        None => ReferenceCorpus::builtin(&stopwords),
    };
    if corpus.is_empty() {
        warn!("Reference corpus is empty; keyword weights reduce to term frequency");
    } else {
        info!("Reference corpus: {} documents", corpus.len());
    }

    Ok(PipelineResources::new(stopwords, corpus, embedder))
}
