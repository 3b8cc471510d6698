mod analysis;
mod config;
mod db;
mod engine;
mod errors;
mod llm_client;
mod matching;
mod routes;
mod scoring;
mod state;
mod store;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::engine::AtsEngine;
use crate::llm_client::{LlmClient, TextCapability};
use crate::matching::LlmSkillExtractor;
use crate::routes::build_router;
use crate::scoring::ScoringPolicy;
use crate::state::AppState;
use crate::store::{EntryBackend, FsBackend, MemoryIndex, PgIndex, VersionedResultStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATS Engine v{}", env!("CARGO_PKG_VERSION"));

    // Scoring policy: versioned weights and thresholds
    let policy = match &config.scoring_policy_path {
        Some(path) => ScoringPolicy::from_json_file(path)
            .with_context(|| format!("Failed to load scoring policy from {}", path.display()))?,
        None => ScoringPolicy::default(),
    };
    info!(
        "Scoring policy {} (quorum {} components)",
        policy.version, policy.min_components
    );

    // Result store: index (PostgreSQL or in-memory) + file tree
    let (index, index_backend): (Arc<dyn EntryBackend>, &'static str) =
        match &config.database_url {
            Some(url) => (Arc::new(PgIndex::new(create_pool(url).await?)), "postgres"),
            None => {
                warn!("DATABASE_URL not set; indexing in memory, file tree is the durable copy");
                (Arc::new(MemoryIndex::new()), "memory")
            }
        };
    let files = Arc::new(FsBackend::new(config.results_dir.clone()));
    info!("Analysis results directory: {}", files.root().display());
    let store = Arc::new(VersionedResultStore::new(index, files));

    // Initialize LLM client
    let client = LlmClient::new(config.anthropic_api_key.clone(), config.llm.clone())
        .context("Failed to build the LLM HTTP client")?;
    info!("LLM client initialized (model: {})", client.model());
    let llm: Arc<dyn TextCapability> = Arc::new(client);

    let extractor = Arc::new(LlmSkillExtractor::new(Arc::clone(&llm)));
    let engine = AtsEngine::new(extractor, llm, policy, store, config.component_timeout);

    let state = AppState {
        engine: Arc::new(engine),
        index_backend,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client is deployed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
