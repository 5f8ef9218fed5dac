//! MediGenius - medical question answering with a source fallback chain
//!
//! Each question goes to the model's own knowledge first, then the local
//! document index, the encyclopedia, and finally web search.

mod api;
mod config;
mod index;
mod llm;
mod orchestrator;
mod prompt;
mod session;
mod sources;
mod state_machine;

use api::{create_router, AppState};
use config::Config;
use index::{Chunker, DocumentIndex};
use llm::{LlmConfig, ModelRegistry, Provider};
use orchestrator::FallbackOrchestrator;
use session::SessionManager;
use sources::{
    AnswerGenerator, DuckDuckGo, IndexedDocuments, LlmAdvisor, NoModel, ParametricSource,
    Wikipedia,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medigenius=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env()?;

    // Document index
    let index = open_index(&config).await?;

    // Language model
    let llm_config = LlmConfig::from_env();
    let llm_registry = ModelRegistry::new(&llm_config);

    let (parametric, generator): (Arc<dyn ParametricSource>, Arc<dyn AnswerGenerator>) =
        if let Some(llm) = llm_registry.default() {
            tracing::info!(
                models = ?llm_registry.available_models(),
                default = llm.model_id(),
                "LLM registry initialized"
            );
            let advisor = Arc::new(LlmAdvisor::new(llm, config.sampling, config.llm_timeout));
            (advisor.clone(), advisor)
        } else {
            let keys: Vec<&str> = [Provider::Groq, Provider::OpenAI, Provider::Anthropic]
                .into_iter()
                .map(Provider::api_key_env_var)
                .collect();
            tracing::warn!(
                "No LLM API keys configured. Set one of {} or LLM_GATEWAY. \
                 Every answer will come back as an error message.",
                keys.join(", ")
            );
            (Arc::new(NoModel), Arc::new(NoModel))
        };

    // Lookup sources
    let encyclopedia = Wikipedia::new(config.wiki_top_k, config.wiki_max_chars, config.source_timeout)?;
    let web = DuckDuckGo::new(config.source_timeout);
    let documents = IndexedDocuments::new(index.clone(), config.top_k, config.source_timeout);

    let orchestrator = FallbackOrchestrator::new(
        parametric,
        Arc::new(documents),
        Arc::new(encyclopedia),
        Arc::new(web),
        generator,
    );
    let sessions = SessionManager::new(orchestrator).with_idle_ttl(config.session_ttl);
    let state = AppState::new(sessions, index);
    if state.sessions.clone().spawn_idle_sweep().is_none() {
        tracing::info!("Session expiry disabled");
    }

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("MediGenius server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Open the on-disk index and ingest the configured documents directory.
/// Falls back to an empty in-memory index so the remaining sources still work.
async fn open_index(config: &Config) -> index::IndexResult<DocumentIndex> {
    let chunker = Chunker::new(config.chunk_size, config.chunk_overlap);
    let path = config.index_path.clone();
    let docs_dir = config.docs_dir.clone();

    let opened = tokio::task::spawn_blocking({
        let chunker = chunker.clone();
        move || -> index::IndexResult<DocumentIndex> {
            tracing::info!(path = %path.display(), "Opening document index");
            let index = DocumentIndex::open(&path, chunker)?;

            if let Some(dir) = docs_dir {
                let report = index.ingest_dir(&dir)?;
                tracing::info!(
                    dir = %dir.display(),
                    scanned = report.scanned,
                    indexed = report.indexed,
                    unchanged = report.unchanged,
                    skipped = report.skipped,
                    chunks = report.chunks,
                    "Document ingestion complete"
                );
            }
            Ok(index)
        }
    })
    .await;

    let failure = match opened {
        Ok(Ok(index)) => {
            if let Ok(stats) = index.stats() {
                tracing::info!(documents = stats.documents, chunks = stats.chunks, "Document index ready");
            }
            return Ok(index);
        }
        Ok(Err(e)) => e.to_string(),
        Err(e) => e.to_string(),
    };

    tracing::error!(error = %failure, "Document index unavailable, using an empty in-memory index");
    DocumentIndex::open_in_memory(chunker)
}
