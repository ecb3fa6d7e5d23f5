//! oriongraph HTTP server binary.
//!
//! Loads a chunk corpus and its embeddings from disk, builds the knowledge
//! engine once, and serves `POST /query`, `GET /stats`, `GET /years`,
//! `GET /categories`, `GET /health` against it.

use std::sync::Arc;

use oriongraph::api::{run_server, AppState};
use oriongraph::config::EngineConfig;
use oriongraph::engine::KnowledgeEngine;
use oriongraph::http_services::{HttpCompletionService, HttpEmbeddingService};
use oriongraph::persistence::{load_chunks, load_embeddings};
use oriongraph::services::{CompletionService, EmbeddingService, MockCompletionService, MockEmbeddingService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).with_level(true).init();

    let config = EngineConfig::loaded()?;

    let chunks_path = std::env::var("ORIONGRAPH_CHUNKS_PATH").unwrap_or_else(|_| "chunks.json".to_string());
    let embeddings_path =
        std::env::var("ORIONGRAPH_EMBEDDINGS_PATH").unwrap_or_else(|_| "embeddings.bin".to_string());

    let chunks = load_chunks(&chunks_path)?;
    let embeddings = load_embeddings(&embeddings_path, config.embedding_dimension)?;

    tracing::info!(n_chunks = chunks.len(), "loaded corpus, building engine");
    let mut engine = KnowledgeEngine::build(chunks, embeddings, config)?;

    let use_real = std::env::args().any(|arg| arg == "--use-real");

    let (embedding, completion): (Arc<dyn EmbeddingService>, Arc<dyn CompletionService>) = if use_real {
        let embedding_service_url =
            std::env::var("EMBEDDING_SERVICE_URL").unwrap_or_else(|_| "http://127.0.0.1:8090".to_string());
        let completion_service_url =
            std::env::var("COMPLETION_SERVICE_URL").unwrap_or_else(|_| "http://127.0.0.1:8091".to_string());
        tracing::info!(embedding_service_url, completion_service_url, "using HTTP-backed services");
        (
            Arc::new(HttpEmbeddingService::new(embedding_service_url)),
            Arc::new(HttpCompletionService::new(completion_service_url)),
        )
    } else {
        tracing::info!("using in-process mock services");
        (
            Arc::new(MockEmbeddingService { dimension: engine.config.embedding_dimension }),
            Arc::new(MockCompletionService),
        )
    };

    if engine.config.community_summary_enabled {
        engine.summarize_communities(completion.as_ref()).await;
    }

    let host = engine.config.api_host.clone();
    let port = engine.config.api_port;
    let state = Arc::new(AppState { engine: Arc::new(engine), embedding, completion });

    run_server(state, &host, port).await
}
