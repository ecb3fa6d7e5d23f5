//! HTTP surface: `POST /query`, `GET /stats`, `GET /years`, `GET /categories`,
//! `GET /health`, following an `ErrorResponse`/typed-response-struct
//! convention and a `create_router`/`run_server` split.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::answer::EnhancedAnswer;
use crate::engine::SharedEngine;
use crate::query::QueryOverrides;
use crate::services::{CompletionService, EmbeddingService};

pub struct AppState {
    pub engine: SharedEngine,
    pub embedding: Arc<dyn EmbeddingService>,
    pub completion: Arc<dyn CompletionService>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub year_filter: Option<i32>,
    #[serde(default)]
    pub category_filter: Option<String>,
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub num_chunks: usize,
    pub num_documents: usize,
    pub num_communities: usize,
    pub num_edges: usize,
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<EnhancedAnswer>, (StatusCode, Json<ErrorResponse>)> {
    info!(query = %req.query, "received query");
    if req.query.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse { error: "query must not be empty".to_string() }),
        ));
    }
    let overrides = QueryOverrides {
        year_filter: req.year_filter,
        category_filter: req.category_filter,
        max_results: req.max_results,
    };
    let answer = crate::pipeline::answer_query_with_overrides(
        &state.engine,
        &req.query,
        state.embedding.as_ref(),
        state.completion.as_ref(),
        &overrides,
    )
    .await;
    if let Some(err) = &answer.error {
        error!(error = %err, "pipeline returned a failed answer");
    }
    Ok(Json(answer))
}

async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let docs: HashSet<&str> = state.engine.chunks.iter().map(|c| c.doc_id.as_str()).collect();
    Json(StatsResponse {
        num_chunks: state.engine.chunks.len(),
        num_documents: docs.len(),
        num_communities: state.engine.graph.communities.len(),
        num_edges: state.engine.graph.edge_count(),
    })
}

async fn years_handler(State(state): State<Arc<AppState>>) -> Json<Vec<i32>> {
    let mut years: Vec<i32> = state.engine.chunks.iter().flat_map(|c| c.years.clone()).collect();
    years.sort_unstable();
    years.dedup();
    Json(years)
}

async fn categories_handler(State(state): State<Arc<AppState>>) -> Json<Vec<(String, usize)>> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for chunk in &state.engine.chunks {
        *counts.entry(chunk.category.clone()).or_insert(0) += 1;
    }
    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    Json(entries)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "oriongraph".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/query", post(query_handler))
        .route("/stats", get(stats_handler))
        .route("/years", get(years_handler))
        .route("/categories", get(categories_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

pub async fn run_server(state: Arc<AppState>, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    info!("starting oriongraph server on {addr}");

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
