//! HTTP-backed `EmbeddingService` and `CompletionService` implementations,
//! for wiring the engine against a real embedding/completion backend in
//! production. A thin `reqwest` client, a request/response pair per
//! endpoint, and errors mapped into `EngineError::TransientExternal` so a
//! flaky backend degrades gracefully instead of taking down the pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::services::{CompletionService, EmbeddingService};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

pub struct HttpEmbeddingService {
    service_url: String,
    client: reqwest::Client,
}

impl HttpEmbeddingService {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self { service_url: service_url.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl EmbeddingService for HttpEmbeddingService {
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        let url = format!("{}/embed", self.service_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest { input: text })
            .send()
            .await
            .map_err(|e| EngineError::transient(format!("embedding service request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::transient(format!("embedding service error ({status}): {body}")));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EngineError::transient(format!("embedding service returned unparseable response: {e}")))?;
        Ok(parsed.embedding)
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    text: String,
}

pub struct HttpCompletionService {
    service_url: String,
    client: reqwest::Client,
}

impl HttpCompletionService {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self { service_url: service_url.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl CompletionService for HttpCompletionService {
    async fn complete(&self, prompt: &str, model: &str, temperature: f32, max_tokens: u32) -> EngineResult<String> {
        let url = format!("{}/complete", self.service_url);
        let response = self
            .client
            .post(&url)
            .json(&CompletionRequest { prompt, model, temperature, max_tokens })
            .send()
            .await
            .map_err(|e| EngineError::transient(format!("completion service request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::transient(format!("completion service error ({status}): {body}")));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| EngineError::transient(format!("completion service returned unparseable response: {e}")))?;
        Ok(parsed.text)
    }
}
