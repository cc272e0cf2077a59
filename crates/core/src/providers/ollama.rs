use super::{check_dimensions, endpoint};
use crate::embeddings::Embedder;
use crate::error::EmbeddingError;
use crate::models::EmbeddingRole;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const BACKEND: &str = "ollama";

/// Ollama `/api/embeddings` client. One text per request, so the batcher
/// falls back to per-item calls.
#[derive(Clone)]
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            dimensions,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str, _role: EmbeddingRole) -> Result<Vec<f32>, EmbeddingError> {
        let response: EmbeddingResponse = self
            .client
            .post(endpoint(&self.base_url, "api/embeddings")?)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // An empty embedding is passed through; callers treat it as "nothing to retrieve".
        if !response.embedding.is_empty() {
            check_dimensions(BACKEND, self.dimensions, std::slice::from_ref(&response.embedding))?;
        }
        Ok(response.embedding)
    }
}
