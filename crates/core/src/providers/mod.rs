//! HTTP-backed embedding and generation providers.

pub mod cohere;
pub mod ollama;
pub mod openai;

pub use cohere::{CohereEmbedder, CohereGenerator};
pub use ollama::OllamaEmbedder;
pub use openai::{OpenAiEmbedder, OpenAiGenerator};

use url::Url;

/// Joins `path` under `base`, keeping any path prefix `base` carries.
pub(crate) fn endpoint(base: &str, path: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!("{}/", base.trim_end_matches('/')))?.join(path)
}

pub(crate) fn check_dimensions(
    backend: &str,
    expected: usize,
    vectors: &[Vec<f32>],
) -> Result<(), crate::error::EmbeddingError> {
    match vectors.iter().find(|vector| vector.len() != expected) {
        Some(vector) => Err(crate::error::EmbeddingError::BackendResponse {
            backend: backend.to_string(),
            details: format!("expected embedding dimension {expected}, got {}", vector.len()),
        }),
        None => Ok(()),
    }
}
