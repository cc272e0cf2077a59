use super::{check_dimensions, endpoint};
use crate::embeddings::{BulkEmbedder, Embedder};
use crate::error::{EmbeddingError, GenerationError};
use crate::generation::{GenerationProfile, Generator, ProviderKind};
use crate::models::{ChatMessage, EmbeddingRole};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const BACKEND: &str = "cohere";

fn input_type(role: EmbeddingRole) -> &'static str {
    match role {
        EmbeddingRole::Document => "search_document",
        EmbeddingRole::Query => "search_query",
    }
}

/// Cohere `/embed` client; documents and queries use different input types.
#[derive(Clone)]
pub struct CohereEmbedder {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
}

impl CohereEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            dimensions,
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    input_type: &'static str,
    embedding_types: [&'static str; 1],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Embeddings,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Embeddings {
    Typed { float: Vec<Vec<f32>> },
    Plain(Vec<Vec<f32>>),
}

impl Embeddings {
    fn into_vectors(self) -> Vec<Vec<f32>> {
        match self {
            Self::Typed { float } => float,
            Self::Plain(vectors) => vectors,
        }
    }
}

#[async_trait]
impl Embedder for CohereEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str, role: EmbeddingRole) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()], role).await?;
        Ok(vectors.pop().unwrap_or_default())
    }

    fn bulk(&self) -> Option<&dyn BulkEmbedder> {
        Some(self)
    }
}

#[async_trait]
impl BulkEmbedder for CohereEmbedder {
    async fn embed_batch(
        &self,
        texts: &[String],
        role: EmbeddingRole,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.client.post(endpoint(&self.base_url, "embed")?).json(&EmbedRequest {
            model: &self.model,
            texts,
            input_type: input_type(role),
            embedding_types: ["float"],
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response: EmbedResponse = request.send().await?.error_for_status()?.json().await?;
        let vectors = response.embeddings.into_vectors();
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }

        check_dimensions(BACKEND, self.dimensions, &vectors)?;
        Ok(vectors)
    }
}

/// Cohere `/chat` client. The system prompt travels in `chat_history` with
/// the uppercase role label this API expects.
#[derive(Clone)]
pub struct CohereGenerator {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    profile: GenerationProfile,
}

impl CohereGenerator {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        temperature: f32,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            temperature,
            max_output_tokens,
            profile: GenerationProfile::for_provider(ProviderKind::Cohere),
        }
    }
}

#[derive(Serialize)]
struct HistoryEntry<'a> {
    role: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    message: &'a str,
    chat_history: Vec<HistoryEntry<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl Generator for CohereGenerator {
    fn profile(&self) -> &GenerationProfile {
        &self.profile
    }

    async fn generate(
        &self,
        prompt: &str,
        chat_history: &[ChatMessage],
    ) -> Result<String, GenerationError> {
        let history = chat_history
            .iter()
            .map(|message| HistoryEntry {
                role: &message.role,
                message: &message.content,
            })
            .collect();

        let mut request = self.client.post(endpoint(&self.base_url, "chat")?).json(&ChatRequest {
            model: &self.model,
            message: prompt,
            chat_history: history,
            temperature: self.temperature,
            max_tokens: self.max_output_tokens,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response: ChatResponse = request.send().await?.error_for_status()?.json().await?;
        response.text.ok_or_else(|| GenerationError::BackendResponse {
            backend: BACKEND.to_string(),
            details: "response carried no text".to_string(),
        })
    }
}
