use super::{check_dimensions, endpoint};
use crate::embeddings::{BulkEmbedder, Embedder};
use crate::error::{EmbeddingError, GenerationError};
use crate::generation::{GenerationProfile, Generator, ProviderKind};
use crate::models::{ChatMessage, EmbeddingRole};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const BACKEND: &str = "openai";

/// OpenAI-compatible `/embeddings` client. Roles are not distinguished.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
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
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
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
impl BulkEmbedder for OpenAiEmbedder {
    async fn embed_batch(
        &self,
        texts: &[String],
        _role: EmbeddingRole,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .client
            .post(endpoint(&self.base_url, "embeddings")?)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let mut response: EmbeddingResponse = request.send().await?.error_for_status()?.json().await?;
        if response.data.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: response.data.len(),
            });
        }

        response.data.sort_by_key(|item| item.index);
        let vectors = response
            .data
            .into_iter()
            .map(|item| item.embedding)
            .collect::<Vec<_>>();
        check_dimensions(BACKEND, self.dimensions, &vectors)?;
        Ok(vectors)
    }
}

/// OpenAI-compatible `/chat/completions` client.
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    profile: GenerationProfile,
}

impl OpenAiGenerator {
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
            profile: GenerationProfile::for_provider(ProviderKind::OpenAi),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn profile(&self) -> &GenerationProfile {
        &self.profile
    }

    async fn generate(
        &self,
        prompt: &str,
        chat_history: &[ChatMessage],
    ) -> Result<String, GenerationError> {
        let mut messages = chat_history.to_vec();
        messages.push(ChatMessage::new("user", prompt));

        let mut request = self
            .client
            .post(endpoint(&self.base_url, "chat/completions")?)
            .json(&ChatRequest {
                model: &self.model,
                messages,
                temperature: self.temperature,
                max_tokens: self.max_output_tokens,
            });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response: ChatResponse = request.send().await?.error_for_status()?.json().await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::BackendResponse {
                backend: BACKEND.to_string(),
                details: "response carried no choices".to_string(),
            })
    }
}
