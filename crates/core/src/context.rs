use crate::config::{EmbeddingBackend, Settings, VectorDbBackend};
use crate::embeddings::{Embedder, NgramEmbedder};
use crate::error::PipelineError;
use crate::generation::{DisabledGenerator, Generator, ProviderKind};
use crate::ingest::ProjectFiles;
use crate::prompt::TemplateParser;
use crate::providers::{CohereEmbedder, CohereGenerator, OllamaEmbedder, OpenAiEmbedder, OpenAiGenerator};
use crate::store::VectorStore;
use crate::stores::{InMemoryStore, QdrantStore};
use std::sync::Arc;
use tracing::info;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const COHERE_BASE_URL: &str = "https://api.cohere.ai/v1";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Backends and settings shared by every request. Built once at startup and
/// handed to the pipeline stages explicitly.
#[derive(Clone)]
pub struct ServiceContext {
    pub settings: Settings,
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn VectorStore>,
    pub generator: Arc<dyn Generator>,
    pub templates: TemplateParser,
    pub files: ProjectFiles,
}

impl ServiceContext {
    pub fn new(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let files = ProjectFiles::new(settings.files_dir.clone());
        Self {
            settings,
            embedder,
            store,
            generator,
            templates: TemplateParser::default(),
            files,
        }
    }

    /// Builds the configured backends.
    pub fn from_settings(settings: Settings) -> Result<Self, PipelineError> {
        let embedder = build_embedder(&settings);
        let store = build_store(&settings)?;
        let generator = build_generator(&settings);

        info!(
            embedding_backend = ?settings.embedding.backend,
            embedding_size = embedder.dimensions(),
            generation_backend = ?generator.profile().provider,
            vector_db_backend = ?settings.vector_db.backend,
            "service context ready"
        );

        Ok(Self::new(settings, embedder, store, generator))
    }
}

fn base_url(configured: &Option<String>, fallback: &str) -> String {
    configured.clone().unwrap_or_else(|| fallback.to_string())
}

fn build_embedder(settings: &Settings) -> Arc<dyn Embedder> {
    let embedding = &settings.embedding;
    let embedder: Arc<dyn Embedder> = match embedding.backend {
        EmbeddingBackend::Ngram => Arc::new(NgramEmbedder::new(embedding.size)),
        EmbeddingBackend::OpenAi => Arc::new(OpenAiEmbedder::new(
            base_url(&embedding.base_url, OPENAI_BASE_URL),
            embedding.api_key.clone(),
            embedding.model_id.clone(),
            embedding.size,
        )),
        EmbeddingBackend::Cohere => Arc::new(CohereEmbedder::new(
            base_url(&embedding.base_url, COHERE_BASE_URL),
            embedding.api_key.clone(),
            embedding.model_id.clone(),
            embedding.size,
        )),
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(
            base_url(&embedding.base_url, OLLAMA_BASE_URL),
            embedding.model_id.clone(),
            embedding.size,
        )),
    };
    embedder
}

fn build_generator(settings: &Settings) -> Arc<dyn Generator> {
    let generation = &settings.generation;
    let generator: Arc<dyn Generator> = match generation.backend {
        ProviderKind::OpenAi => Arc::new(OpenAiGenerator::new(
            base_url(&generation.base_url, OPENAI_BASE_URL),
            generation.api_key.clone(),
            generation.model_id.clone(),
            generation.temperature,
            generation.max_output_tokens,
        )),
        ProviderKind::Cohere => Arc::new(CohereGenerator::new(
            base_url(&generation.base_url, COHERE_BASE_URL),
            generation.api_key.clone(),
            generation.model_id.clone(),
            generation.temperature,
            generation.max_output_tokens,
        )),
        ProviderKind::Disabled => Arc::new(DisabledGenerator::default()),
    };
    generator
}

fn build_store(settings: &Settings) -> Result<Arc<dyn VectorStore>, PipelineError> {
    let vector_db = &settings.vector_db;
    let store: Arc<dyn VectorStore> = match vector_db.backend {
        VectorDbBackend::Qdrant => Arc::new(QdrantStore::new(
            &vector_db.url,
            vector_db.api_key.clone(),
        )?),
        VectorDbBackend::Memory => Arc::new(InMemoryStore::new()),
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingSettings;

    #[test]
    fn defaults_build_ngram_and_disabled_generation() -> Result<(), PipelineError> {
        let context = ServiceContext::from_settings(Settings::default())?;
        assert_eq!(context.embedder.dimensions(), 128);
        assert_eq!(context.generator.profile().provider, ProviderKind::Disabled);
        Ok(())
    }

    #[test]
    fn cohere_generation_uses_uppercase_system_role() -> Result<(), PipelineError> {
        let mut settings = Settings::default();
        settings.generation.backend = ProviderKind::Cohere;
        settings.embedding = EmbeddingSettings {
            backend: EmbeddingBackend::Cohere,
            model_id: "embed-multilingual-v3.0".to_string(),
            size: 1024,
            ..EmbeddingSettings::default()
        };
        settings.vector_db.backend = VectorDbBackend::Memory;

        let context = ServiceContext::from_settings(settings)?;
        assert_eq!(context.generator.profile().system_role, "SYSTEM");
        assert_eq!(context.embedder.dimensions(), 1024);
        assert!(context.embedder.bulk().is_some());
        Ok(())
    }

    #[test]
    fn malformed_qdrant_url_is_a_vector_db_error() {
        let mut settings = Settings::default();
        settings.vector_db.url = "not a url".to_string();
        let result = ServiceContext::from_settings(settings);
        assert!(matches!(result, Err(PipelineError::VectorDb(_))));
    }
}
