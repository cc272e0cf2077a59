//! Settings merged from built-in defaults, an optional `qa-rag.toml`, and
//! `QA_RAG_*` environment variables (`__` separates nested keys, e.g.
//! `QA_RAG_EMBEDDING__MODEL_ID`).

use crate::error::ConfigError;
use crate::generation::ProviderKind;
use crate::models::IndexOptions;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "qa-rag.toml";
pub const ENV_PREFIX: &str = "QA_RAG_";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Ngram,
    OpenAi,
    Cohere,
    Ollama,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorDbBackend {
    Qdrant,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub model_id: String,
    pub size: usize,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Ngram,
            model_id: "ngram-hash".to_string(),
            size: crate::embeddings::DEFAULT_EMBEDDING_DIMENSIONS,
            base_url: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationSettings {
    pub backend: ProviderKind,
    pub model_id: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            backend: ProviderKind::Disabled,
            model_id: String::new(),
            base_url: None,
            api_key: None,
            temperature: 0.1,
            max_output_tokens: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VectorDbSettings {
    pub backend: VectorDbBackend,
    pub url: String,
    pub api_key: Option<String>,
}

impl Default for VectorDbSettings {
    fn default() -> Self {
        Self {
            backend: VectorDbBackend::Qdrant,
            url: "http://localhost:6333".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub app_name: String,
    pub app_version: String,
    /// Root holding one directory of uploaded files per project.
    pub files_dir: PathBuf,
    pub file_allowed_extensions: Vec<String>,
    pub file_default_chunk_size: usize,
    pub file_default_overlap_size: usize,
    pub embedding_batch_size: usize,
    pub search_default_limit: usize,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub vector_db: VectorDbSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "qa-rag".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            files_dir: PathBuf::from("assets/files"),
            file_allowed_extensions: vec!["json".to_string(), "csv".to_string()],
            file_default_chunk_size: 100,
            file_default_overlap_size: crate::chunking::DEFAULT_OVERLAP_CHARS,
            embedding_batch_size: crate::batcher::DEFAULT_BATCH_SIZE,
            search_default_limit: 3,
            embedding: EmbeddingSettings::default(),
            generation: GenerationSettings::default(),
            vector_db: VectorDbSettings::default(),
        }
    }
}

impl Settings {
    pub fn figment(config_file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    pub fn load_from(config_file: &Path) -> Result<Self, ConfigError> {
        let settings: Settings = Self::figment(config_file).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.file_default_chunk_size <= self.file_default_overlap_size {
            return Err(ConfigError::Invalid {
                key: "file_default_chunk_size",
                details: format!(
                    "{} must exceed the default overlap {}",
                    self.file_default_chunk_size, self.file_default_overlap_size
                ),
            });
        }
        if self.embedding_batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "embedding_batch_size",
                details: "must be at least 1".to_string(),
            });
        }
        if self.embedding.size == 0 {
            return Err(ConfigError::Invalid {
                key: "embedding.size",
                details: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        self.file_allowed_extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }

    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            chunk_size: None,
            overlap_size: self.file_default_overlap_size,
            batch_size: self.embedding_batch_size,
            reset: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let settings = Settings::load_from(&dir.path().join("absent.toml"))?;
        assert_eq!(settings.file_default_chunk_size, 100);
        assert_eq!(settings.embedding_batch_size, 64);
        assert_eq!(settings.vector_db.backend, VectorDbBackend::Qdrant);
        Ok(())
    }

    #[test]
    fn toml_overrides_nested_sections() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("qa-rag.toml");
        fs::write(
            &path,
            r#"
            file_default_chunk_size = 400
            search_default_limit = 5

            [embedding]
            backend = "cohere"
            model_id = "embed-multilingual-v3.0"
            size = 1024

            [generation]
            backend = "cohere"
            model_id = "command-r"

            [vector_db]
            backend = "memory"
            "#,
        )?;

        let settings = Settings::load_from(&path)?;

        assert_eq!(settings.file_default_chunk_size, 400);
        assert_eq!(settings.file_default_overlap_size, 20);
        assert_eq!(settings.embedding.backend, EmbeddingBackend::Cohere);
        assert_eq!(settings.embedding.size, 1024);
        assert_eq!(settings.generation.backend, ProviderKind::Cohere);
        assert_eq!(settings.vector_db.backend, VectorDbBackend::Memory);
        assert_eq!(settings.vector_db.url, "http://localhost:6333");
        Ok(())
    }

    #[test]
    fn overlap_must_stay_below_chunk_size() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("qa-rag.toml");
        fs::write(&path, "file_default_chunk_size = 10\nfile_default_overlap_size = 10\n")?;

        let result = Settings::load_from(&path);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
        Ok(())
    }

    #[test]
    fn extension_check_ignores_case_and_dots() {
        let settings = Settings::default();
        assert!(settings.is_allowed_extension(".JSON"));
        assert!(settings.is_allowed_extension("csv"));
        assert!(!settings.is_allowed_extension("pdf"));
    }
}
