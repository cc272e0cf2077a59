use crate::error::GenerationError;
use crate::models::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Cohere,
    /// No generation backend; every answer falls back to retrieval.
    Disabled,
}

impl ProviderKind {
    pub fn system_role_label(self) -> &'static str {
        match self {
            Self::Cohere => "SYSTEM",
            Self::OpenAi | Self::Disabled => "system",
        }
    }
}

/// Per-provider conventions fixed when the backend is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationProfile {
    pub provider: ProviderKind,
    pub system_role: String,
}

impl GenerationProfile {
    pub fn for_provider(provider: ProviderKind) -> Self {
        Self {
            provider,
            system_role: provider.system_role_label().to_string(),
        }
    }
}

#[async_trait]
pub trait Generator: Send + Sync {
    fn profile(&self) -> &GenerationProfile;

    async fn generate(
        &self,
        prompt: &str,
        chat_history: &[ChatMessage],
    ) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone)]
pub struct DisabledGenerator {
    profile: GenerationProfile,
}

impl Default for DisabledGenerator {
    fn default() -> Self {
        Self {
            profile: GenerationProfile::for_provider(ProviderKind::Disabled),
        }
    }
}

#[async_trait]
impl Generator for DisabledGenerator {
    fn profile(&self) -> &GenerationProfile {
        &self.profile
    }

    async fn generate(&self, _prompt: &str, _history: &[ChatMessage]) -> Result<String, GenerationError> {
        Err(GenerationError::Unavailable("no generation backend configured".to_string()))
    }
}
