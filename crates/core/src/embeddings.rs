use crate::error::EmbeddingError;
use crate::models::EmbeddingRole;
use async_trait::async_trait;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 128;

/// An embedding backend. Every backend can embed one text per call; those
/// that also accept whole batches expose that through [`Embedder::bulk`].
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Vector length every call returns, fixed for the backend's lifetime.
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str, role: EmbeddingRole) -> Result<Vec<f32>, EmbeddingError>;

    fn bulk(&self) -> Option<&dyn BulkEmbedder> {
        None
    }
}

#[async_trait]
pub trait BulkEmbedder: Send + Sync {
    /// Returns exactly one vector per input, in input order.
    async fn embed_batch(
        &self,
        texts: &[String],
        role: EmbeddingRole,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Offline embedder hashing character trigrams into a fixed number of
/// buckets. Useful for local runs and tests; role does not change output.
#[derive(Debug, Clone, Copy)]
pub struct NgramEmbedder {
    pub dimensions: usize,
}

impl Default for NgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl NgramEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let chars: Vec<char> = text.to_lowercase().chars().collect();

        for window in chars.windows(3) {
            let mut hash = 1469598103934665603u64;
            for byte in window.iter().collect::<String>().bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for NgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str, _role: EmbeddingRole) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.vectorize(text))
    }

    fn bulk(&self) -> Option<&dyn BulkEmbedder> {
        Some(self)
    }
}

#[async_trait]
impl BulkEmbedder for NgramEmbedder {
    async fn embed_batch(
        &self,
        texts: &[String],
        _role: EmbeddingRole,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }
}
