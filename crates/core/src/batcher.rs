use crate::embeddings::Embedder;
use crate::error::EmbeddingError;
use crate::models::EmbeddingRole;
use tracing::debug;

pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Embeds texts in fixed-size windows, one window at a time.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddingBatcher {
    batch_size: usize,
}

impl Default for EmbeddingBatcher {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl EmbeddingBatcher {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn embed(
        &self,
        embedder: &dyn Embedder,
        texts: &[String],
        role: EmbeddingRole,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());

        for (batch, window) in texts.chunks(self.batch_size).enumerate() {
            let embedded = match embedder.bulk() {
                Some(bulk) => bulk.embed_batch(window, role).await?,
                None => {
                    let mut embedded = Vec::with_capacity(window.len());
                    for text in window {
                        embedded.push(embedder.embed(text, role).await?);
                    }
                    embedded
                }
            };

            if embedded.len() != window.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: window.len(),
                    got: embedded.len(),
                });
            }

            debug!(batch, size = window.len(), role = role.as_str(), "embedded window");
            vectors.extend(embedded);
        }

        Ok(vectors)
    }
}
