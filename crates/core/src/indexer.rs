use crate::batcher::EmbeddingBatcher;
use crate::collection::collection_name;
use crate::embeddings::Embedder;
use crate::error::PipelineError;
use crate::models::{Chunk, EmbeddingRole};
use crate::store::{IndexRecord, VectorStore};
use tracing::info;

/// Default chunk ids: each chunk's position in the indexed sequence.
pub fn positional_ids(count: usize) -> Vec<u64> {
    (0..count as u64).collect()
}

pub struct VectorIndexer<'a> {
    embedder: &'a dyn Embedder,
    store: &'a dyn VectorStore,
    batcher: EmbeddingBatcher,
}

impl<'a> VectorIndexer<'a> {
    pub fn new(embedder: &'a dyn Embedder, store: &'a dyn VectorStore, batcher: EmbeddingBatcher) -> Self {
        Self {
            embedder,
            store,
            batcher,
        }
    }

    /// Embeds and inserts `chunks` under `ids` into the project collection,
    /// returning the number of inserted points.
    pub async fn index(
        &self,
        project_id: &str,
        chunks: &[Chunk],
        ids: &[u64],
        reset: bool,
    ) -> Result<usize, PipelineError> {
        if chunks.len() != ids.len() {
            return Err(PipelineError::InvalidArgument(format!(
                "{} ids supplied for {} chunks",
                ids.len(),
                chunks.len()
            )));
        }

        let collection = collection_name(project_id);
        let embedding_size = self.embedder.dimensions();

        let created = self
            .store
            .create_collection(&collection, embedding_size, reset)
            .await?;

        let texts = chunks.iter().map(|chunk| chunk.text.clone()).collect::<Vec<_>>();
        let vectors = self
            .batcher
            .embed(self.embedder, &texts, EmbeddingRole::Document)
            .await?;

        let records = chunks
            .iter()
            .zip(ids)
            .zip(vectors)
            .map(|((chunk, id), vector)| IndexRecord {
                id: *id,
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                vector,
            })
            .collect::<Vec<_>>();

        let inserted = records.len();
        self.store.insert_many(&collection, records).await?;

        info!(
            project_id,
            collection = %collection,
            created,
            reset,
            inserted,
            batch_size = self.batcher.batch_size(),
            "indexed chunks"
        );
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::NgramEmbedder;
    use crate::error::StoreError;
    use crate::models::Metadata;
    use crate::stores::InMemoryStore;

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .map(|text| Chunk::new(*text, Metadata::new()))
            .collect()
    }

    #[tokio::test]
    async fn index_creates_collection_and_inserts() -> Result<(), PipelineError> {
        let embedder = NgramEmbedder::new(16);
        let store = InMemoryStore::new();
        let indexer = VectorIndexer::new(&embedder, &store, EmbeddingBatcher::new(2));
        let items = chunks(&["alpha", "beta", "gamma"]);

        let inserted = indexer
            .index(" p1 ", &items, &positional_ids(items.len()), false)
            .await?;

        assert_eq!(inserted, 3);
        let info = store.collection_info("collection_p1").await?;
        assert_eq!(info["points_count"], 3);
        assert_eq!(info["embedding_size"], 16);
        Ok(())
    }

    #[tokio::test]
    async fn reindex_without_reset_keeps_points_and_reset_drops_them() -> Result<(), PipelineError> {
        let embedder = NgramEmbedder::new(8);
        let store = InMemoryStore::new();
        let indexer = VectorIndexer::new(&embedder, &store, EmbeddingBatcher::default());

        indexer.index("p", &chunks(&["a", "b"]), &[0, 1], false).await?;
        indexer.index("p", &chunks(&["c"]), &[7], false).await?;
        assert_eq!(store.collection_info("collection_p").await?["points_count"], 3);

        indexer.index("p", &chunks(&["d"]), &[0], true).await?;
        assert_eq!(store.collection_info("collection_p").await?["points_count"], 1);
        Ok(())
    }

    #[tokio::test]
    async fn id_count_must_match_chunks() {
        let embedder = NgramEmbedder::new(8);
        let store = InMemoryStore::new();
        let indexer = VectorIndexer::new(&embedder, &store, EmbeddingBatcher::default());

        let result = indexer.index("p", &chunks(&["a", "b"]), &[0], false).await;
        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn dimension_conflicts_surface_as_vector_db_errors() -> Result<(), PipelineError> {
        let store = InMemoryStore::new();
        store.create_collection("collection_p", 4, false).await?;

        let embedder = NgramEmbedder::new(8);
        let indexer = VectorIndexer::new(&embedder, &store, EmbeddingBatcher::default());
        let result = indexer.index("p", &chunks(&["a"]), &[0], false).await;

        assert!(matches!(
            result,
            Err(PipelineError::VectorDb(StoreError::DimensionMismatch { .. }))
        ));
        Ok(())
    }
}
