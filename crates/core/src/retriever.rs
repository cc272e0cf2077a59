use crate::collection::collection_name;
use crate::embeddings::Embedder;
use crate::error::PipelineError;
use crate::models::{EmbeddingRole, RetrievedDocument};
use crate::store::VectorStore;
use tracing::debug;

pub struct Retriever<'a> {
    embedder: &'a dyn Embedder,
    store: &'a dyn VectorStore,
}

impl<'a> Retriever<'a> {
    pub fn new(embedder: &'a dyn Embedder, store: &'a dyn VectorStore) -> Self {
        Self { embedder, store }
    }

    /// Nearest chunks to `query_text` by descending score.
    ///
    /// `Ok(None)` means nothing is retrievable: either the query embedded to
    /// an empty vector or the collection returned no hits. Callers cannot
    /// tell the two apart.
    pub async fn search(
        &self,
        project_id: &str,
        query_text: &str,
        limit: usize,
    ) -> Result<Option<Vec<RetrievedDocument>>, PipelineError> {
        let collection = collection_name(project_id);
        let vector = self.embedder.embed(query_text, EmbeddingRole::Query).await?;

        if vector.is_empty() {
            debug!(collection = %collection, "query embedded to an empty vector");
            return Ok(None);
        }

        let documents = self
            .store
            .search_by_vector(&collection, &vector, limit)
            .await?;

        debug!(collection = %collection, limit, hits = documents.len(), "vector search");
        Ok((!documents.is_empty()).then_some(documents))
    }
}
