use crate::error::StoreError;
use crate::models::{Metadata, RetrievedDocument};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One embedded chunk ready for insertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexRecord {
    pub id: u64,
    pub text: String,
    pub metadata: Metadata,
    pub vector: Vec<f32>,
}

/// Collection-scoped vector storage.
///
/// Every vector inserted into or searched against a collection must have the
/// `embedding_size` the collection was created with.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates `name` unless it already exists. With `reset`, an existing
    /// collection is dropped first. Returns whether a collection was created.
    async fn create_collection(
        &self,
        name: &str,
        embedding_size: usize,
        reset: bool,
    ) -> Result<bool, StoreError>;

    /// Returns whether a collection was dropped.
    async fn delete_collection(&self, name: &str) -> Result<bool, StoreError>;

    async fn collection_info(&self, name: &str) -> Result<Value, StoreError>;

    async fn insert_many(&self, name: &str, records: Vec<IndexRecord>) -> Result<(), StoreError>;

    /// Up to `limit` documents by descending score; ties keep store order.
    async fn search_by_vector(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedDocument>, StoreError>;
}

pub(crate) fn sort_by_score(documents: &mut [RetrievedDocument]) {
    documents.sort_by(|left, right| right.score.total_cmp(&left.score));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorting_is_descending_and_stable() {
        let mut documents = vec![
            RetrievedDocument { score: 0.2, text: "c".into() },
            RetrievedDocument { score: 0.9, text: "a".into() },
            RetrievedDocument { score: 0.2, text: "d".into() },
            RetrievedDocument { score: 0.5, text: "b".into() },
        ];

        sort_by_score(&mut documents);

        let texts = documents.iter().map(|doc| doc.text.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, ["a", "b", "c", "d"]);
    }
}
