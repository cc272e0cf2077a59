use crate::error::StoreError;
use crate::models::RetrievedDocument;
use crate::store::{sort_by_score, IndexRecord, VectorStore};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug)]
struct Collection {
    embedding_size: usize,
    records: Vec<IndexRecord>,
    positions: HashMap<u64, usize>,
}

/// Process-local store scoring by cosine similarity. Re-inserting an id
/// replaces the earlier point in place.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine(left: &[f32], right: &[f32]) -> f64 {
    let dot = left
        .iter()
        .zip(right)
        .map(|(a, b)| f64::from(*a) * f64::from(*b))
        .sum::<f64>();
    let left_norm = left.iter().map(|a| f64::from(*a).powi(2)).sum::<f64>().sqrt();
    let right_norm = right.iter().map(|b| f64::from(*b).powi(2)).sum::<f64>().sqrt();

    if left_norm == 0.0 || right_norm == 0.0 {
        0.0
    } else {
        dot / (left_norm * right_norm)
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn create_collection(
        &self,
        name: &str,
        embedding_size: usize,
        reset: bool,
    ) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;

        if reset {
            collections.remove(name);
        }

        if let Some(existing) = collections.get(name) {
            if existing.embedding_size != embedding_size {
                return Err(StoreError::DimensionMismatch {
                    expected: existing.embedding_size,
                    got: embedding_size,
                });
            }
            return Ok(false);
        }

        collections.insert(
            name.to_string(),
            Collection {
                embedding_size,
                records: Vec::new(),
                positions: HashMap::new(),
            },
        );
        Ok(true)
    }

    async fn delete_collection(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.collections.write().await.remove(name).is_some())
    }

    async fn collection_info(&self, name: &str) -> Result<Value, StoreError> {
        let collections = self.collections.read().await;
        let collection = collections
            .get(name)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;

        Ok(json!({
            "name": name,
            "embedding_size": collection.embedding_size,
            "points_count": collection.records.len(),
            "distance": "cosine",
        }))
    }

    async fn insert_many(&self, name: &str, records: Vec<IndexRecord>) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;

        if let Some(bad) = records
            .iter()
            .find(|record| record.vector.len() != collection.embedding_size)
        {
            return Err(StoreError::DimensionMismatch {
                expected: collection.embedding_size,
                got: bad.vector.len(),
            });
        }

        for record in records {
            match collection.positions.get(&record.id) {
                Some(&position) => collection.records[position] = record,
                None => {
                    collection.positions.insert(record.id, collection.records.len());
                    collection.records.push(record);
                }
            }
        }

        Ok(())
    }

    async fn search_by_vector(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedDocument>, StoreError> {
        let collections = self.collections.read().await;
        let collection = collections
            .get(name)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;

        if vector.len() != collection.embedding_size {
            return Err(StoreError::DimensionMismatch {
                expected: collection.embedding_size,
                got: vector.len(),
            });
        }

        let mut documents = collection
            .records
            .iter()
            .map(|record| RetrievedDocument {
                score: cosine(vector, &record.vector),
                text: record.text.clone(),
            })
            .collect::<Vec<_>>();

        sort_by_score(&mut documents);
        documents.truncate(limit);
        Ok(documents)
    }
}
