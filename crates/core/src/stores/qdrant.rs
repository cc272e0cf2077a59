use crate::error::StoreError;
use crate::models::RetrievedDocument;
use crate::store::{sort_by_score, IndexRecord, VectorStore};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, info};
use url::Url;

const BACKEND: &str = "qdrant";
const UPSERT_BATCH_SIZE: usize = 50;

#[derive(Clone)]
pub struct QdrantStore {
    endpoint: Url,
    client: Client,
    api_key: Option<String>,
    distance: String,
}

impl fmt::Debug for QdrantStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QdrantStore")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("distance", &self.distance)
            .finish()
    }
}

impl QdrantStore {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self, StoreError> {
        let mut endpoint = Url::parse(endpoint)?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        Ok(Self {
            endpoint,
            client: Client::new(),
            api_key,
            distance: "Cosine".to_string(),
        })
    }

    pub fn with_distance(mut self, distance: impl Into<String>) -> Self {
        self.distance = distance.into();
        self
    }

    /// `collections/<name>/<tail..>` under the endpoint. Each part is pushed
    /// as one percent-encoded segment, so `/`, `..`, `?` and `#` inside a
    /// collection name never leave that segment.
    fn collection_url(&self, name: &str, tail: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Request(format!("{} cannot carry a path", self.endpoint)))?
            .pop_if_empty()
            .push("collections")
            .push(name)
            .extend(tail);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, Value), StoreError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        let parsed = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body)?
        };
        Ok((status, parsed))
    }

    fn backend_error(status: StatusCode, body: &Value) -> StoreError {
        let details = body
            .pointer("/status/error")
            .and_then(Value::as_str)
            .map(|message| format!("{status}: {message}"))
            .unwrap_or_else(|| status.to_string());

        StoreError::BackendResponse {
            backend: BACKEND.to_string(),
            details,
        }
    }

    /// Current vector size of `name`, or `None` when it does not exist.
    async fn existing_size(&self, name: &str) -> Result<Option<usize>, StoreError> {
        let (status, body) = self
            .send(self.request(Method::GET, self.collection_url(name, &[])?))
            .await?;

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::backend_error(status, &body));
        }

        let size = body
            .pointer("/result/config/params/vectors/size")
            .and_then(Value::as_u64)
            .map(|size| size as usize)
            .ok_or_else(|| StoreError::BackendResponse {
                backend: BACKEND.to_string(),
                details: format!("collection {name} reports no vector size"),
            })?;
        Ok(Some(size))
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn create_collection(
        &self,
        name: &str,
        embedding_size: usize,
        reset: bool,
    ) -> Result<bool, StoreError> {
        if reset {
            self.delete_collection(name).await?;
        }

        if let Some(existing) = self.existing_size(name).await? {
            if existing != embedding_size {
                return Err(StoreError::DimensionMismatch {
                    expected: existing,
                    got: embedding_size,
                });
            }
            return Ok(false);
        }

        let (status, body) = self
            .send(
                self.request(Method::PUT, self.collection_url(name, &[])?)
                    .json(&json!({
                        "vectors": { "size": embedding_size, "distance": self.distance },
                    })),
            )
            .await?;

        if !status.is_success() {
            return Err(Self::backend_error(status, &body));
        }

        info!(collection = name, embedding_size, "created qdrant collection");
        Ok(true)
    }

    async fn delete_collection(&self, name: &str) -> Result<bool, StoreError> {
        let (status, body) = self
            .send(self.request(Method::DELETE, self.collection_url(name, &[])?))
            .await?;

        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(Self::backend_error(status, &body));
        }

        let dropped = body.pointer("/result").and_then(Value::as_bool).unwrap_or(true);
        if dropped {
            info!(collection = name, "dropped qdrant collection");
        }
        Ok(dropped)
    }

    async fn collection_info(&self, name: &str) -> Result<Value, StoreError> {
        let (status, body) = self
            .send(self.request(Method::GET, self.collection_url(name, &[])?))
            .await?;

        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::CollectionNotFound(name.to_string()));
        }
        if !status.is_success() {
            return Err(Self::backend_error(status, &body));
        }

        Ok(body.pointer("/result").cloned().unwrap_or(Value::Null))
    }

    async fn insert_many(&self, name: &str, records: Vec<IndexRecord>) -> Result<(), StoreError> {
        let mut upsert_url = self.collection_url(name, &["points"])?;
        upsert_url.set_query(Some("wait=true"));

        for (batch, window) in records.chunks(UPSERT_BATCH_SIZE).enumerate() {
            let points = window
                .iter()
                .map(|record| {
                    json!({
                        "id": record.id,
                        "vector": record.vector,
                        "payload": {
                            "text": record.text,
                            "metadata": record.metadata,
                        },
                    })
                })
                .collect::<Vec<_>>();

            let (status, body) = self
                .send(
                    self.request(Method::PUT, upsert_url.clone())
                        .json(&json!({ "points": points })),
                )
                .await?;

            if status == StatusCode::NOT_FOUND {
                return Err(StoreError::CollectionNotFound(name.to_string()));
            }
            if !status.is_success() {
                return Err(Self::backend_error(status, &body));
            }

            debug!(collection = name, batch, points = window.len(), "upserted points");
        }

        Ok(())
    }

    async fn search_by_vector(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedDocument>, StoreError> {
        let (status, body) = self
            .send(
                self.request(Method::POST, self.collection_url(name, &["points", "search"])?)
                    .json(&json!({
                        "vector": vector,
                        "limit": limit,
                        "with_payload": true,
                    })),
            )
            .await?;

        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::CollectionNotFound(name.to_string()));
        }
        if !status.is_success() {
            return Err(Self::backend_error(status, &body));
        }

        let hits = body
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut documents = hits
            .iter()
            .map(|hit| RetrievedDocument {
                score: hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0),
                text: hit
                    .pointer("/payload/text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect::<Vec<_>>();

        sort_by_score(&mut documents);
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::collection_name;

    #[test]
    fn collection_urls_nest_under_base_path() {
        let store = QdrantStore::new("http://localhost:6333/qdrant", None).unwrap();
        let url = store.collection_url("collection_1", &["points", "search"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:6333/qdrant/collections/collection_1/points/search"
        );
    }

    #[test]
    fn collection_names_stay_in_one_path_segment() {
        let store = QdrantStore::new("http://localhost:6333", None).unwrap();

        let traversal = store
            .collection_url(&collection_name("a/../collection_victim"), &[])
            .unwrap();
        assert_eq!(
            traversal.as_str(),
            "http://localhost:6333/collections/collection_a%2F..%2Fcollection_victim"
        );

        let fragment = store.collection_url(&collection_name("p#frag"), &[]).unwrap();
        assert_eq!(fragment.path(), "/collections/collection_p%23frag");
        assert_eq!(fragment.fragment(), None);

        let query = store.collection_url(&collection_name("p?wait=false"), &[]).unwrap();
        assert_eq!(query.query(), None);
        assert_eq!(query.path_segments().map(|segments| segments.count()), Some(2));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let store = QdrantStore::new("http://localhost:6333", Some("secret".into())).unwrap();
        let rendered = format!("{store:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn backend_errors_include_qdrant_message() {
        let body = json!({ "status": { "error": "wrong vector size" } });
        let error = QdrantStore::backend_error(StatusCode::BAD_REQUEST, &body);
        assert!(error.to_string().contains("wrong vector size"));
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        assert!(matches!(QdrantStore::new("not a url", None), Err(StoreError::Url(_))));
    }
}
