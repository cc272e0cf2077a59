use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported file extension: {0}")]
    UnsupportedFormat(String),

    #[error("no content loaded from file: {0}")]
    EmptyContent(String),

    #[error("failed to load {}: {details}", path.display())]
    Load { path: PathBuf, details: String },

    #[error("failed to split content of {file_id}: {source}")]
    Splitting {
        file_id: String,
        #[source]
        source: Box<IngestError>,
    },

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("embedding backend returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("collection {0} does not exist")]
    CollectionNotFound(String),

    #[error("vector dimension {got} does not match collection size {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("vector store request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("generation backend returned an empty answer")]
    EmptyAnswer,

    #[error("generation unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] figment::Error),

    #[error("invalid setting {key}: {details}")]
    Invalid { key: &'static str, details: String },
}

/// Failures that propagate out of the indexing and query paths.
///
/// Generation failures never appear here; the answer path recovers them.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("embedding failure: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector db error: {0}")]
    VectorDb(#[from] StoreError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
