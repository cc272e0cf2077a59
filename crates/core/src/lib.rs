pub mod answer;
pub mod batcher;
pub mod chunking;
pub mod collection;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod indexer;
pub mod ingest;
pub mod loader;
pub mod models;
pub mod prompt;
pub mod providers;
pub mod retriever;
pub mod service;
pub mod store;
pub mod stores;

pub use answer::AnswerGenerator;
pub use batcher::{EmbeddingBatcher, DEFAULT_BATCH_SIZE};
pub use chunking::{ChunkProcessor, ChunkingConfig, RecursiveSplitter, DEFAULT_SEPARATORS};
pub use collection::{collection_name, COLLECTION_PREFIX};
pub use config::{
    EmbeddingBackend, EmbeddingSettings, GenerationSettings, Settings, VectorDbBackend,
    VectorDbSettings,
};
pub use context::ServiceContext;
pub use embeddings::{BulkEmbedder, Embedder, NgramEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{
    ConfigError, EmbeddingError, GenerationError, IngestError, PipelineError, StoreError,
};
pub use generation::{DisabledGenerator, GenerationProfile, Generator, ProviderKind};
pub use indexer::{positional_ids, VectorIndexer};
pub use ingest::{process_file, qa_pairs_by_category, qa_pairs_by_language, ProjectFiles};
pub use loader::{load_document, CsvLoader, DocumentLoader, QaJsonLoader};
pub use models::{
    ChatMessage, Chunk, DocumentFormat, EmbeddingRole, IndexOptions, Metadata, NumberedChunk,
    ProcessedFile, PromptContext, RagAnswer, ResponseSignal, RetrievedDocument,
};
pub use prompt::{PromptAssembler, TemplateParser};
pub use providers::{CohereEmbedder, CohereGenerator, OllamaEmbedder, OpenAiEmbedder, OpenAiGenerator};
pub use retriever::Retriever;
pub use service::RagService;
pub use store::{IndexRecord, VectorStore};
pub use stores::{InMemoryStore, QdrantStore};
