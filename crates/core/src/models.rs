use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Insertion-ordered chunk metadata.
pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    /// `{data: [...], dataset_info: {...}}` question/answer datasets.
    QaJson,
    Csv,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "json" => Ok(Self::QaJson),
            "csv" => Ok(Self::Csv),
            _ => Err(IngestError::UnsupportedFormat(format!(".{extension}"))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::QaJson => "json",
            Self::Csv => "csv",
        }
    }

    /// Whether loaded records are already retrieval units.
    pub fn is_pre_chunked(self) -> bool {
        matches!(self, Self::QaJson)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingRole {
    Document,
    Query,
}

impl EmbeddingRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Query => "query",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedDocument {
    pub score: f64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptContext {
    pub system_prompt: String,
    pub document_sections: Vec<String>,
    pub footer: String,
    pub full_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RagAnswer {
    pub answer: String,
    pub full_prompt: String,
    pub chat_history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexOptions {
    /// Falls back to the configured default when unset.
    pub chunk_size: Option<usize>,
    pub overlap_size: usize,
    pub batch_size: usize,
    pub reset: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            chunk_size: None,
            overlap_size: 20,
            batch_size: 64,
            reset: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NumberedChunk {
    pub chunk_id: u64,
    pub content: String,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedFile {
    pub project_id: String,
    pub file_id: String,
    pub total_chunks: usize,
    pub chunk_size: usize,
    pub overlap_size: usize,
    pub chunks: Vec<NumberedChunk>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSignal {
    ProcessingSuccess,
    ProcessingFailed,
    FileNotFound,
    InvalidFileFormat,
    InsertIntoVectordbSuccess,
    InsertIntoVectordbError,
    VectordbCollectionRetrieved,
    VectordbCollectionReset,
    VectordbCollectionError,
    VectordbSearchSuccess,
    VectordbSearchError,
    RagAnswerSuccess,
    RagAnswerError,
}

impl ResponseSignal {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProcessingSuccess => "processing_success",
            Self::ProcessingFailed => "processing_failed",
            Self::FileNotFound => "file_not_found",
            Self::InvalidFileFormat => "invalid_file_format",
            Self::InsertIntoVectordbSuccess => "insert_into_vectordb_success",
            Self::InsertIntoVectordbError => "insert_into_vectordb_error",
            Self::VectordbCollectionRetrieved => "vectordb_collection_retrieved",
            Self::VectordbCollectionReset => "vectordb_collection_reset",
            Self::VectordbCollectionError => "vectordb_collection_error",
            Self::VectordbSearchSuccess => "vectordb_search_success",
            Self::VectordbSearchError => "vectordb_search_error",
            Self::RagAnswerSuccess => "rag_answer_success",
            Self::RagAnswerError => "rag_answer_error",
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::ProcessingFailed
                | Self::FileNotFound
                | Self::InvalidFileFormat
                | Self::InsertIntoVectordbError
                | Self::VectordbCollectionError
                | Self::VectordbSearchError
                | Self::RagAnswerError
        )
    }
}
