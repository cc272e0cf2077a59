use crate::error::IngestError;
use crate::models::{Chunk, DocumentFormat, Metadata};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, error};

const UNKNOWN: &str = "unknown";

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Vec<Chunk>, IngestError>;
}

#[derive(Debug, Deserialize)]
struct QaDataset {
    #[serde(default)]
    data: Vec<QaEntry>,
    #[serde(default)]
    dataset_info: DatasetInfo,
}

#[derive(Debug, Deserialize)]
struct QaEntry {
    #[serde(default)]
    question: String,
    #[serde(default)]
    answer: String,
    #[serde(default)]
    language: Option<Value>,
    #[serde(default)]
    category: Option<Value>,
    #[serde(default)]
    keywords: Option<Value>,
    #[serde(default)]
    source: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct DatasetInfo {
    #[serde(default)]
    total_samples: Option<Value>,
    #[serde(default)]
    languages: Option<Value>,
}

/// One chunk per question/answer pair.
#[derive(Debug, Default, Clone, Copy)]
pub struct QaJsonLoader;

impl DocumentLoader for QaJsonLoader {
    fn load(&self, path: &Path) -> Result<Vec<Chunk>, IngestError> {
        let dataset = fs::read_to_string(path)
            .map_err(|error| error.to_string())
            .and_then(|raw| {
                serde_json::from_str::<QaDataset>(&raw).map_err(|error| error.to_string())
            })
            .map_err(|details| {
                error!(file_path = %path.display(), %details, "failed to load q&a json file");
                IngestError::Load {
                    path: path.to_path_buf(),
                    details,
                }
            })?;

        let file_path = path.to_string_lossy().to_string();
        let total_samples = dataset.dataset_info.total_samples.unwrap_or_else(|| json!(0));
        let languages = dataset.dataset_info.languages.unwrap_or_else(|| json!([]));

        let chunks = dataset
            .data
            .into_iter()
            .map(|entry| {
                let mut metadata = Metadata::new();
                metadata.insert("language".into(), entry.language.unwrap_or_else(|| json!(UNKNOWN)));
                metadata.insert("category".into(), entry.category.unwrap_or_else(|| json!(UNKNOWN)));
                metadata.insert("keywords".into(), entry.keywords.unwrap_or_else(|| json!([])));
                metadata.insert("source".into(), entry.source.unwrap_or_else(|| json!(UNKNOWN)));
                metadata.insert("file_path".into(), json!(file_path));
                metadata.insert("dataset_total_samples".into(), total_samples.clone());
                metadata.insert("dataset_languages".into(), languages.clone());

                Chunk::new(
                    format!("Question: {}\nAnswer: {}", entry.question, entry.answer),
                    metadata,
                )
            })
            .collect::<Vec<_>>();

        debug!(file_path = %path.display(), records = chunks.len(), "loaded q&a pairs");
        Ok(chunks)
    }
}

/// One raw record per row, rendered as `header: value` lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvLoader;

impl DocumentLoader for CsvLoader {
    fn load(&self, path: &Path) -> Result<Vec<Chunk>, IngestError> {
        let load_error = |details: String| {
            error!(file_path = %path.display(), %details, "failed to load csv file");
            IngestError::Load {
                path: path.to_path_buf(),
                details,
            }
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|error| load_error(error.to_string()))?;
        let headers = reader
            .headers()
            .map_err(|error| load_error(error.to_string()))?
            .clone();

        let source = path.to_string_lossy().to_string();
        let mut records = Vec::new();

        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|error| load_error(error.to_string()))?;
            let text = headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| format!("{}: {}", header.trim(), value.trim()))
                .collect::<Vec<_>>()
                .join("\n");

            let mut metadata = Metadata::new();
            metadata.insert("source".into(), json!(source));
            metadata.insert("row".into(), json!(row));
            records.push(Chunk::new(text, metadata));
        }

        debug!(file_path = %path.display(), records = records.len(), "loaded csv rows");
        Ok(records)
    }
}

/// Loads `path` with the strategy its extension selects.
pub fn load_document(path: &Path) -> Result<(DocumentFormat, Vec<Chunk>), IngestError> {
    if !path.exists() {
        return Err(IngestError::NotFound(path.to_path_buf()));
    }

    let format = DocumentFormat::from_path(path)?;

    let records = match format {
        DocumentFormat::QaJson => QaJsonLoader.load(path)?,
        DocumentFormat::Csv => CsvLoader.load(path)?,
    };

    if records.is_empty() {
        return Err(IngestError::EmptyContent(path.display().to_string()));
    }

    Ok((format, records))
}
