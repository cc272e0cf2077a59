use crate::chunking::ChunkProcessor;
use crate::error::IngestError;
use crate::loader::load_document;
use crate::models::{Chunk, DocumentFormat};
use std::path::{Component, Path, PathBuf};
use tracing::error;

/// Uploaded files live at `<root>/<project_id>/<file_id>`.
#[derive(Debug, Clone)]
pub struct ProjectFiles {
    root: PathBuf,
}

impl ProjectFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn project_dir(&self, project_id: &str) -> Result<PathBuf, IngestError> {
        Ok(self.root.join(single_component("project id", project_id.trim())?))
    }

    pub fn resolve(&self, project_id: &str, file_id: &str) -> Result<PathBuf, IngestError> {
        Ok(self
            .project_dir(project_id)?
            .join(single_component("file id", file_id)?))
    }
}

fn single_component<'a>(what: &str, value: &'a str) -> Result<&'a str, IngestError> {
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(value),
        _ => Err(IngestError::InvalidArgument(format!(
            "{what} must be a plain file name: {value:?}"
        ))),
    }
}

/// Loads `path` and turns its records into chunks.
pub fn process_file(
    path: &Path,
    file_id: &str,
    processor: &ChunkProcessor,
    chunk_size: Option<usize>,
    overlap_size: usize,
) -> Result<Vec<Chunk>, IngestError> {
    load_document(path)
        .and_then(|(format, records)| {
            processor.process(records, format, file_id, chunk_size, overlap_size)
        })
        .map_err(|err| {
            error!(file_id, error = %err, "failed to process file");
            err
        })
}

/// Q&A chunks of `path` whose `key` metadata equals `value`; all of them when
/// `value` is `None`. Only Q&A JSON files carry these fields.
pub fn filter_qa_pairs(
    path: &Path,
    key: &str,
    value: Option<&str>,
) -> Result<Vec<Chunk>, IngestError> {
    let format = DocumentFormat::from_path(path)?;
    if format != DocumentFormat::QaJson {
        return Err(IngestError::UnsupportedFormat(format!(
            "{key} filtering only supported for .{} files",
            DocumentFormat::QaJson.extension()
        )));
    }

    let (_, chunks) = load_document(path)?;
    Ok(match value {
        Some(expected) => chunks
            .into_iter()
            .filter(|chunk| chunk.metadata.get(key).and_then(|v| v.as_str()) == Some(expected))
            .collect(),
        None => chunks,
    })
}

pub fn qa_pairs_by_language(path: &Path, language: Option<&str>) -> Result<Vec<Chunk>, IngestError> {
    filter_qa_pairs(path, "language", language)
}

pub fn qa_pairs_by_category(path: &Path, category: Option<&str>) -> Result<Vec<Chunk>, IngestError> {
    filter_qa_pairs(path, "category", category)
}
