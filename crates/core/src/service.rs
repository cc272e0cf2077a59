use crate::answer::AnswerGenerator;
use crate::batcher::EmbeddingBatcher;
use crate::chunking::ChunkProcessor;
use crate::collection::collection_name;
use crate::context::ServiceContext;
use crate::error::{IngestError, PipelineError};
use crate::indexer::{positional_ids, VectorIndexer};
use crate::ingest::{process_file, qa_pairs_by_category, qa_pairs_by_language};
use crate::models::{
    Chunk, DocumentFormat, IndexOptions, NumberedChunk, ProcessedFile, RagAnswer,
    RetrievedDocument,
};
use crate::retriever::Retriever;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

/// The caller-facing operations over one [`ServiceContext`].
#[derive(Clone)]
pub struct RagService {
    context: ServiceContext,
}

impl RagService {
    pub fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ServiceContext {
        &self.context
    }

    fn file_path(&self, project_id: &str, file_id: &str) -> Result<PathBuf, IngestError> {
        let path = self.context.files.resolve(project_id, file_id)?;
        if !path.exists() {
            return Err(IngestError::NotFound(path));
        }

        let extension = DocumentFormat::from_path(&path)?.extension();
        if !self.context.settings.is_allowed_extension(extension) {
            return Err(IngestError::UnsupportedFormat(format!(".{extension}")));
        }
        Ok(path)
    }

    fn chunks(
        &self,
        project_id: &str,
        file_id: &str,
        chunk_size: usize,
        overlap_size: usize,
    ) -> Result<Vec<Chunk>, IngestError> {
        let path = self.file_path(project_id, file_id)?;
        let processor = ChunkProcessor::new(self.context.settings.file_default_chunk_size);
        process_file(&path, file_id, &processor, Some(chunk_size), overlap_size)
    }

    /// Loads and chunks a project file without touching the vector store.
    pub fn process(
        &self,
        project_id: &str,
        file_id: &str,
        chunk_size: Option<usize>,
        overlap_size: Option<usize>,
    ) -> Result<ProcessedFile, IngestError> {
        let settings = &self.context.settings;
        let chunk_size = chunk_size.unwrap_or(settings.file_default_chunk_size);
        let overlap_size = overlap_size.unwrap_or(settings.file_default_overlap_size);

        let chunks = self.chunks(project_id, file_id, chunk_size, overlap_size)?;
        let chunks = positional_ids(chunks.len())
            .into_iter()
            .zip(chunks)
            .map(|(chunk_id, chunk)| NumberedChunk {
                chunk_id,
                content: chunk.text,
                metadata: chunk.metadata,
            })
            .collect::<Vec<_>>();

        Ok(ProcessedFile {
            project_id: project_id.trim().to_string(),
            file_id: file_id.to_string(),
            total_chunks: chunks.len(),
            chunk_size,
            overlap_size,
            chunks,
        })
    }

    /// Processes `file_id` and indexes its chunks into the project collection.
    /// Returns the number of inserted points.
    pub async fn index_file(
        &self,
        project_id: &str,
        file_id: &str,
        options: &IndexOptions,
    ) -> Result<usize, PipelineError> {
        let chunk_size = options
            .chunk_size
            .unwrap_or(self.context.settings.file_default_chunk_size);
        let chunks = self.chunks(project_id, file_id, chunk_size, options.overlap_size)?;

        let indexer = VectorIndexer::new(
            self.context.embedder.as_ref(),
            self.context.store.as_ref(),
            EmbeddingBatcher::new(options.batch_size),
        );
        let inserted = indexer
            .index(project_id, &chunks, &positional_ids(chunks.len()), options.reset)
            .await?;

        info!(project_id, file_id, inserted, "file indexed");
        Ok(inserted)
    }

    pub async fn collection_info(&self, project_id: &str) -> Result<Value, PipelineError> {
        let info = self
            .context
            .store
            .collection_info(&collection_name(project_id))
            .await?;
        Ok(info)
    }

    /// Drops the project collection; returns whether one existed.
    pub async fn reset_collection(&self, project_id: &str) -> Result<bool, PipelineError> {
        let collection = collection_name(project_id);
        let deleted = self.context.store.delete_collection(&collection).await?;
        info!(project_id, collection = %collection, deleted, "collection reset");
        Ok(deleted)
    }

    fn retriever(&self) -> Retriever<'_> {
        Retriever::new(self.context.embedder.as_ref(), self.context.store.as_ref())
    }

    fn limit(&self, limit: Option<usize>) -> usize {
        limit.unwrap_or(self.context.settings.search_default_limit)
    }

    pub async fn search(
        &self,
        project_id: &str,
        query_text: &str,
        limit: Option<usize>,
    ) -> Result<Option<Vec<RetrievedDocument>>, PipelineError> {
        self.retriever()
            .search(project_id, query_text, self.limit(limit))
            .await
    }

    pub async fn answer(
        &self,
        project_id: &str,
        query_text: &str,
        limit: Option<usize>,
    ) -> Result<Option<RagAnswer>, PipelineError> {
        AnswerGenerator::new(
            self.retriever(),
            &self.context.templates,
            self.context.generator.as_ref(),
        )
        .answer(project_id, query_text, self.limit(limit))
        .await
    }

    pub fn qa_pairs_by_language(
        &self,
        project_id: &str,
        file_id: &str,
        language: Option<&str>,
    ) -> Result<Vec<Chunk>, IngestError> {
        qa_pairs_by_language(&self.file_path(project_id, file_id)?, language)
    }

    pub fn qa_pairs_by_category(
        &self,
        project_id: &str,
        file_id: &str,
        category: Option<&str>,
    ) -> Result<Vec<Chunk>, IngestError> {
        qa_pairs_by_category(&self.file_path(project_id, file_id)?, category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Settings, VectorDbBackend};
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn service(csv: &str) -> Result<(TempDir, RagService), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let project = dir.path().join("7");
        fs::create_dir_all(&project)?;
        fs::write(project.join("people.csv"), csv)?;
        fs::write(project.join("notes.txt"), "plain text")?;

        let mut settings = Settings::default();
        settings.files_dir = dir.path().to_path_buf();
        settings.vector_db.backend = VectorDbBackend::Memory;
        let context = ServiceContext::from_settings(settings)?;
        Ok((dir, RagService::new(context)))
    }

    #[test]
    fn process_numbers_chunks_from_zero() -> Result<(), Box<dyn std::error::Error>> {
        let (_dir, service) = service("name,city\nAda,London\nAlan,Wilmslow\n")?;

        let processed = service.process("7", "people.csv", None, None)?;

        assert_eq!(processed.total_chunks, 2);
        assert_eq!(processed.chunk_size, 100);
        assert_eq!(processed.overlap_size, 20);
        let ids = processed.chunks.iter().map(|chunk| chunk.chunk_id).collect::<Vec<_>>();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(processed.chunks[0].content, "name: Ada\ncity: London");
        Ok(())
    }

    #[test]
    fn missing_and_unsupported_files_are_distinguished() -> Result<(), Box<dyn std::error::Error>> {
        let (_dir, service) = service("a\n1\n")?;

        assert!(matches!(
            service.process("7", "absent.csv", None, None),
            Err(IngestError::NotFound(_))
        ));
        assert!(matches!(
            service.process("7", "notes.txt", None, None),
            Err(IngestError::UnsupportedFormat(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn index_then_reset_collection() -> Result<(), Box<dyn std::error::Error>> {
        let (_dir, service) = service("name,city\nAda,London\nAlan,Wilmslow\n")?;

        let inserted = service
            .index_file("7", "people.csv", &service.context().settings.index_options())
            .await?;
        assert_eq!(inserted, 2);
        assert_eq!(service.collection_info(" 7 ").await?["points_count"], 2);

        assert!(service.reset_collection("7").await?);
        assert!(service.collection_info("7").await.is_err());
        Ok(())
    }
}
