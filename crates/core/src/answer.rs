use crate::error::{GenerationError, PipelineError};
use crate::generation::Generator;
use crate::models::{ChatMessage, RagAnswer, RetrievedDocument};
use crate::prompt::{PromptAssembler, TemplateParser};
use crate::retriever::Retriever;
use tracing::{debug, warn};

pub struct AnswerGenerator<'a> {
    retriever: Retriever<'a>,
    templates: &'a TemplateParser,
    generator: &'a dyn Generator,
}

impl<'a> AnswerGenerator<'a> {
    pub fn new(
        retriever: Retriever<'a>,
        templates: &'a TemplateParser,
        generator: &'a dyn Generator,
    ) -> Self {
        Self {
            retriever,
            templates,
            generator,
        }
    }

    /// Answers `query_text` from the project's collection.
    ///
    /// Returns `Ok(None)` when retrieval finds nothing; generation is then
    /// never attempted. Generation failures and empty answers are replaced by
    /// the top-ranked document's text.
    pub async fn answer(
        &self,
        project_id: &str,
        query_text: &str,
        limit: usize,
    ) -> Result<Option<RagAnswer>, PipelineError> {
        let Some(documents) = self.retriever.search(project_id, query_text, limit).await? else {
            debug!(project_id, "no documents retrieved; skipping generation");
            return Ok(None);
        };

        let prompt = PromptAssembler::new(self.templates).assemble(&documents);
        let chat_history = vec![ChatMessage::new(
            self.generator.profile().system_role.clone(),
            prompt.system_prompt.clone(),
        )];

        let generated = self
            .generator
            .generate(&prompt.full_prompt, &chat_history)
            .await
            .and_then(|answer| {
                if answer.trim().is_empty() {
                    Err(GenerationError::EmptyAnswer)
                } else {
                    Ok(answer)
                }
            });

        let answer = match generated {
            Ok(answer) => answer,
            Err(error) => {
                warn!(project_id, %error, "generation failed; answering with top document");
                top_document_text(&documents)
            }
        };

        Ok(Some(RagAnswer {
            answer,
            full_prompt: prompt.full_prompt,
            chat_history,
        }))
    }
}

fn top_document_text(documents: &[RetrievedDocument]) -> String {
    documents
        .first()
        .map(|document| document.text.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{Embedder, NgramEmbedder};
    use crate::error::StoreError;
    use crate::generation::{GenerationProfile, ProviderKind};
    use crate::models::EmbeddingRole;
    use crate::store::{IndexRecord, VectorStore};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedStore {
        documents: Vec<RetrievedDocument>,
    }

    #[async_trait]
    impl VectorStore for FixedStore {
        async fn create_collection(&self, _: &str, _: usize, _: bool) -> Result<bool, StoreError> {
            Ok(false)
        }

        async fn delete_collection(&self, _: &str) -> Result<bool, StoreError> {
            Ok(false)
        }

        async fn collection_info(&self, _: &str) -> Result<Value, StoreError> {
            Ok(Value::Null)
        }

        async fn insert_many(&self, _: &str, _: Vec<IndexRecord>) -> Result<(), StoreError> {
            Ok(())
        }

        async fn search_by_vector(
            &self,
            _: &str,
            _: &[f32],
            limit: usize,
        ) -> Result<Vec<RetrievedDocument>, StoreError> {
            Ok(self.documents.iter().take(limit).cloned().collect())
        }
    }

    enum Behaviour {
        Reply(&'static str),
        Fail,
    }

    struct ScriptedGenerator {
        profile: GenerationProfile,
        behaviour: Behaviour,
        calls: AtomicUsize,
        seen_history: Mutex<Vec<ChatMessage>>,
    }

    impl ScriptedGenerator {
        fn new(provider: ProviderKind, behaviour: Behaviour) -> Self {
            Self {
                profile: GenerationProfile::for_provider(provider),
                behaviour,
                calls: AtomicUsize::new(0),
                seen_history: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        fn profile(&self) -> &GenerationProfile {
            &self.profile
        }

        async fn generate(
            &self,
            _prompt: &str,
            chat_history: &[ChatMessage],
        ) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_history.lock().unwrap() = chat_history.to_vec();
            match self.behaviour {
                Behaviour::Reply(text) => Ok(text.to_string()),
                Behaviour::Fail => Err(GenerationError::BackendResponse {
                    backend: "test".to_string(),
                    details: "503".to_string(),
                }),
            }
        }
    }

    fn paris_lyon() -> FixedStore {
        FixedStore {
            documents: vec![
                RetrievedDocument { score: 0.9, text: "Paris".into() },
                RetrievedDocument { score: 0.5, text: "Lyon".into() },
            ],
        }
    }

    #[tokio::test]
    async fn failed_generation_falls_back_to_top_document() -> Result<(), PipelineError> {
        let embedder = NgramEmbedder::new(8);
        let store = paris_lyon();
        let templates = TemplateParser::default();
        let generator = ScriptedGenerator::new(ProviderKind::OpenAi, Behaviour::Fail);

        let answer = AnswerGenerator::new(Retriever::new(&embedder, &store), &templates, &generator)
            .answer("p", "capital of france?", 5)
            .await?
            .expect("documents were retrieved");

        assert_eq!(answer.answer, "Paris");
        assert!(answer.full_prompt.starts_with("Document 1:\nParis\nDocument 2:\nLyon"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn blank_generation_falls_back_too() -> Result<(), PipelineError> {
        let embedder = NgramEmbedder::new(8);
        let store = paris_lyon();
        let templates = TemplateParser::default();
        let generator = ScriptedGenerator::new(ProviderKind::OpenAi, Behaviour::Reply("  "));

        let answer = AnswerGenerator::new(Retriever::new(&embedder, &store), &templates, &generator)
            .answer("p", "capital of france?", 5)
            .await?
            .expect("documents were retrieved");

        assert_eq!(answer.answer, "Paris");
        Ok(())
    }

    #[tokio::test]
    async fn successful_generation_is_returned_with_system_history() -> Result<(), PipelineError> {
        let embedder = NgramEmbedder::new(8);
        let store = paris_lyon();
        let templates = TemplateParser::default();
        let generator = ScriptedGenerator::new(ProviderKind::Cohere, Behaviour::Reply("It is Paris."));

        let answer = AnswerGenerator::new(Retriever::new(&embedder, &store), &templates, &generator)
            .answer("p", "capital of france?", 1)
            .await?
            .expect("documents were retrieved");

        assert_eq!(answer.answer, "It is Paris.");
        assert_eq!(answer.chat_history.len(), 1);
        assert_eq!(answer.chat_history[0].role, "SYSTEM");
        assert_eq!(*generator.seen_history.lock().unwrap(), answer.chat_history);
        assert!(!answer.full_prompt.contains("Lyon"));
        Ok(())
    }

    #[tokio::test]
    async fn no_result_skips_generation() -> Result<(), PipelineError> {
        let embedder = NgramEmbedder::new(8);
        let store = FixedStore { documents: Vec::new() };
        let templates = TemplateParser::default();
        let generator = ScriptedGenerator::new(ProviderKind::OpenAi, Behaviour::Reply("unused"));

        let answer = AnswerGenerator::new(Retriever::new(&embedder, &store), &templates, &generator)
            .answer("p", "anything", 3)
            .await?;

        assert!(answer.is_none());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn retrieval_errors_still_propagate() {
        struct BrokenEmbedder;

        #[async_trait]
        impl Embedder for BrokenEmbedder {
            fn dimensions(&self) -> usize {
                8
            }

            async fn embed(
                &self,
                _text: &str,
                _role: EmbeddingRole,
            ) -> Result<Vec<f32>, crate::error::EmbeddingError> {
                Err(crate::error::EmbeddingError::CountMismatch { expected: 1, got: 0 })
            }
        }

        let store = paris_lyon();
        let templates = TemplateParser::default();
        let generator = ScriptedGenerator::new(ProviderKind::OpenAi, Behaviour::Reply("unused"));

        let result = AnswerGenerator::new(Retriever::new(&BrokenEmbedder, &store), &templates, &generator)
            .answer("p", "anything", 3)
            .await;

        assert!(matches!(result, Err(PipelineError::Embedding(_))));
    }
}
