use chrono::Utc;
use clap::{Parser, Subcommand};
use qa_rag_core::{
    collection_name, IndexOptions, IngestError, PipelineError, RagService, ResponseSignal,
    ServiceContext, Settings,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "qa-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Settings file merged over the built-in defaults.
    #[arg(long, env = "QA_RAG_CONFIG", default_value = qa_rag_core::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Root directory holding one folder of files per project.
    #[arg(long)]
    files_dir: Option<PathBuf>,

    /// Vector database base URL
    #[arg(long)]
    vector_db_url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Load and chunk a project file without indexing it.
    Process {
        #[arg(long)]
        project_id: String,
        #[arg(long)]
        file_id: String,
        #[arg(long)]
        chunk_size: Option<usize>,
        #[arg(long)]
        overlap_size: Option<usize>,
    },
    /// Chunk, embed and insert a project file into the project collection.
    Index {
        #[arg(long)]
        project_id: String,
        #[arg(long)]
        file_id: String,
        #[arg(long)]
        chunk_size: Option<usize>,
        #[arg(long)]
        overlap_size: Option<usize>,
        #[arg(long)]
        batch_size: Option<usize>,
        /// Drop the existing collection first.
        #[arg(long, default_value_t = false)]
        reset: bool,
    },
    /// Print the project collection's metadata.
    Info {
        #[arg(long)]
        project_id: String,
    },
    /// Delete the project collection.
    Reset {
        #[arg(long)]
        project_id: String,
    },
    /// Nearest chunks for a query.
    Search {
        #[arg(long)]
        project_id: String,
        #[arg(long)]
        text: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Answer a query from the retrieved chunks.
    Answer {
        #[arg(long)]
        project_id: String,
        #[arg(long)]
        text: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List Q&A pairs of a JSON dataset, optionally by language or category.
    QaPairs {
        #[arg(long)]
        project_id: String,
        #[arg(long)]
        file_id: String,
        #[arg(long, conflicts_with = "category")]
        language: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
}

fn emit(signal: ResponseSignal, mut body: Value) -> ExitCode {
    if let Value::Object(fields) = &mut body {
        fields.insert("signal".to_string(), json!(signal.as_str()));
    }
    println!("{}", serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string()));

    if signal.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// File problems keep their own signals; everything else reports `fallback`.
fn failure_signal(error: &PipelineError, fallback: ResponseSignal) -> ResponseSignal {
    match error {
        PipelineError::Ingest(error) => ingest_signal(error, fallback),
        _ => fallback,
    }
}

fn ingest_signal(error: &IngestError, fallback: ResponseSignal) -> ResponseSignal {
    match error {
        IngestError::NotFound(_) => ResponseSignal::FileNotFound,
        IngestError::UnsupportedFormat(_) => ResponseSignal::InvalidFileFormat,
        _ => fallback,
    }
}

fn ingest_failure(error: &IngestError, fallback: ResponseSignal) -> ExitCode {
    emit(ingest_signal(error, fallback), json!({ "error": error.to_string() }))
}

fn pipeline_failure(error: &PipelineError, fallback: ResponseSignal) -> ExitCode {
    warn!(%error, "operation failed");
    emit(failure_signal(error, fallback), json!({ "error": error.to_string() }))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::load_from(&cli.config)?;
    if let Some(files_dir) = cli.files_dir {
        settings.files_dir = files_dir;
    }
    if let Some(url) = cli.vector_db_url {
        settings.vector_db.url = url;
    }

    info!(
        app = %settings.app_name,
        version = %settings.app_version,
        started_at = %Utc::now().to_rfc3339(),
        "qa-rag boot"
    );

    let service = RagService::new(ServiceContext::from_settings(settings)?);
    let defaults = service.context().settings.index_options();

    let code = match cli.command {
        Command::Process {
            project_id,
            file_id,
            chunk_size,
            overlap_size,
        } => match service.process(&project_id, &file_id, chunk_size, overlap_size) {
            Ok(processed) => emit(
                ResponseSignal::ProcessingSuccess,
                json!({ "processed": serde_json::to_value(&processed)? }),
            ),
            Err(error) => ingest_failure(&error, ResponseSignal::ProcessingFailed),
        },
        Command::Index {
            project_id,
            file_id,
            chunk_size,
            overlap_size,
            batch_size,
            reset,
        } => {
            let options = IndexOptions {
                chunk_size,
                overlap_size: overlap_size.unwrap_or(defaults.overlap_size),
                batch_size: batch_size.unwrap_or(defaults.batch_size),
                reset,
            };
            match service.index_file(&project_id, &file_id, &options).await {
                Ok(inserted) => emit(
                    ResponseSignal::InsertIntoVectordbSuccess,
                    json!({ "inserted_items_count": inserted }),
                ),
                Err(error) => pipeline_failure(&error, ResponseSignal::InsertIntoVectordbError),
            }
        }
        Command::Info { project_id } => match service.collection_info(&project_id).await {
            Ok(info) => emit(
                ResponseSignal::VectordbCollectionRetrieved,
                json!({ "collection_info": info }),
            ),
            Err(error) => pipeline_failure(&error, ResponseSignal::VectordbCollectionError),
        },
        Command::Reset { project_id } => match service.reset_collection(&project_id).await {
            Ok(deleted) => emit(
                ResponseSignal::VectordbCollectionReset,
                json!({ "collection": collection_name(&project_id), "deleted": deleted }),
            ),
            Err(error) => pipeline_failure(&error, ResponseSignal::VectordbCollectionError),
        },
        Command::Search {
            project_id,
            text,
            limit,
        } => match service.search(&project_id, &text, limit).await {
            Ok(Some(results)) => emit(
                ResponseSignal::VectordbSearchSuccess,
                json!({ "results": serde_json::to_value(&results)? }),
            ),
            Ok(None) => emit(ResponseSignal::VectordbSearchError, json!({})),
            Err(error) => pipeline_failure(&error, ResponseSignal::VectordbSearchError),
        },
        Command::Answer {
            project_id,
            text,
            limit,
        } => match service.answer(&project_id, &text, limit).await {
            Ok(Some(answer)) => emit(
                ResponseSignal::RagAnswerSuccess,
                json!({
                    "answer": answer.answer,
                    "full_prompt": answer.full_prompt,
                    "chat_history": serde_json::to_value(&answer.chat_history)?,
                }),
            ),
            Ok(None) => emit(ResponseSignal::RagAnswerError, json!({})),
            Err(error) => pipeline_failure(&error, ResponseSignal::RagAnswerError),
        },
        Command::QaPairs {
            project_id,
            file_id,
            language,
            category,
        } => {
            let pairs = match (&language, &category) {
                (_, Some(category)) => {
                    service.qa_pairs_by_category(&project_id, &file_id, Some(category.as_str()))
                }
                (language, None) => {
                    service.qa_pairs_by_language(&project_id, &file_id, language.as_deref())
                }
            };
            match pairs {
                Ok(pairs) => emit(
                    ResponseSignal::ProcessingSuccess,
                    json!({ "total": pairs.len(), "pairs": serde_json::to_value(&pairs)? }),
                ),
                Err(error) => ingest_failure(&error, ResponseSignal::ProcessingFailed),
            }
        }
    };

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qa_rag_core::StoreError;
    use std::path::Path;

    #[test]
    fn missing_collection_reports_a_collection_error() {
        let error = PipelineError::VectorDb(StoreError::CollectionNotFound(
            "collection_42".to_string(),
        ));
        let signal = failure_signal(&error, ResponseSignal::VectordbCollectionError);
        assert_eq!(signal, ResponseSignal::VectordbCollectionError);
        assert!(signal.is_failure());
    }

    #[test]
    fn file_errors_keep_their_own_signal() {
        let error = PipelineError::Ingest(IngestError::NotFound(Path::new("42/faq.json").into()));
        assert_eq!(
            failure_signal(&error, ResponseSignal::InsertIntoVectordbError),
            ResponseSignal::FileNotFound
        );
    }

    #[test]
    fn collection_errors_fall_back_to_the_command_signal() {
        let error = PipelineError::VectorDb(StoreError::Request("connection refused".to_string()));
        let signal = failure_signal(&error, ResponseSignal::VectordbCollectionError);
        assert_eq!(signal, ResponseSignal::VectordbCollectionError);
        assert!(!ResponseSignal::VectordbCollectionReset.is_failure());
    }
}
