use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction failed for {path}: {reason}")]
    Extraction { path: String, reason: String },

    #[error("Document contains no text: {0}")]
    EmptyDocument(String),

    #[error("Embedding service unavailable: {0}")]
    EmbeddingServiceUnavailable(String),

    #[error("Embedding request failed: {0}")]
    EmbeddingRequest(String),

    #[error("Generation service unavailable: {0}")]
    GenerationServiceUnavailable(String),

    #[error("Vector store not found: {0}")]
    StoreNotFound(String),

    #[error("No vector store available; build one first")]
    NoStoreAvailable,

    #[error(
        "Store {store_id} committed with {document_count} documents; {} failed: {}",
        failed.len(),
        failed.join(", ")
    )]
    PartialBuild {
        store_id: String,
        document_count: i64,
        failed: Vec<String>,
    },

    #[error("Operation cancelled during {stage} stage")]
    Cancelled { stage: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// True when the failure means an external model service could not be
    /// reached. Callers use this to prompt "start the service and retry"
    /// rather than treating the error as a bug.
    #[inline]
    pub fn is_service_unavailable(&self) -> bool {
        matches!(
            *self,
            RagError::EmbeddingServiceUnavailable(_) | RagError::GenerationServiceUnavailable(_)
        )
    }

    /// True for per-document failures that batch operations skip and log
    /// instead of aborting on.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            *self,
            RagError::UnsupportedFormat(_)
                | RagError::Extraction { .. }
                | RagError::EmptyDocument(_)
        )
    }
}

impl From<config::ConfigError> for RagError {
    #[inline]
    fn from(e: config::ConfigError) -> Self {
        RagError::Config(e.to_string())
    }
}

pub mod chunker;
pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod generation;
pub mod loader;
pub mod pipeline;
pub mod ranker;
pub mod retriever;
pub mod synthesizer;
