#[cfg(test)]
mod tests;

use crate::chunker::{Chunk, chunk_document};
use crate::config::Config;
use crate::database::lancedb::vector_store::VectorStore;
use crate::database::lancedb::{ChunkMetadata, EmbeddingRecord};
use crate::database::sqlite::Database;
use crate::database::sqlite::models::{
    NewSearchHistory, NewStoreRecord, SearchHistoryRecord, StoreRecord,
};
use crate::embeddings::EmbeddingClient;
use crate::generation::GenerationClient;
use crate::loader::{Document, load_path};
use crate::ranker::{RankedChunk, rank_hits};
use crate::retriever::Retriever;
use crate::synthesizer::Synthesizer;
use crate::{RagError, Result};
use chrono::Utc;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shared cancellation flag, checked before every stage transition.
///
/// Cancelling mid-build rolls the store back; cancelling mid-query simply
/// abandons the query before the next stage runs.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Stages of an index build, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Loading,
    Chunking,
    Embedding,
    Committing,
}

impl BuildStage {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Chunking => "chunking",
            Self::Embedding => "embedding",
            Self::Committing => "committing",
        }
    }
}

/// Stages of a query, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Embedding,
    Retrieving,
    Ranking,
    Synthesizing,
    Recording,
}

impl QueryStage {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Embedding => "embedding",
            Self::Retrieving => "retrieving",
            Self::Ranking => "ranking",
            Self::Synthesizing => "synthesizing",
            Self::Recording => "recording",
        }
    }
}

/// Summary of a completed index build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub store_id: String,
    pub document_count: usize,
    pub chunk_count: usize,
    /// Source paths that were skipped, with reasons
    pub skipped: Vec<String>,
}

/// Everything a completed query produced.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub query: String,
    pub store_id: String,
    pub ranked: Vec<RankedChunk>,
    pub answer: String,
    pub report_path: PathBuf,
    pub chart_path: PathBuf,
}

/// Orchestrates the index and query flows end to end.
///
/// Stages run strictly in sequence with no automatic retry. A store only
/// becomes visible to search once its registry row is committed, after all
/// of its embeddings are persisted, so a concurrent search can never
/// observe a half-built store.
pub struct Pipeline {
    config: Config,
    database: Database,
    vectors: VectorStore,
    embeddings: EmbeddingClient,
    generation: GenerationClient,
    cancel: CancellationToken,
}

impl Pipeline {
    #[inline]
    pub async fn new(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.base_dir)?;
        let database = Database::new(config.database_path()).await?;
        let vectors = VectorStore::open(config.vector_database_path()).await?;
        let embeddings = EmbeddingClient::new(&config.ollama)?;
        let generation = GenerationClient::new(&config.ollama)?;

        Ok(Self {
            config,
            database,
            vectors,
            embeddings,
            generation,
            cancel: CancellationToken::new(),
        })
    }

    #[inline]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn check_cancelled(&self, stage: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(RagError::Cancelled {
                stage: stage.to_string(),
            });
        }
        Ok(())
    }

    /// Build a new store from the documents under `path`.
    ///
    /// Documents that fail to load or chunk are skipped and reported; if any
    /// were skipped but at least one was indexed, the partial store is
    /// committed and `PartialBuild` is returned so the caller sees both the
    /// store and the failures. A build where nothing could be indexed rolls
    /// back entirely.
    #[inline]
    pub async fn build_store(&self, path: &Path, name: &str) -> Result<BuildReport> {
        self.check_cancelled(BuildStage::Loading.as_str())?;
        info!("Loading documents from {:?}", path);
        let outcome = load_path(path)?;
        let mut failed: Vec<String> = outcome
            .skipped
            .iter()
            .map(|s| format!("{}: {}", s.source_path, s.reason))
            .collect();

        self.check_cancelled(BuildStage::Chunking.as_str())?;
        let mut chunked: Vec<(Document, Vec<Chunk>)> = Vec::new();
        for document in outcome.documents {
            match chunk_document(&document, &self.config.chunking) {
                Ok(chunks) => chunked.push((document, chunks)),
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping {}: {}", document.source_path, e);
                    failed.push(format!("{}: {e}", document.source_path));
                }
                Err(e) => return Err(e),
            }
        }

        if chunked.is_empty() {
            return Err(RagError::Other(anyhow::anyhow!(
                "no documents could be indexed from {} ({} skipped)",
                path.display(),
                failed.len()
            )));
        }

        let store_id = self.allocate_store_id().await?;
        self.check_cancelled(BuildStage::Embedding.as_str())?;

        match self.embed_and_persist(&store_id, &chunked).await {
            Ok(chunk_count) => {
                if let Err(e) = self.check_cancelled(BuildStage::Committing.as_str()) {
                    self.rollback_store(&store_id).await;
                    return Err(e);
                }

                let document_count = chunked.len();
                if let Err(e) = self
                    .database
                    .insert_store(&NewStoreRecord {
                        id: store_id.clone(),
                        name: name.to_string(),
                        document_count: i64::try_from(document_count).unwrap_or(i64::MAX),
                    })
                    .await
                {
                    self.rollback_store(&store_id).await;
                    return Err(e.into());
                }
                info!(
                    "Committed store {} ({} documents, {} chunks)",
                    store_id, document_count, chunk_count
                );

                if failed.is_empty() {
                    Ok(BuildReport {
                        store_id,
                        document_count,
                        chunk_count,
                        skipped: failed,
                    })
                } else {
                    Err(RagError::PartialBuild {
                        store_id,
                        document_count: i64::try_from(document_count).unwrap_or(i64::MAX),
                        failed,
                    })
                }
            }
            Err(e) => {
                self.rollback_store(&store_id).await;
                Err(e)
            }
        }
    }

    /// Embed every chunk and persist the vectors, creating the store's table
    /// from the dimension of the first embedding. Returns the chunk count.
    async fn embed_and_persist(
        &self,
        store_id: &str,
        chunked: &[(Document, Vec<Chunk>)],
    ) -> Result<usize> {
        let model_id = self.embeddings.model_id().to_string();
        let created_at = Utc::now().to_rfc3339();
        let mut table_created = false;
        let mut chunk_count = 0;

        for (document, chunks) in chunked {
            self.check_cancelled(BuildStage::Embedding.as_str())?;

            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embeddings.embed_batch(&texts)?;

            if !table_created {
                let dimension = vectors.first().map_or(0, Vec::len);
                self.vectors.create_store(store_id, dimension).await?;
                table_created = true;
            }

            let records: Vec<EmbeddingRecord> = chunks
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| EmbeddingRecord {
                    id: Uuid::new_v4().to_string(),
                    vector,
                    model_id: model_id.clone(),
                    metadata: ChunkMetadata {
                        chunk_id: format!("{}:{}", chunk.document_id, chunk.sequence_index),
                        document_id: chunk.document_id.clone(),
                        source_path: document.source_path.clone(),
                        content: chunk.text.clone(),
                        sequence_index: u32::try_from(chunk.sequence_index).unwrap_or(u32::MAX),
                        start_offset: u32::try_from(chunk.start_offset).unwrap_or(u32::MAX),
                        end_offset: u32::try_from(chunk.end_offset).unwrap_or(u32::MAX),
                        created_at: created_at.clone(),
                    },
                })
                .collect();

            chunk_count += records.len();
            self.vectors.store_embeddings_batch(store_id, &records).await?;
            debug!(
                "Persisted {} chunks for {}",
                chunks.len(),
                document.source_path
            );
        }

        Ok(chunk_count)
    }

    /// Pick an id no existing store holds. Ids are second-resolution
    /// timestamps; when two builds land in the same second, a numeric suffix
    /// keeps the id unique.
    async fn allocate_store_id(&self) -> Result<String> {
        let base = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let mut candidate = base.clone();
        let mut attempt = 1u32;
        loop {
            let in_registry = self.database.get_store(&candidate).await?.is_some();
            if !in_registry && !self.vectors.store_exists(&candidate).await? {
                return Ok(candidate);
            }
            attempt += 1;
            candidate = format!("{base}_{attempt}");
        }
    }

    /// Drop the failing build's own table. Store ids are allocated unused,
    /// so this can never touch a committed store.
    async fn rollback_store(&self, store_id: &str) {
        info!("Rolling back store {}", store_id);
        if let Err(e) = self.vectors.delete_store(store_id).await {
            warn!("Rollback of store {} failed: {}", store_id, e);
        }
    }

    /// Run a query end to end against an explicit store or the most recent
    /// one. The history row is appended only after everything else completed.
    #[inline]
    pub async fn query(&self, query_text: &str, store_id: Option<&str>) -> Result<QueryOutcome> {
        self.check_cancelled(QueryStage::Embedding.as_str())?;
        let query_vector = self.embeddings.embed(query_text)?;

        self.check_cancelled(QueryStage::Retrieving.as_str())?;
        let retriever = Retriever::new(&self.database, &self.vectors, &self.config.search);
        let store = retriever.resolve_store(store_id).await?;
        let hits = retriever.retrieve(&store.id, &query_vector).await?;

        self.check_cancelled(QueryStage::Ranking.as_str())?;
        let ranked = rank_hits(query_text, hits, &self.config.search);

        self.check_cancelled(QueryStage::Synthesizing.as_str())?;
        let synthesizer = Synthesizer::new(
            &self.generation,
            self.config.artifacts_dir_path(),
            self.config.search.context_budget_bytes,
        );
        let synthesis = synthesizer.synthesize(query_text, &ranked)?;

        self.check_cancelled(QueryStage::Recording.as_str())?;
        let summary: Vec<serde_json::Value> = ranked
            .iter()
            .map(|chunk| {
                json!({
                    "rank": chunk.rank,
                    "source_path": chunk.source_path,
                    "score": chunk.score,
                    "preview": chunk.preview(),
                })
            })
            .collect();
        self.database
            .append_search_history(&NewSearchHistory {
                query: query_text.to_string(),
                store_id: store.id.clone(),
                result_summary: serde_json::to_string(&summary)
                    .map_err(|e| RagError::Database(e.to_string()))?,
                ai_answer: synthesis.answer.clone(),
                report_path: Some(synthesis.report_path.display().to_string()),
                chart_path: Some(synthesis.chart_path.display().to_string()),
            })
            .await?;

        Ok(QueryOutcome {
            query: query_text.to_string(),
            store_id: store.id,
            ranked,
            answer: synthesis.answer,
            report_path: synthesis.report_path,
            chart_path: synthesis.chart_path,
        })
    }

    /// All stores in the registry, newest first.
    #[inline]
    pub async fn list_stores(&self) -> Result<Vec<StoreRecord>> {
        Ok(self.database.list_stores().await?)
    }

    /// Remove a store's registry row and vector table. Deleting an unknown
    /// id is a no-op; returns whether anything was removed.
    #[inline]
    pub async fn delete_store(&self, store_id: &str) -> Result<bool> {
        // Registry row first so a concurrent implicit query cannot resolve
        // to a store whose table is already gone.
        let had_row = self.database.delete_store(store_id).await?;
        let had_table = self.vectors.delete_store(store_id).await?;
        Ok(had_row || had_table)
    }

    /// Recent completed queries, newest first.
    #[inline]
    pub async fn search_history(&self, limit: i64) -> Result<Vec<SearchHistoryRecord>> {
        Ok(self.database.recent_search_history(limit).await?)
    }

    /// Probe both Ollama endpoints.
    #[inline]
    pub fn check_services(&self) -> Result<()> {
        self.embeddings.ping()?;
        self.generation.ping()?;
        Ok(())
    }
}
