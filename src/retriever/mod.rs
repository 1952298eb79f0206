#[cfg(test)]
mod tests;

use crate::config::SearchConfig;
use crate::database::lancedb::vector_store::{SearchHit, VectorStore};
use crate::database::sqlite::Database;
use crate::database::sqlite::models::StoreRecord;
use crate::{RagError, Result};
use tracing::debug;

/// Fetches nearest-neighbor chunks for an embedded query.
///
/// Store resolution happens here: an explicit store id must exist in the
/// registry, and an implicit request falls back to the most recently
/// committed store.
pub struct Retriever<'a> {
    database: &'a Database,
    vectors: &'a VectorStore,
    search: &'a SearchConfig,
}

impl<'a> Retriever<'a> {
    #[inline]
    pub fn new(database: &'a Database, vectors: &'a VectorStore, search: &'a SearchConfig) -> Self {
        Self {
            database,
            vectors,
            search,
        }
    }

    /// Resolve which store a query should run against.
    #[inline]
    pub async fn resolve_store(&self, requested: Option<&str>) -> Result<StoreRecord> {
        match requested {
            Some(id) => self
                .database
                .get_store(id)
                .await
                .map_err(RagError::Other)?
                .ok_or_else(|| RagError::StoreNotFound(id.to_string())),
            None => self
                .database
                .latest_store()
                .await
                .map_err(RagError::Other)?
                .ok_or(RagError::NoStoreAvailable),
        }
    }

    /// Nearest neighbors of `query_vector` in the given store, capped at
    /// `top_k` and filtered by the similarity floor. Hits come back in
    /// descending similarity order.
    #[inline]
    pub async fn retrieve(&self, store_id: &str, query_vector: &[f32]) -> Result<Vec<SearchHit>> {
        let hits = self
            .vectors
            .search(store_id, query_vector, self.search.top_k)
            .await?;

        let before = hits.len();
        let hits: Vec<SearchHit> = hits
            .into_iter()
            .filter(|hit| hit.similarity_score >= self.search.similarity_floor)
            .collect();
        debug!(
            "Retrieved {} hits from store {} ({} below similarity floor)",
            hits.len(),
            store_id,
            before - hits.len()
        );

        Ok(hits)
    }
}
