#[cfg(test)]
mod tests;

use crate::config::SearchConfig;
use crate::database::lancedb::vector_store::SearchHit;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A retrieved chunk with its final rank assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedChunk {
    /// 1-based position in the final ordering
    pub rank: usize,
    pub chunk_id: String,
    pub document_id: String,
    pub source_path: String,
    pub content: String,
    pub sequence_index: u32,
    /// Cosine similarity as reported by the vector search
    pub similarity_score: f32,
    /// Similarity plus any lexical boost; this is what the ordering uses
    pub score: f32,
}

impl RankedChunk {
    /// At most the first 200 characters of the chunk, for display and for
    /// the history snapshot.
    #[inline]
    pub fn preview(&self) -> String {
        self.content.chars().take(200).collect()
    }
}

/// Order retrieval hits into their final ranking.
///
/// Sorting is fully deterministic: descending score, then ascending
/// `sequence_index`, then document id. Running the ranker twice over the
/// same hits always yields the same ordering.
#[inline]
pub fn rank_hits(query: &str, hits: Vec<SearchHit>, search: &SearchConfig) -> Vec<RankedChunk> {
    let mut ranked: Vec<RankedChunk> = hits
        .into_iter()
        .map(|hit| {
            let boost = if search.lexical_boost > 0.0 {
                search.lexical_boost * term_overlap(query, &hit.chunk_metadata.content)
            } else {
                0.0
            };
            RankedChunk {
                rank: 0,
                chunk_id: hit.chunk_metadata.chunk_id,
                document_id: hit.chunk_metadata.document_id,
                source_path: hit.chunk_metadata.source_path,
                content: hit.chunk_metadata.content,
                sequence_index: hit.chunk_metadata.sequence_index,
                similarity_score: hit.similarity_score,
                score: hit.similarity_score + boost,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.sequence_index.cmp(&b.sequence_index))
            .then_with(|| a.document_id.cmp(&b.document_id))
    });

    for (index, chunk) in ranked.iter_mut().enumerate() {
        chunk.rank = index + 1;
    }

    ranked
}

/// Fraction of distinct query terms that occur in the chunk text,
/// case-insensitive. Terms are whitespace-separated words.
fn term_overlap(query: &str, content: &str) -> f32 {
    let content_lower = content.to_lowercase();
    let terms: Vec<String> = query
        .split_whitespace()
        .map(str::to_lowercase)
        .sorted()
        .dedup()
        .collect();

    if terms.is_empty() {
        return 0.0;
    }

    let matched = terms
        .iter()
        .filter(|term| content_lower.contains(term.as_str()))
        .count();

    matched as f32 / terms.len() as f32
}
