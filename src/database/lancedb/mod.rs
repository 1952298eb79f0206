// LanceDB vector database module
// Each committed store owns its own table; similarity search is cosine.

pub mod vector_store;

use serde::{Deserialize, Serialize};

/// Embedding record stored in LanceDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique identifier for this embedding
    pub id: String,
    /// The vector embedding (768 dimensions for nomic-embed-text)
    pub vector: Vec<f32>,
    /// Identifier of the model that produced this vector
    pub model_id: String,
    /// Metadata about the chunk this embedding represents
    pub metadata: ChunkMetadata,
}

/// Metadata for a chunk stored alongside its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// ID of the chunk
    pub chunk_id: String,
    /// ID of the document this chunk belongs to
    pub document_id: String,
    /// Filesystem path of the source document
    pub source_path: String,
    /// The actual text content of the chunk
    pub content: String,
    /// Position of this chunk within its document (for ordering)
    pub sequence_index: u32,
    /// Character offset where this chunk starts in the document
    pub start_offset: u32,
    /// Character offset where this chunk ends in the document
    pub end_offset: u32,
    /// Timestamp when this embedding was created
    pub created_at: String,
}
