
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::loader::Document;
use crate::{RagError, Result};

/// A bounded, overlapping segment of a document's text. The unit of
/// embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Id of the document this chunk was cut from.
    pub document_id: String,
    /// Position of this chunk within the document, starting at 0.
    pub sequence_index: usize,
    /// The chunk text.
    pub text: String,
    /// Char offset of the first character within the document text.
    pub start_offset: usize,
    /// Char offset one past the last character within the document text.
    pub end_offset: usize,
}

/// Configuration for text chunking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window width in characters.
    pub max_chunk_size: usize,
    /// Characters shared between adjacent chunks. Must be smaller than
    /// `max_chunk_size`.
    pub overlap_size: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_chunk_size: 300,
            overlap_size: 50,
        }
    }
}

impl ChunkingConfig {
    /// Window advance per step.
    #[inline]
    pub fn stride(&self) -> usize {
        self.max_chunk_size - self.overlap_size
    }
}

/// Split a document's text into overlapping chunks.
///
/// A window of `max_chunk_size` chars slides across the text, advancing by
/// `max_chunk_size - overlap_size` each step; the final chunk is truncated to
/// the remaining text. Concatenating the chunks in `sequence_index` order and
/// dropping each successor's leading `overlap_size` chars reconstructs the
/// text exactly. An `overlap_size` at or above the window width is rejected
/// with a `Config` error.
#[inline]
pub fn chunk_document(document: &Document, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    if config.overlap_size >= config.max_chunk_size {
        return Err(RagError::Config(format!(
            "overlap_size {} must be smaller than max_chunk_size {}",
            config.overlap_size, config.max_chunk_size
        )));
    }

    let text = document.text.as_str();
    if text.trim().is_empty() {
        return Err(RagError::EmptyDocument(document.source_path.clone()));
    }

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let stride = config.stride();

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut sequence_index = 0;

    loop {
        let end = (start + config.max_chunk_size).min(total);
        chunks.push(Chunk {
            document_id: document.id.clone(),
            sequence_index,
            text: chars[start..end].iter().collect(),
            start_offset: start,
            end_offset: end,
        });

        if end == total {
            break;
        }
        start += stride;
        sequence_index += 1;
    }

    debug!(
        "Chunked document {} ({} chars) into {} chunks",
        document.id,
        total,
        chunks.len()
    );

    Ok(chunks)
}

/// Reassemble the original text from an ordered chunk sequence, dropping the
/// declared overlap. Used by consistency checks and tests.
#[inline]
pub fn reconstruct_text(chunks: &[Chunk], config: &ChunkingConfig) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            out.push_str(&chunk.text);
        } else {
            out.extend(chunk.text.chars().skip(config.overlap_size));
        }
    }
    out
}
