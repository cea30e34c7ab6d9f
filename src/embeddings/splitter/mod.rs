
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use text_splitter::{Characters, ChunkConfig, TextSplitter};
use tracing::debug;

use crate::documents::Document;
use crate::{BotError, Result};

/// Where a chunk came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkOrigin {
    pub source: PathBuf,
    pub page: u32,
}

/// A bounded slice of a document's text, ready for embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub text: String,
    pub origin: ChunkOrigin,
}

/// Configuration for text splitting. Sizes are measured in characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk
    pub chunk_size: usize,
    /// Maximum characters shared by consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Recursive splitter: paragraphs, then lines, sentences, words and finally
/// characters, merged back up to `chunk_size` with `chunk_overlap` carried over.
pub struct DocumentSplitter {
    splitter: TextSplitter<Characters>,
}

impl DocumentSplitter {
    #[inline]
    pub fn new(config: &ChunkingConfig) -> Result<Self> {
        let chunk_config = ChunkConfig::new(config.chunk_size)
            .with_overlap(config.chunk_overlap)
            .map_err(|e| BotError::Config(format!("Invalid chunking configuration: {}", e)))?;

        Ok(Self {
            splitter: TextSplitter::new(chunk_config),
        })
    }

    /// Split raw text, returning each chunk with its byte offset into `text`
    #[inline]
    pub fn split_text<'text>(&self, text: &'text str) -> Vec<(usize, &'text str)> {
        self.splitter.chunk_indices(text).collect()
    }

    /// Split every document in order, keeping the document's origin on each chunk
    #[inline]
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for document in documents {
            let before = chunks.len();
            chunks.extend(self.splitter.chunks(&document.text).map(|text| Chunk {
                text: text.to_string(),
                origin: ChunkOrigin {
                    source: document.source.clone(),
                    page: document.page,
                },
            }));

            debug!(
                "Split {} page {} into {} chunks",
                document.source.display(),
                document.page,
                chunks.len() - before
            );
        }

        chunks
    }
}
