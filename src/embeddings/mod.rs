// Embeddings module
// Text splitting and the sentence-embedding model behind the `Embedder` seam

pub mod ollama;
pub mod splitter;

pub use ollama::OllamaClient;
pub use splitter::{Chunk, ChunkOrigin, ChunkingConfig, DocumentSplitter};

use crate::Result;

/// Maps a piece of text to a fixed-length vector.
///
/// Ingestion and retrieval must share one implementation (and model), otherwise
/// query vectors land in a different space than the indexed ones.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
