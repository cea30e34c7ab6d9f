// Database module
// Remote vector index holding the embedded chunks

pub mod pinecone;

pub use pinecone::{
    IndexDescription, IndexSpec, IndexStats, IndexedRecord, PineconeClient, PineconeIndex,
    RecordMetadata, ScoredRecord, VectorIndex,
};
