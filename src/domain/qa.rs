use serde::{Deserialize, Serialize};
use uuid::Uuid;

// A chunk retrieved for a query, with its similarity score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_index: u32,
    pub text: String,
    pub score: f32,
}

/// One embedded chunk of the manual page, as persisted in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: Uuid,
    /// Position of the chunk within the document, for stable ordering.
    pub chunk_index: u32,
    pub text: String,
    pub vector: Vec<f32>,
}

impl ChunkRecord {
    pub fn new(chunk_index: u32, text: String, vector: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            chunk_index,
            text,
            vector,
        }
    }
}
