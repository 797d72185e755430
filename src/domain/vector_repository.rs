use anyhow::Result;
use async_trait::async_trait;

use crate::domain::qa::{ChunkRecord, ScoredChunk};

#[async_trait]
pub trait VectorRepository: Send + Sync {
    /// Adds chunks to the index and persists them.
    async fn upsert_chunks(&self, chunks: &[ChunkRecord]) -> Result<()>;

    /// Searches the index by cosine similarity against `query_vector`.
    /// Results are ordered by descending score.
    async fn search(
        &self,
        query_vector: Vec<f32>,
        limit: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredChunk>>;
}
