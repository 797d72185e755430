//! Persisted vector index: one JSON chunk record per line, searched
//! brute-force by cosine similarity. A single manual page yields a few
//! dozen chunks, so nothing fancier is warranted.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use thiserror::Error;

use crate::domain::qa::{ChunkRecord, ScoredChunk};
use crate::domain::vector_repository::VectorRepository;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid index record at line {line}: {source}")]
    InvalidRecord {
        line: usize,
        source: serde_json::Error,
    },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub struct JsonlVectorIndex {
    path: PathBuf,
    dimensions: usize,
    records: Mutex<Vec<ChunkRecord>>,
}

impl JsonlVectorIndex {
    /// Creates an empty index. Nothing is written until the first upsert.
    pub fn create(path: PathBuf, dimensions: usize) -> Self {
        Self {
            path,
            dimensions,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Loads a previously persisted index into memory.
    ///
    /// Records whose vector length disagrees with `dimensions` make the
    /// whole load fail; a half-usable index would silently skew retrieval.
    pub fn load(path: PathBuf, dimensions: usize) -> Result<Self, VectorIndexError> {
        let file = File::open(&path)?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: ChunkRecord =
                serde_json::from_str(&line).map_err(|source| VectorIndexError::InvalidRecord {
                    line: line_number + 1,
                    source,
                })?;
            if record.vector.len() != dimensions {
                return Err(VectorIndexError::DimensionMismatch {
                    expected: dimensions,
                    actual: record.vector.len(),
                });
            }
            records.push(record);
        }

        debug!("Loaded {} chunk records from {:?}", records.len(), path);
        Ok(Self {
            path,
            dimensions,
            records: Mutex::new(records),
        })
    }

    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all records and removes the persisted file, for rebuilds.
    pub fn clear(&self) -> Result<(), VectorIndexError> {
        self.records.lock().unwrap().clear();
        if self.path.is_file() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    // Rewrites the whole file through a temp sibling so a crash mid-write
    // never leaves a truncated index behind.
    fn persist(&self, records: &[ChunkRecord]) -> Result<(), VectorIndexError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for record in records {
                let json = serde_json::to_string(record).map_err(|source| {
                    VectorIndexError::InvalidRecord { line: 0, source }
                })?;
                writeln!(writer, "{}", json)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl VectorRepository for JsonlVectorIndex {
    async fn upsert_chunks(&self, chunks: &[ChunkRecord]) -> Result<()> {
        if chunks.is_empty() {
            info!("No chunks provided for upsert.");
            return Ok(());
        }

        for chunk in chunks {
            if chunk.vector.len() != self.dimensions {
                return Err(VectorIndexError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: chunk.vector.len(),
                }
                .into());
            }
        }

        let mut records = self.records.lock().unwrap();
        records.extend_from_slice(chunks);
        self.persist(&records)?;
        info!(
            "Persisted {} chunk records to {:?}",
            records.len(),
            self.path
        );
        Ok(())
    }

    async fn search(
        &self,
        query_vector: Vec<f32>,
        limit: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredChunk>> {
        if query_vector.len() != self.dimensions {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: query_vector.len(),
            }
            .into());
        }

        let records = self.records.lock().unwrap();
        if records.is_empty() {
            warn!("Search on an empty index, returning no results");
            return Ok(Vec::new());
        }

        let mut scored: Vec<ScoredChunk> = records
            .iter()
            .map(|record| ScoredChunk {
                chunk_index: record.chunk_index,
                text: record.text.clone(),
                score: cosine_similarity(&query_vector, &record.vector),
            })
            .filter(|chunk| score_threshold.map_or(true, |threshold| chunk.score >= threshold))
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        debug!("Search returned {} of {} records", scored.len(), records.len());
        Ok(scored)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (x, y) in a.iter().zip(b.iter()) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = (norm_a * norm_b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }

    dot_product / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(index: u32, text: &str, vector: Vec<f32>) -> ChunkRecord {
        ChunkRecord::new(index, text.to_string(), vector)
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        // Mismatched or empty inputs score zero instead of panicking
        assert_eq!(cosine_similarity(&a, &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[tokio::test]
    async fn test_upsert_and_search() -> Result<()> {
        let dir = tempdir()?;
        let index = JsonlVectorIndex::create(dir.path().join("index.jsonl"), 3);

        index
            .upsert_chunks(&[
                record(0, "chunk about totals", vec![0.1, 0.2, 0.7]),
                record(1, "chunk about symlinks", vec![0.8, 0.1, 0.1]),
                record(2, "chunk about sizes", vec![0.2, 0.3, 0.5]),
            ])
            .await?;

        let results = index.search(vec![0.15, 0.25, 0.6], 5, None).await?;
        assert_eq!(results.len(), 3);
        // Closest record first
        assert_eq!(results[0].text, "chunk about totals");
        assert!(results[0].score > results[1].score);

        // The symlinks record points the other way and falls under the
        // threshold; the two size-related records survive
        let results = index.search(vec![0.15, 0.25, 0.6], 5, Some(0.5)).await?;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|chunk| chunk.text != "chunk about symlinks"));

        let results = index.search(vec![0.7, 0.15, 0.15], 1, None).await?;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "chunk about symlinks");
        Ok(())
    }

    #[tokio::test]
    async fn test_persist_and_reload() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("index.jsonl");

        let index = JsonlVectorIndex::create(path.clone(), 3);
        index
            .upsert_chunks(&[
                record(0, "first", vec![1.0, 0.0, 0.0]),
                record(1, "second", vec![0.0, 1.0, 0.0]),
            ])
            .await?;
        assert!(JsonlVectorIndex::exists(&path));

        let reloaded = JsonlVectorIndex::load(path, 3).expect("reload failed");
        assert_eq!(reloaded.len(), 2);

        let results = reloaded.search(vec![0.9, 0.1, 0.0], 1, None).await?;
        assert_eq!(results[0].text, "first");
        Ok(())
    }

    #[test]
    fn test_load_rejects_wrong_dimensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.jsonl");
        let record = record(0, "first", vec![1.0, 0.0]);
        fs::write(&path, format!("{}\n", serde_json::to_string(&record).unwrap())).unwrap();

        let result = JsonlVectorIndex::load(path, 3);
        assert!(matches!(
            result,
            Err(VectorIndexError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_load_rejects_garbage_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.jsonl");
        fs::write(&path, "not json at all\n").unwrap();

        let result = JsonlVectorIndex::load(path, 3);
        assert!(matches!(
            result,
            Err(VectorIndexError::InvalidRecord { line: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_search_wrong_dimension_errors() {
        let dir = tempdir().unwrap();
        let index = JsonlVectorIndex::create(dir.path().join("index.jsonl"), 3);

        let result = index.search(vec![0.1, 0.2], 5, None).await;
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("dimension mismatch"));
    }

    #[tokio::test]
    async fn test_upsert_empty_is_noop() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("index.jsonl");
        let index = JsonlVectorIndex::create(path.clone(), 3);

        index.upsert_chunks(&[]).await?;
        assert!(index.is_empty());
        // No file gets written for an empty upsert
        assert!(!JsonlVectorIndex::exists(&path));
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_removes_file_and_records() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("index.jsonl");
        let index = JsonlVectorIndex::create(path.clone(), 3);
        index
            .upsert_chunks(&[record(0, "first", vec![1.0, 0.0, 0.0])])
            .await?;
        assert!(JsonlVectorIndex::exists(&path));

        index.clear()?;
        assert!(index.is_empty());
        assert!(!JsonlVectorIndex::exists(&path));
        Ok(())
    }

    #[tokio::test]
    async fn test_search_empty_index_returns_nothing() -> Result<()> {
        let dir = tempdir()?;
        let index = JsonlVectorIndex::create(dir.path().join("index.jsonl"), 3);
        let results = index.search(vec![1.0, 0.0, 0.0], 5, None).await?;
        assert!(results.is_empty());
        Ok(())
    }
}
