use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use log::{debug, info};

use crate::application::chunker::{estimate_tokens, normalize_whitespace, split_into_chunks};
use crate::config::QaConfig;
use crate::domain::language_model::{CompletionProvider, EmbeddingProvider};
use crate::domain::qa::ChunkRecord;
use crate::domain::vector_repository::VectorRepository;

/// Orchestrates the two question-answering pipelines: whole-document
/// prompting and retrieval over the local vector index.
pub struct QaService {
    embedder: Arc<dyn EmbeddingProvider>,
    completer: Arc<dyn CompletionProvider>,
    vector_index: Arc<dyn VectorRepository>,
    config: QaConfig,
}

impl QaService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        completer: Arc<dyn CompletionProvider>,
        vector_index: Arc<dyn VectorRepository>,
        config: QaConfig,
    ) -> Self {
        Self {
            embedder,
            completer,
            vector_index,
            config,
        }
    }

    /// Answers a question by stuffing the entire manual page into the prompt.
    ///
    /// The document must fit under the configured token ceiling; larger
    /// documents have to go through `answer_with_retrieval` instead.
    pub async fn answer_full_document(&self, document: &str, question: &str) -> Result<String> {
        if document.trim().is_empty() {
            bail!("The manual page is empty, nothing to answer from");
        }

        let tokens = estimate_tokens(document);
        let max_tokens = self.config.document.max_tokens;
        if tokens > max_tokens {
            bail!(
                "Document is too large for the whole-document prompt ({} tokens estimated, max {}). \
                 Use `manqa rag` instead.",
                tokens,
                max_tokens
            );
        }
        debug!("Document fits the prompt: ~{} of {} tokens", tokens, max_tokens);

        let prompt = render_full_document_prompt(document, question);
        let answer = self.completer.complete(&prompt).await?;
        Ok(answer.trim().to_string())
    }

    /// Chunks, embeds and upserts the manual page into the vector index.
    /// Returns the number of chunks indexed.
    pub async fn index_document(&self, document: &str) -> Result<usize> {
        let normalized = normalize_whitespace(document);
        let chunks = split_into_chunks(
            &normalized,
            self.config.chunking.chunk_size,
            self.config.chunking.chunk_overlap,
        );
        if chunks.is_empty() {
            bail!("The manual page produced no chunks, nothing to index");
        }
        info!("Generated {} chunks from the document", chunks.len());

        let embeddings = self.embedder.embed_batch(&chunks).await?;
        if embeddings.len() != chunks.len() {
            bail!(
                "Embedding count ({}) does not match chunk count ({})",
                embeddings.len(),
                chunks.len()
            );
        }

        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (text, vector))| ChunkRecord::new(index as u32, text, vector))
            .collect();

        let count = records.len();
        self.vector_index.upsert_chunks(&records).await?;
        info!("Upserted {} chunks into the vector index", count);
        Ok(count)
    }

    /// Answers a question using the top-k chunks retrieved from the index.
    pub async fn answer_with_retrieval(&self, question: &str) -> Result<String> {
        info!(
            "Retrieving top {} chunks for question: '{}'",
            self.config.retrieval.top_k, question
        );

        let query_embedding = self
            .embedder
            .embed_batch(std::slice::from_ref(&question.to_string()))
            .await?
            .pop()
            .ok_or_else(|| anyhow!("Failed to generate an embedding for the question"))?;

        let results = self
            .vector_index
            .search(
                query_embedding,
                self.config.retrieval.top_k,
                self.config.retrieval.score_threshold,
            )
            .await?;

        if results.is_empty() {
            bail!("No chunks retrieved from the index. Run `manqa index` first.");
        }
        debug!(
            "Retrieved {} chunks, best score {:.3}",
            results.len(),
            results[0].score
        );

        let context = results
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = render_retrieval_prompt(&context, question);
        let answer = self.completer.complete(&prompt).await?;
        Ok(answer.trim().to_string())
    }
}

fn render_full_document_prompt(doc: &str, question: &str) -> String {
    format!(
        "Use the following documentation of a linux command line tool to answer questions about it.\n\
         Give concise answers. The docs are between --- marks.\n\
         \n\
         ---\n\
         {doc}\n\
         ---\n\
         \n\
         Question: {question}\n\
         Answer: "
    )
}

fn render_retrieval_prompt(context: &str, question: &str) -> String {
    format!(
        "Use the following documentation of a linux command line tool to answer questions about it.\n\
         Give concise answers. If you don't know the answer, say \"I don't know\". The docs are between --- marks.\n\
         \n\
         ---\n\
         {context}\n\
         ---\n\
         \n\
         Question: {question}\n\
         Answer: "
    )
}
