use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const INDEX_FILENAME: &str = "index.jsonl";

/// The manual page the tool answers questions about.
///
/// The document is expected to be a plain-text export, e.g.
/// `man du | col -bx > du.man`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DocumentConfig {
    /// Path to the exported manual page.
    pub path: PathBuf,
    /// Token ceiling for the whole-document prompt. Documents estimated
    /// above this must go through the retrieval path instead.
    pub max_tokens: usize,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("du.man"),
            max_tokens: 2000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RetrievalConfig {
    /// Number of chunks stuffed into the retrieval prompt.
    pub top_k: usize,
    /// Where the persisted vector index lives.
    pub index_path: PathBuf,
    /// Minimum cosine score for a chunk to be used at all.
    #[serde(default)]
    pub score_threshold: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        // Calculate the default cache path *only here*
        let index_path = ProjectDirs::from("io", "manqa", "manqa")
            .map(|dirs| dirs.cache_dir().join(INDEX_FILENAME))
            .unwrap_or_else(|| PathBuf::from(INDEX_FILENAME));
        Self {
            top_k: 3,
            index_path,
            score_threshold: None,
        }
    }
}

/// Hosted API settings. The API key is deliberately not part of the
/// config file; it is read from `OPENAI_API_KEY` when the client is built.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OpenAiConfig {
    pub api_base: String,
    pub completion_model: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub temperature: f32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            completion_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimensions: 1536,
            temperature: 0.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct QaConfig {
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// Loads config from defaults, `manqa.toml` and `MANQA_`-prefixed env vars,
/// in that precedence order.
pub fn load_config() -> Result<QaConfig> {
    // Support MANQA_CONFIG_PATH env var for the config file path
    let config_path_env = std::env::var("MANQA_CONFIG_PATH").ok();
    let config_path = config_path_env
        .clone()
        .unwrap_or_else(|| "manqa.toml".to_string());

    if let Some(ref env_path) = config_path_env {
        if !std::path::Path::new(env_path).exists() {
            return Err(anyhow::anyhow!(
                "Config file not found at MANQA_CONFIG_PATH: {}",
                env_path
            ));
        }
        log::info!("MANQA_CONFIG_PATH is set: {}", env_path);
    } else {
        log::debug!("MANQA_CONFIG_PATH not set, falling back to default: {}", config_path);
    }

    let figment = Figment::new()
        // Start with our programmatically defined defaults
        .merge(Serialized::defaults(QaConfig::default()))
        // Merge TOML file if it exists
        .merge(Toml::file(&config_path))
        // Merge environment variables prefixed with MANQA_
        .merge(Env::prefixed("MANQA_").split("__"));

    let config: QaConfig = figment.extract().context("Failed to extract QaConfig")?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &QaConfig) -> Result<()> {
    if config.document.path.as_os_str().is_empty() {
        return Err(anyhow::anyhow!("Configured document path cannot be empty"));
    }
    if config.chunking.chunk_size == 0 {
        return Err(anyhow::anyhow!("chunk_size must be greater than zero"));
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        return Err(anyhow::anyhow!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            config.chunking.chunk_overlap,
            config.chunking.chunk_size
        ));
    }
    if config.retrieval.top_k == 0 {
        return Err(anyhow::anyhow!("top_k must be greater than zero"));
    }
    if config.retrieval.index_path.as_os_str().is_empty() {
        return Err(anyhow::anyhow!("Configured index_path cannot be empty"));
    }
    if config.openai.embedding_dimensions == 0 {
        return Err(anyhow::anyhow!("embedding_dimensions must be greater than zero"));
    }
    Ok(())
}
