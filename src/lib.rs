pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export the items main.rs and the integration tests need
pub use application::qa_service::QaService;
pub use config::{load_config, QaConfig};
pub use domain::language_model::{CompletionProvider, EmbeddingProvider};
pub use domain::qa::{ChunkRecord, ScoredChunk};
pub use domain::vector_repository::VectorRepository;
pub use infrastructure::document::load_manual_page;
pub use infrastructure::openai::OpenAiClient;
pub use infrastructure::vector_index::JsonlVectorIndex;
