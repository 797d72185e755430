pub mod chunker;
pub mod qa_service;
