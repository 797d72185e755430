pub mod document;
pub mod openai;
pub mod vector_index;
