pub mod language_model;
pub mod qa;
pub mod vector_repository;
