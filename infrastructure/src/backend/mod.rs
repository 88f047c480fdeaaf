//! Completion backend adapters

pub mod llama;

pub use llama::LlamaCppBackend;
