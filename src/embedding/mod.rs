//! Embedding generation for semantic search over course content.
//!
//! The embedding model itself is external; this module only adapts it to the
//! [`Embedder`] trait consumed by the semantic index.

mod openai;
mod trigram;

pub use openai::OpenAIEmbedder;
pub use trigram::TrigramEmbedder;

use crate::config::EmbeddingSettings;
use crate::error::{KursError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Build the embedder named by the settings.
pub fn create_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.provider.to_lowercase().as_str() {
        "openai" => Ok(Arc::new(OpenAIEmbedder::with_config(
            &settings.model,
            settings.dimensions as usize,
        )?)),
        "trigram" => Ok(Arc::new(TrigramEmbedder::new(settings.dimensions as usize))),
        other => Err(KursError::Config(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}
