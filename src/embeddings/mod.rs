//! Text-to-vector encoding.
//!
//! The encoder model itself is an external collaborator; this module defines
//! the boundary (`Encoder`), a remote HTTP client, a deterministic offline
//! encoder, and the content-addressed cache that sits in front of either.

pub mod cache;
pub mod hashing;
pub mod remote;

pub use cache::EmbeddingCache;
pub use hashing::HashingEncoder;
pub use remote::RemoteEncoder;

use crate::types::Result;
use async_trait::async_trait;

/// Sentence encoder boundary.
///
/// Implementations are assumed deterministic for a fixed `model_id` and may
/// be network-bound and fallible.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Stable identifier for the encoder model. Cache entries are keyed on
    /// this, so two encoders with the same id must produce identical vectors.
    fn model_id(&self) -> &str;

    /// Embedding dimensionality.
    fn dim(&self) -> usize;

    /// Compute the embedding for one text.
    async fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Compute embeddings for a batch of texts.
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.encode(text).await?);
        }
        Ok(out)
    }
}
