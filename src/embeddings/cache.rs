//! Content-addressed embedding cache.

use crate::embeddings::Encoder;
use crate::storage::{keys, EmbeddingStore};
use crate::types::{EngineError, Result};
use std::sync::Arc;
use tracing::debug;

/// Cache of encoder output keyed by `(model_id, normalized text)`.
///
/// Misses call the encoder and write through; hits never touch the encoder.
/// Two concurrent misses for the same key may both compute. The write is
/// idempotent under a deterministic encoder, so no locking is needed beyond
/// what the store provides. Failed computations are never cached.
pub struct EmbeddingCache {
    store: Arc<dyn EmbeddingStore>,
    encoder: Arc<dyn Encoder>,
}

impl EmbeddingCache {
    pub fn new(store: Arc<dyn EmbeddingStore>, encoder: Arc<dyn Encoder>) -> Self {
        Self { store, encoder }
    }

    pub fn encoder(&self) -> &Arc<dyn Encoder> {
        &self.encoder
    }

    /// Look up the vector for `text`, computing and persisting it on a miss.
    pub async fn get_or_compute(&self, text: &str) -> Result<Vec<f32>> {
        let key = keys::cache_key(self.encoder.model_id(), text);

        if let Some(bytes) = self.store.get(&key)? {
            let vector: Vec<f32> = bincode::deserialize(&bytes)?;
            self.check_dim(&vector)?;
            return Ok(vector);
        }

        debug!(model = self.encoder.model_id(), "embedding cache miss");
        let vector = self.encoder.encode(text).await?;
        self.check_dim(&vector)?;
        self.store.put(&key, &bincode::serialize(&vector)?)?;
        Ok(vector)
    }

    fn check_dim(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.encoder.dim() {
            return Err(EngineError::DimensionMismatch {
                expected: self.encoder.dim(),
                actual: vector.len(),
            });
        }
        Ok(())
    }
}
