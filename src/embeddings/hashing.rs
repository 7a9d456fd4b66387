//! Deterministic offline encoder.
//!
//! Token-hashing bag-of-words vectors: each lowercased alphanumeric token is
//! hashed into a bucket of the output vector, and the result is
//! L2-normalized. Texts sharing tokens get similar vectors, which is enough
//! for tests and for running the engine without a model service. Not a
//! substitute for a real sentence encoder.

use crate::embeddings::Encoder;
use crate::types::Result;
use async_trait::async_trait;

pub const DEFAULT_DIM: usize = 384;

/// Encoder that derives vectors from token hashes. Fully deterministic.
pub struct HashingEncoder {
    model_id: String,
    dim: usize,
}

impl HashingEncoder {
    pub fn new(dim: usize) -> Self {
        Self {
            model_id: format!("hash:{}", dim),
            dim,
        }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let lowered = token.to_lowercase();
            let hash = blake3::hash(lowered.as_bytes());
            let bytes = hash.as_bytes();
            let mut first = [0u8; 8];
            first.copy_from_slice(&bytes[0..8]);
            let h = u64::from_le_bytes(first);
            let idx = (h as usize) % self.dim;
            // Weight derived from the hash keeps distinct tokens from
            // cancelling when they collide on a bucket
            let weight = 0.5 + ((h >> 32) as u32 as f32) / (u32::MAX as f32);
            v[idx] += weight;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Default for HashingEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_DIM)
    }
}

#[async_trait]
impl Encoder for HashingEncoder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::distance::{CosineDistance, Distance};

    #[tokio::test]
    async fn test_deterministic() {
        let enc = HashingEncoder::default();
        let a = enc.encode("how do I connect my sensor").await.unwrap();
        let b = enc.encode("how do I connect my sensor").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_DIM);
    }

    #[tokio::test]
    async fn test_normalized() {
        let enc = HashingEncoder::default();
        let v = enc.encode("some words here").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_shared_tokens_are_closer() {
        let enc = HashingEncoder::default();
        let query = enc.encode("how to connect sensor").await.unwrap();
        let related = enc.encode("How do I connect my sensor?").await.unwrap();
        let unrelated = enc.encode("what is the refund policy").await.unwrap();

        let dist = CosineDistance;
        assert!(dist.distance(&query, &related) < dist.distance(&query, &unrelated));
    }
}
