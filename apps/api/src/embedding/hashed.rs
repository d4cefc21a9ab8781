//! Feature-hashing embedder. No model, no network, fully deterministic.
//!
//! Each lowercase word is hashed (SHA-256) into one of `dims` buckets with a ±1 sign.
//! Crude compared to a sentence model, but stable across processes and platforms,
//! which is what tests and offline deployments need.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{Embedder, EmbeddingError};

pub const DEFAULT_DIMENSIONS: usize = 256;

#[derive(Debug, Clone)]
pub struct HashedEmbedder {
    dims: usize,
}

impl HashedEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dims];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let (bucket, sign) = bucket_for(&word.to_lowercase(), self.dims);
            vector[bucket] += sign;
        }
        vector
    }
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

fn bucket_for(word: &str, dims: usize) -> (usize, f32) {
    let digest = Sha256::digest(word.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let bucket = (u64::from_le_bytes(head) % dims as u64) as usize;
    let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
    (bucket, sign)
}

#[async_trait]
impl Embedder for HashedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.vectorize(text))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn backend(&self) -> &'static str {
        "hashed"
    }
}
