//! Embedding backends: the only place text becomes vectors.
//!
//! The pipeline holds an `Arc<dyn Embedder>` chosen at startup:
//! `HttpEmbedder` when an API key is configured, otherwise the deterministic `HashedEmbedder`.

use async_trait::async_trait;
use thiserror::Error;

pub mod hashed;
pub mod http;

pub use hashed::HashedEmbedder;
pub use http::HttpEmbedder;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("backend returned no embedding")]
    Empty,

    #[error("expected {expected} dimensions, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("embedding contains non-finite values")]
    NonFinite,
}

impl EmbeddingError {
    /// The backend answered, but with a vector no arithmetic should touch.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, EmbeddingError::Dimension { .. } | EmbeddingError::NonFinite)
    }
}

/// Maps text to a fixed-length vector. Identical input must yield an identical vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Length of every vector `embed` returns.
    fn dimensions(&self) -> usize;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Checks a vector against the embedder's contract before it is used in any arithmetic.
pub fn validate_vector(vector: &[f32], expected: usize) -> Result<(), EmbeddingError> {
    if vector.len() != expected {
        return Err(EmbeddingError::Dimension {
            expected,
            actual: vector.len(),
        });
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(EmbeddingError::NonFinite);
    }
    Ok(())
}

/// Cosine of the angle between two equal-length vectors.
/// `None` when either vector has zero norm (nothing was embedded).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    debug_assert_eq!(a.len(), b.len());

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0))
}
