// Resume analysis pipeline.
// normalize → segment → {keywords → coverage, ats} + alignment → aggregate.
// Everything except alignment is synchronous and deterministic; alignment goes
// through the injected `Embedder` under a deadline.

pub mod aggregate;
pub mod alignment;
pub mod ats;
pub mod coverage;
pub mod handlers;
pub mod keywords;
pub mod normalizer;
pub mod pipeline;
pub mod segmenter;
pub mod settings;

use thiserror::Error;

use crate::embedding::EmbeddingError;

pub use pipeline::{Pipeline, PipelineResources};
pub use settings::AnalysisConfig;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{field} is empty or contains no readable text")]
    InsufficientInput { field: &'static str },

    #[error("{field} is {size} bytes, above the {limit} byte limit")]
    InputTooLarge {
        field: &'static str,
        size: usize,
        limit: usize,
    },

    #[error("Invalid analysis config: {0}")]
    InvalidConfig(String),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("{0} is not a finite number")]
    NonFiniteScore(&'static str),
}

/// Clamps to [0, 100] and rounds to one decimal.
pub(crate) fn to_score(value: f64) -> f64 {
    (value.clamp(0.0, 100.0) * 10.0).round() / 10.0
}
