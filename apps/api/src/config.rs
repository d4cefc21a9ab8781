use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::analysis::settings::{ScoreWeights, SuggestionThresholds};
use crate::analysis::AnalysisConfig;
use crate::embedding::{hashed, http};
use crate::history;

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub max_input_bytes: usize,
    pub keyword_limit: usize,
    pub weights: ScoreWeights,
    pub thresholds: SuggestionThresholds,
    pub embedding_timeout: Duration,
    /// Selects the HTTP embedder when set; otherwise the hashed embedder is used.
    pub embedding_api_key: Option<String>,
    pub embedding_api_url: String,
    pub embedding_model: String,
    pub embedding_dims: usize,
    pub hashed_embedding_dims: usize,
    pub reference_corpus_path: Option<String>,
    pub stopwords_path: Option<String>,
    pub history_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = AnalysisConfig::default();
        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_input_bytes: parse_env("MAX_INPUT_BYTES", defaults.max_input_bytes)?,
            keyword_limit: parse_env("KEYWORD_LIMIT", defaults.keyword_limit)?,
            weights: ScoreWeights {
                keyword: parse_env("WEIGHT_KEYWORD", defaults.weights.keyword)?,
                ats: parse_env("WEIGHT_ATS", defaults.weights.ats)?,
                semantic: parse_env("WEIGHT_SEMANTIC", defaults.weights.semantic)?,
            },
            thresholds: SuggestionThresholds {
                keyword: parse_env("KEYWORD_THRESHOLD", defaults.thresholds.keyword)?,
                ats: parse_env("ATS_THRESHOLD", defaults.thresholds.ats)?,
                semantic: parse_env("SEMANTIC_THRESHOLD", defaults.thresholds.semantic)?,
            },
            embedding_timeout: Duration::from_millis(parse_env(
                "EMBEDDING_TIMEOUT_MS",
                defaults.embedding_timeout.as_millis() as u64,
            )?),
            embedding_api_key: optional_env("EMBEDDING_API_KEY"),
            embedding_api_url: std::env::var("EMBEDDING_API_URL")
                .unwrap_or_else(|_| http::DEFAULT_API_URL.to_string()),
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| http::DEFAULT_MODEL.to_string()),
            embedding_dims: parse_env("EMBEDDING_DIMS", http::DEFAULT_DIMENSIONS)?,
            hashed_embedding_dims: parse_env("HASHED_EMBEDDING_DIMS", hashed::DEFAULT_DIMENSIONS)?,
            reference_corpus_path: optional_env("REFERENCE_CORPUS_PATH"),
            stopwords_path: optional_env("STOPWORDS_PATH"),
            history_capacity: parse_env("HISTORY_CAPACITY", history::DEFAULT_CAPACITY)?,
        })
    }

    /// Pipeline settings. Validated later by `Pipeline::new`.
    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            max_input_bytes: self.max_input_bytes,
            keyword_limit: self.keyword_limit,
            weights: self.weights.clone(),
            thresholds: self.thresholds.clone(),
            embedding_timeout: self.embedding_timeout,
            ..AnalysisConfig::default()
        }
    }
}

/// Unset or blank counts as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
