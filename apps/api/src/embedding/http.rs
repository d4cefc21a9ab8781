//! HTTP embedder: OpenAI-compatible `/v1/embeddings` client.
//!
//! Retries on 429 and 5xx with exponential backoff. The pipeline wraps every call in its own
//! deadline, so a slow backend degrades alignment instead of stalling the request.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Embedder, EmbeddingError};

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/embeddings";
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_DIMENSIONS: usize = 1536;
const MAX_RETRIES: u32 = 3;
/// Input cap in characters, kept under the 8k-token context of the default model.
const MAX_INPUT_CHARS: usize = 24_000;
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct HttpEmbedder {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    dims: usize,
}

impl HttpEmbedder {
    pub fn new(
        api_url: String,
        api_key: String,
        model: String,
        dims: usize,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
            model,
            dims,
        })
    }

    async fn request(&self, text: &str) -> Result<EmbeddingResponse, EmbeddingError> {
        let input = truncate_chars(text, MAX_INPUT_CHARS);
        if input.len() < text.len() {
            debug!(
                "Embedding input truncated from {} to {} bytes",
                text.len(),
                input.len()
            );
        }
        let body = EmbeddingRequest {
            model: &self.model,
            input,
            dimensions: self.dims,
        };

        let mut last_error: Option<EmbeddingError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // 500ms, then 1s
                let delay = std::time::Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(
                    "Embedding call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(EmbeddingError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Embedding API returned {}: {}", status, body);
                last_error = Some(EmbeddingError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(EmbeddingError::Api {
                    status: status.as_u16(),
                    message: error_message(body),
                });
            }

            return Ok(response.json().await?);
        }

        Err(last_error.unwrap_or(EmbeddingError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

/// Longest prefix of `text` with at most `max` characters.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Pulls `error.message` out of an API error body, falling back to the raw body.
fn error_message(body: String) -> String {
    serde_json::from_str::<ApiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self.request(text).await?;

        if let Some(usage) = &response.usage {
            debug!("Embedding call succeeded: prompt_tokens={}", usage.prompt_tokens);
        }

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(EmbeddingError::Empty)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn backend(&self) -> &'static str {
        "http"
    }
}
