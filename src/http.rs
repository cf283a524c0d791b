//! JSON-over-HTTP with retry and exponential backoff.
//!
//! Shared by the embedding, LLM, and web search providers:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use crate::error::{EmbeddingError, LlmError, ToolError};

/// Why a request ultimately failed.
#[derive(Debug)]
pub enum HttpFailure {
    Api { status: u16, body: String },
    Network(String),
    Decode(String),
}

pub fn client(timeout_secs: u64) -> Result<reqwest::Client, HttpFailure> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| HttpFailure::Network(e.to_string()))
}

/// POST `body` to `url`, retrying transient failures up to `max_retries` times.
///
/// `headers` are added to every attempt.
pub async fn post_json(
    client: &reqwest::Client,
    url: &str,
    headers: &[(&str, String)],
    body: &serde_json::Value,
    max_retries: u32,
) -> Result<serde_json::Value, HttpFailure> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::warn!(url, attempt, ?delay, "retrying request");
            tokio::time::sleep(delay).await;
        }

        let mut request = client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response
                        .json()
                        .await
                        .map_err(|e| HttpFailure::Decode(e.to_string()));
                }

                let body_text = response.text().await.unwrap_or_default();
                let failure = HttpFailure::Api {
                    status: status.as_u16(),
                    body: body_text,
                };

                // Rate limited or server error, retry
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(failure);
                    continue;
                }

                return Err(failure);
            }
            Err(e) => {
                last_err = Some(HttpFailure::Network(e.to_string()));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| HttpFailure::Network("request failed after retries".into())))
}

impl HttpFailure {
    pub fn into_embedding_error(self, provider: &'static str) -> EmbeddingError {
        match self {
            HttpFailure::Api { status, body } => EmbeddingError::Api {
                provider,
                status,
                body,
            },
            HttpFailure::Network(message) => EmbeddingError::Network { provider, message },
            HttpFailure::Decode(message) => EmbeddingError::InvalidResponse { provider, message },
        }
    }

    pub fn into_llm_error(self, provider: &'static str) -> LlmError {
        match self {
            HttpFailure::Api { status, body } => LlmError::Api {
                provider,
                status,
                body,
            },
            HttpFailure::Network(message) => LlmError::Network { provider, message },
            HttpFailure::Decode(message) => LlmError::InvalidResponse { provider, message },
        }
    }

    pub fn into_tool_error(self, provider: &str) -> ToolError {
        match self {
            HttpFailure::Api { status, body } => {
                ToolError::Search(format!("{} API error {}: {}", provider, status, body))
            }
            HttpFailure::Network(message) | HttpFailure::Decode(message) => {
                ToolError::Search(format!("{}: {}", provider, message))
            }
        }
    }
}
