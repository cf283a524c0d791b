//! Language model providers.
//!
//! The reasoning loop needs one capability: send a prompt, get text back,
//! stopping early at any of the given stop sequences. Providers:
//! - **[`OpenAIChat`]**: `POST /v1/chat/completions` (any OpenAI-compatible base URL).
//! - **[`OllamaChat`]**: `POST /api/generate` on a local Ollama instance.
//! - **[`GeminiChat`]**: Google's `generateContent` endpoint.
//!
//! All providers share the retry policy in [`crate::http`].

use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::http;

/// Sampling temperature sent by every provider.
pub const TEMPERATURE: f32 = 0.0;

/// A text completion capability.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Complete `prompt`; generation halts before any string in `stop`.
    async fn complete(&self, prompt: &str, stop: &[&str]) -> Result<String, LlmError>;
}

// ============ OpenAI ============

pub struct OpenAIChat {
    model: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl OpenAIChat {
    /// Requires `OPENAI_API_KEY`.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            LlmError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        let client = http::client(config.timeout_secs).map_err(|e| e.into_llm_error("OpenAI"))?;
        Ok(Self {
            model: config.model.clone(),
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            api_key,
            client,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, stop: &[&str]) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": TEMPERATURE,
            "stop": stop,
        });
        let json = http::post_json(
            &self.client,
            &format!("{}/chat/completions", self.base_url.trim_end_matches('/')),
            &[("Authorization", format!("Bearer {}", self.api_key))],
            &body,
            self.max_retries,
        )
        .await
        .map_err(|e| e.into_llm_error("OpenAI"))?;

        json.pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: "OpenAI",
                message: "missing choices[0].message.content".to_string(),
            })
    }
}

// ============ Ollama ============

pub struct OllamaChat {
    model: String,
    url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl OllamaChat {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = http::client(config.timeout_secs).map_err(|e| e.into_llm_error("Ollama"))?;
        Ok(Self {
            model: config.model.clone(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            client,
            max_retries: config.max_retries,
        })
    }

    fn request_body(&self, prompt: &str, stop: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": TEMPERATURE, "stop": stop },
        })
    }
}

#[async_trait]
impl LanguageModel for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, stop: &[&str]) -> Result<String, LlmError> {
        let body = self.request_body(prompt, stop);
        let json = http::post_json(
            &self.client,
            &format!("{}/api/generate", self.url.trim_end_matches('/')),
            &[],
            &body,
            self.max_retries,
        )
        .await
        .map_err(|e| e.into_llm_error("Ollama"))?;

        json.get("response")
            .and_then(|r| r.as_str())
            .map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: "Ollama",
                message: "missing response field".to_string(),
            })
    }
}

// ============ Gemini ============

pub struct GeminiChat {
    model: String,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl GeminiChat {
    /// Requires `GOOGLE_API_KEY`.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var("GOOGLE_API_KEY").map_err(|_| {
            LlmError::Config("GOOGLE_API_KEY environment variable not set".to_string())
        })?;
        let client = http::client(config.timeout_secs).map_err(|e| e.into_llm_error("Gemini"))?;
        Ok(Self {
            model: config.model.trim_start_matches("models/").to_string(),
            api_key,
            client,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl LanguageModel for GeminiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, stop: &[&str]) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "stopSequences": stop,
            },
        });
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let json = http::post_json(
            &self.client,
            &url,
            &[("x-goog-api-key", self.api_key.clone())],
            &body,
            self.max_retries,
        )
        .await
        .map_err(|e| e.into_llm_error("Gemini"))?;

        parse_gemini_text(&json)
    }
}

/// Concatenate `candidates[0].content.parts[].text`.
fn parse_gemini_text(json: &serde_json::Value) -> Result<String, LlmError> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| LlmError::InvalidResponse {
            provider: "Gemini",
            message: "missing candidates[0].content.parts".to_string(),
        })?;
    Ok(parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<String>())
}

/// Create the model named by `config.provider`.
pub fn create_llm(config: &LlmConfig) -> Result<Box<dyn LanguageModel>, LlmError> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAIChat::new(config)?)),
        "ollama" => Ok(Box::new(OllamaChat::new(config)?)),
        "gemini" => Ok(Box::new(GeminiChat::new(config)?)),
        other => Err(LlmError::Config(format!("Unknown llm provider: {}", other))),
    }
}
