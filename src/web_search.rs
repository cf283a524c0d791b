//! External web search backends.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::WebSearchConfig;
use crate::error::ToolError;
use crate::http;

/// One search result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Snippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// A web search capability returning ordered snippets.
#[async_trait]
pub trait WebSearch: Send + Sync {
    fn provider_name(&self) -> &str;

    /// Search the web; implementations return at most `max_results` snippets.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Snippet>, ToolError>;
}

/// Backend used when no search provider is configured.
pub struct DisabledWebSearch;

#[async_trait]
impl WebSearch for DisabledWebSearch {
    fn provider_name(&self) -> &str {
        "disabled"
    }

    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<Snippet>, ToolError> {
        Err(ToolError::Search("web search is not configured".to_string()))
    }
}

/// Tavily search API (`POST https://api.tavily.com/search`).
///
/// Requires the `TAVILY_API_KEY` environment variable.
pub struct TavilySearch {
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<Snippet>,
}

impl TavilySearch {
    pub fn new(config: &WebSearchConfig) -> Result<Self, ToolError> {
        let api_key = std::env::var("TAVILY_API_KEY").map_err(|_| {
            ToolError::Search("TAVILY_API_KEY environment variable not set".to_string())
        })?;
        let client = http::client(config.timeout_secs).map_err(|e| e.into_tool_error("Tavily"))?;
        Ok(Self {
            api_key,
            client,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    fn provider_name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Snippet>, ToolError> {
        let body = serde_json::json!({
            "query": query,
            "max_results": max_results,
        });
        let json = http::post_json(
            &self.client,
            "https://api.tavily.com/search",
            &[("Authorization", format!("Bearer {}", self.api_key))],
            &body,
            self.max_retries,
        )
        .await
        .map_err(|e| e.into_tool_error("Tavily"))?;

        let response: TavilyResponse = serde_json::from_value(json)
            .map_err(|e| ToolError::Search(format!("invalid Tavily response: {}", e)))?;
        let mut results = response.results;
        results.truncate(max_results);
        Ok(results)
    }
}

/// Create the backend named by `config.provider`.
pub fn create_web_search(config: &WebSearchConfig) -> Result<Box<dyn WebSearch>, ToolError> {
    match config.provider.as_str() {
        "tavily" => Ok(Box::new(TavilySearch::new(config)?)),
        "disabled" => Ok(Box::new(DisabledWebSearch)),
        other => Err(ToolError::Search(format!(
            "Unknown web search provider: {}",
            other
        ))),
    }
}

/// Render snippets as a numbered digest for the model.
pub fn format_digest(snippets: &[Snippet]) -> String {
    if snippets.is_empty() {
        return "No web results found.".to_string();
    }
    snippets
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut entry = format!("[{}] {}", i + 1, s.title.trim());
            if !s.url.is_empty() {
                entry.push_str(&format!(" ({})", s.url));
            }
            entry.push('\n');
            entry.push_str(s.content.trim());
            entry
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_numbers_results() {
        let digest = format_digest(&[
            Snippet {
                title: "Paris".into(),
                url: "https://example.org/paris".into(),
                content: "Paris is the capital of France. ".into(),
            },
            Snippet {
                title: "Lyon".into(),
                url: String::new(),
                content: "Lyon is a city.".into(),
            },
        ]);
        assert_eq!(
            digest,
            "[1] Paris (https://example.org/paris)\nParis is the capital of France.\n\n[2] Lyon\nLyon is a city."
        );
    }

    #[test]
    fn empty_digest() {
        assert_eq!(format_digest(&[]), "No web results found.");
    }

    #[test]
    fn tavily_response_tolerates_missing_fields() {
        let json = serde_json::json!({ "results": [ { "url": "https://a" } ], "query": "q" });
        let parsed: TavilyResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.results[0].url, "https://a");
        assert_eq!(parsed.results[0].title, "");
    }

    #[tokio::test]
    async fn disabled_backend_errors() {
        assert!(DisabledWebSearch.search("q", 2).await.is_err());
    }
}
