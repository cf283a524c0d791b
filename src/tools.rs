//! Tools the reasoning loop can call by name.
//!
//! Every tool takes a plain-text input and produces a plain-text
//! observation. [`Tool::invoke`] never fails: errors from
//! [`Tool::execute`] are turned into an observation string, so a broken
//! network call or an empty index only costs the model one step.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │             ToolRegistry             │
//! │  ┌───────────────┐ ┌──────────────┐  │
//! │  │ RetrievalTool │ │ WebSearchTool│  │
//! │  │ (VectorIndex) │ │ (WebSearch)  │  │
//! │  └───────────────┘ └──────────────┘  │
//! └──────────────────┬───────────────────┘
//!                    ▼
//!        agent prompt + action dispatch
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ToolError;
use crate::index::{Retriever, NO_RESULTS};
use crate::web_search::{format_digest, WebSearch};

/// A named capability the agent may invoke.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use agentic_rag::error::ToolError;
/// use agentic_rag::tools::Tool;
///
/// pub struct Echo;
///
/// #[async_trait]
/// impl Tool for Echo {
///     fn name(&self) -> &str { "echo" }
///     fn description(&self) -> &str { "Repeat the input back" }
///
///     async fn execute(&self, input: &str) -> Result<String, ToolError> {
///         Ok(input.to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Dispatch key; must be unique within a registry.
    fn name(&self) -> &str;

    /// One-line description shown to the model verbatim.
    fn description(&self) -> &str;

    async fn execute(&self, input: &str) -> Result<String, ToolError>;

    /// Run the tool, converting any failure into an observation.
    async fn invoke(&self, input: &str) -> String {
        match self.execute(input).await {
            Ok(observation) => observation,
            Err(e) => {
                tracing::warn!(tool = self.name(), error = %e, "tool invocation failed");
                format!("Error from {}: {}", self.name(), e)
            }
        }
    }
}

/// Searches the session's document.
pub struct RetrievalTool {
    name: String,
    description: String,
    retriever: Retriever,
}

impl RetrievalTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        retriever: Retriever,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            retriever,
        }
    }
}

#[async_trait]
impl Tool for RetrievalTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        // A document without text answers every query the same way.
        if self.retriever.is_empty() {
            return Ok(NO_RESULTS.to_string());
        }
        let query = input.trim();
        if query.is_empty() {
            return Err(ToolError::EmptyInput);
        }
        Ok(self.retriever.retrieve(query).await?)
    }
}

pub const WEB_SEARCH_TOOL_NAME: &str = "web_search";
const WEB_SEARCH_TOOL_DESCRIPTION: &str = "A search engine optimized for comprehensive, accurate, \
     and trusted results. Useful for when you need to answer questions about current events \
     or facts not found in the document. Input should be a search query.";

/// Queries an external search engine.
pub struct WebSearchTool {
    backend: Arc<dyn WebSearch>,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(backend: Arc<dyn WebSearch>, max_results: usize) -> Self {
        Self {
            backend,
            max_results,
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        WEB_SEARCH_TOOL_NAME
    }

    fn description(&self) -> &str {
        WEB_SEARCH_TOOL_DESCRIPTION
    }

    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let query = input.trim();
        if query.is_empty() {
            return Err(ToolError::EmptyInput);
        }
        let mut results = self.backend.search(query, self.max_results).await?;
        results.truncate(self.max_results);
        tracing::debug!(
            provider = self.backend.provider_name(),
            results = results.len(),
            "web search"
        );
        Ok(format_digest(&results))
    }
}

/// Ordered set of tools keyed by unique name.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Fails if the name is already taken.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> anyhow::Result<()> {
        if self.find(tool.name()).is_some() {
            anyhow::bail!("a tool named '{}' is already registered", tool.name());
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// `name: description`, one tool per line, in registration order.
    pub fn render_descriptions(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Comma-separated tool names, in registration order.
    pub fn names(&self) -> String {
        self.tools
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web_search::{DisabledWebSearch, Snippet};

    struct Fixed(&'static str);

    #[async_trait]
    impl Tool for Fixed {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "fixed output"
        }
        async fn execute(&self, _input: &str) -> Result<String, ToolError> {
            Ok(format!("{} says hi", self.0))
        }
    }

    struct CannedSearch(Vec<Snippet>);

    #[async_trait]
    impl WebSearch for CannedSearch {
        fn provider_name(&self) -> &str {
            "canned"
        }
        async fn search(&self, _q: &str, _n: usize) -> Result<Vec<Snippet>, ToolError> {
            Ok(self.0.clone())
        }
    }

    fn snippet(title: &str) -> Snippet {
        Snippet {
            title: title.to_string(),
            url: String::new(),
            content: format!("about {}", title),
        }
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut reg = ToolRegistry::new();
        reg.register(Box::new(Fixed("a"))).unwrap();
        assert!(reg.register(Box::new(Fixed("a"))).is_err());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn descriptions_and_names_keep_order() {
        let mut reg = ToolRegistry::new();
        reg.register(Box::new(Fixed("zeta"))).unwrap();
        reg.register(Box::new(Fixed("alpha"))).unwrap();
        assert_eq!(reg.names(), "zeta, alpha");
        assert_eq!(
            reg.render_descriptions(),
            "zeta: fixed output\nalpha: fixed output"
        );
        assert!(reg.find("alpha").is_some());
        assert!(reg.find("beta").is_none());
    }

    #[tokio::test]
    async fn web_search_failure_becomes_observation() {
        let tool = WebSearchTool::new(Arc::new(DisabledWebSearch), 2);
        let obs = tool.invoke("anything").await;
        assert!(obs.starts_with("Error from web_search:"), "{}", obs);
    }

    #[tokio::test]
    async fn web_search_respects_max_results() {
        let tool = WebSearchTool::new(
            Arc::new(CannedSearch(vec![snippet("a"), snippet("b"), snippet("c")])),
            2,
        );
        let obs = tool.invoke("letters").await;
        assert!(obs.contains("[2] b"));
        assert!(!obs.contains("[3]"));
    }

    #[tokio::test]
    async fn empty_input_becomes_observation() {
        let tool = WebSearchTool::new(Arc::new(CannedSearch(vec![])), 2);
        let obs = tool.invoke("   ").await;
        assert_eq!(obs, "Error from web_search: tool input must not be empty");
    }
}
