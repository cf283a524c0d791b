//! Session lifecycle: one document, one index, one agent.
//!
//! A [`SessionController`] starts empty. [`setup`](SessionController::setup)
//! loads a document, splits and embeds it, registers the tools, and makes
//! the result the active session. [`ask`](SessionController::ask) runs one
//! question through the reasoning loop against that session and always
//! returns text. [`reset`](SessionController::reset) drops the session and
//! everything it owns.
//!
//! ```text
//!   ┌──────────┐  setup ok   ┌────────┐
//!   │  Empty   │ ──────────▶ │ Active │ ◀─┐ ask
//!   └──────────┘             └────────┘ ──┘
//!        ▲   reset / setup failure │
//!        └─────────────────────────┘
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::agent::{AgentExecutor, Transcript};
use crate::chunk;
use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::error::{AskError, SetupError};
use crate::extract;
use crate::index::VectorIndex;
use crate::llm::{create_llm, LanguageModel};
use crate::models::{Document, Message};
use crate::progress::{NoProgress, SetupProgressEvent, SetupProgressReporter};
use crate::tools::{RetrievalTool, ToolRegistry, WebSearchTool};
use crate::web_search::{create_web_search, WebSearch};

/// First assistant message of every new session.
pub const GREETING: &str = "I've analyzed document. How can I help you today?";

/// Text shown for a failed question.
pub fn describe_ask_error(err: &AskError) -> String {
    match err {
        AskError::NotInitialized => format!("Error: {}", err),
        AskError::Llm(e) => format!("Error when generating an answer: {}", e),
    }
}

/// Text shown for a failed setup.
pub fn describe_setup_error(err: &SetupError) -> String {
    format!("Error during setup: {}", err)
}

/// Everything derived from one document.
pub struct AgentSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    content_type: String,
    index: Arc<VectorIndex>,
    tools: ToolRegistry,
    history: Vec<Message>,
}

impl AgentSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }
}

/// Owns the active session and the long-lived provider handles.
pub struct SessionController {
    config: Config,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LanguageModel>,
    web_search: Option<Arc<dyn WebSearch>>,
    progress: Box<dyn SetupProgressReporter>,
    active: Option<AgentSession>,
}

impl SessionController {
    /// Build providers from configuration. API keys are read from the
    /// environment here, so a missing key fails before any document is read.
    pub fn from_config(
        config: Config,
        progress: Box<dyn SetupProgressReporter>,
    ) -> anyhow::Result<Self> {
        let embedder: Arc<dyn Embedder> = Arc::from(
            create_embedder(&config.embedding).context("Failed to create embedding provider")?,
        );
        let llm: Arc<dyn LanguageModel> =
            Arc::from(create_llm(&config.llm).context("Failed to create language model")?);
        let web_search: Option<Arc<dyn WebSearch>> = if config.web_search.enabled {
            Some(Arc::from(
                create_web_search(&config.web_search)
                    .context("Failed to create web search provider")?,
            ))
        } else {
            None
        };

        tracing::info!(
            embedder = embedder.model_name(),
            llm = llm.model_name(),
            web_search = web_search.as_ref().map(|w| w.provider_name()),
            "session controller ready"
        );

        Ok(Self {
            config,
            embedder,
            llm,
            web_search,
            progress,
            active: None,
        })
    }

    /// Assemble a controller from ready-made providers.
    pub fn with_components(
        config: Config,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            config,
            embedder,
            llm,
            web_search: None,
            progress: Box::new(NoProgress),
            active: None,
        }
    }

    /// Register a web search backend for sessions created from now on.
    /// Ignored unless `[web_search] enabled` is set.
    pub fn with_web_search(mut self, backend: Arc<dyn WebSearch>) -> Self {
        self.web_search = Some(backend);
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn SetupProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the active session with one built from in-memory bytes.
    ///
    /// Any previous session is dropped first; on failure no session is
    /// active.
    pub async fn setup(&mut self, bytes: Vec<u8>, content_type: &str) -> Result<(), SetupError> {
        self.active = None;
        self.progress.report(SetupProgressEvent::Loading {
            content_type: content_type.to_string(),
        });
        let document =
            extract::load_bytes(bytes, content_type, self.config.ingest.max_document_bytes)?;
        self.install(document).await
    }

    /// Like [`setup`](Self::setup), reading the document from disk.
    pub async fn setup_path(&mut self, path: &Path) -> Result<(), SetupError> {
        self.active = None;
        self.progress.report(SetupProgressEvent::Loading {
            content_type: extract::content_type_for_path(path)
                .unwrap_or("unknown")
                .to_string(),
        });
        let document = extract::load(path, self.config.ingest.max_document_bytes)?;
        self.install(document).await
    }

    async fn install(&mut self, document: Document) -> Result<(), SetupError> {
        let session = self.build_session(document).await?;
        tracing::info!(
            session = %session.id,
            chunks = session.index.len(),
            tools = %session.tools.names(),
            "session ready"
        );
        self.active = Some(session);
        Ok(())
    }

    async fn build_session(&self, document: Document) -> Result<AgentSession, SetupError> {
        if document.is_blank() {
            tracing::warn!(
                content_type = %document.content_type,
                "document has no extractable text"
            );
        }

        let chunks = chunk::split(
            &document.pages,
            self.config.chunking.chunk_size,
            self.config.chunking.chunk_overlap,
        )?;
        self.progress.report(SetupProgressEvent::Chunked {
            chunks: chunks.len() as u64,
        });

        let index = VectorIndex::build_with_progress(
            chunks,
            self.embedder.as_ref(),
            self.config.embedding.batch_size,
            &*self.progress,
        )
        .await?;
        let index = Arc::new(index);

        let mut tools = ToolRegistry::new();
        let retriever = index.as_retriever(Arc::clone(&self.embedder), self.config.retrieval.top_k);
        tools
            .register(Box::new(RetrievalTool::new(
                self.config.agent.retrieval_tool_name.clone(),
                self.config.agent.retrieval_tool_description.clone(),
                retriever,
            )))
            .map_err(|e| SetupError::Tools(e.to_string()))?;
        if self.config.web_search.enabled {
            if let Some(backend) = &self.web_search {
                tools
                    .register(Box::new(WebSearchTool::new(
                        Arc::clone(backend),
                        self.config.web_search.max_results,
                    )))
                    .map_err(|e| SetupError::Tools(e.to_string()))?;
            }
        }

        self.progress.report(SetupProgressEvent::Ready {
            chunks: index.len() as u64,
        });

        Ok(AgentSession {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            content_type: document.content_type,
            index,
            tools,
            history: vec![Message::assistant(GREETING)],
        })
    }

    /// Drop the active session, if any.
    pub fn reset(&mut self) {
        if let Some(session) = self.active.take() {
            tracing::info!(session = %session.id, "session reset");
        }
    }

    /// Answer one question. Failures come back as display text.
    pub async fn ask(&mut self, query: &str) -> String {
        match self.ask_with_transcript(query).await {
            Ok((answer, _)) => answer,
            Err(e) => describe_ask_error(&e),
        }
    }

    /// Answer one question, also returning the reasoning steps.
    ///
    /// Both the question and the reply (or the failure text) are recorded
    /// in the session history.
    pub async fn ask_with_transcript(
        &mut self,
        query: &str,
    ) -> Result<(String, Transcript), AskError> {
        let max_iterations = self.config.agent.max_iterations;
        let session = self.active.as_mut().ok_or(AskError::NotInitialized)?;
        session.history.push(Message::user(query));

        let executor = AgentExecutor::new(self.llm.as_ref(), &session.tools, max_iterations);
        match executor.run_with_transcript(query).await {
            Ok((outcome, transcript)) => {
                let answer = outcome.into_text();
                session.history.push(Message::assistant(answer.clone()));
                Ok((answer, transcript))
            }
            Err(e) => {
                let err = AskError::from(e);
                tracing::warn!(session = %session.id, error = %err, "question failed");
                session
                    .history
                    .push(Message::assistant(describe_ask_error(&err)));
                Err(err)
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn session(&self) -> Option<&AgentSession> {
        self.active.as_ref()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.active.as_ref().map(|s| s.id)
    }

    /// Messages of the active session; empty when there is none.
    pub fn history(&self) -> &[Message] {
        self.active.as_ref().map(|s| s.history()).unwrap_or(&[])
    }
}
