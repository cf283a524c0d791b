//! Error taxonomy for ingestion, indexing, tools, and the reasoning loop.
//!
//! Ingestion-time errors ([`LoadError`], [`EmbeddingError`],
//! [`IndexBuildError`]) are fatal to session setup and surface as a
//! [`SetupError`]. Reasoning-time errors split into recoverable ones
//! ([`ToolError`], [`ParseError`]) that the loop turns into observations,
//! and [`LlmError`], which ends the current question.

use thiserror::Error;

/// The document could not be read or parsed as its declared format.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),

    #[error("document is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),

    #[error("document is not valid UTF-8 text")]
    InvalidUtf8,

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// The embedding provider failed or returned an unusable response.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider is disabled")]
    Disabled,

    #[error("{0}")]
    Config(String),

    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} request failed: {message}")]
    Network {
        provider: &'static str,
        message: String,
    },

    #[error("invalid {provider} response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },

    #[error("local embedding failed: {0}")]
    Local(String),
}

/// The vector index could not be assembled from the embedded chunks.
#[derive(Debug, Error)]
pub enum IndexBuildError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("embedding provider returned {got} vectors for {expected} texts")]
    CountMismatch { expected: usize, got: usize },

    #[error("chunk {chunk_index} has a {got}-dimensional vector, expected {expected}")]
    DimensionMismatch {
        chunk_index: usize,
        expected: usize,
        got: usize,
    },
}

/// A session could not be created. No partial session is left active.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("invalid chunking parameters: {0}")]
    Chunking(String),

    #[error(transparent)]
    Index(#[from] IndexBuildError),

    #[error("{0}")]
    Tools(String),
}

/// A tool failed. Always recoverable: the loop sees it as an observation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool input must not be empty")]
    EmptyInput,

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] EmbeddingError),

    #[error("web search failed: {0}")]
    Search(String),
}

/// The model's output did not match the Thought/Action/Final Answer format.
///
/// The display text is what the model sees as its next observation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid Format: Missing 'Action:' after 'Thought:'")]
    MissingAction,

    #[error("Invalid Format: Missing 'Action Input:' after 'Action:'")]
    MissingActionInput,

    #[error("Invalid Format: Both a final answer and a parse-able action were returned")]
    ActionAndFinalAnswer,
}

/// The language model provider failed (network, auth, malformed response).
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{0}")]
    Config(String),

    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} request failed: {message}")]
    Network {
        provider: &'static str,
        message: String,
    },

    #[error("invalid {provider} response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

/// Failure of a single question. Rendered to text by the session controller.
#[derive(Debug, Error)]
pub enum AskError {
    #[error("Agent not initialized.")]
    NotInitialized,

    #[error(transparent)]
    Llm(#[from] LlmError),
}
