//! Core data models shared by the ingestion, retrieval, and session layers.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A loaded document: original bytes plus the text of each page.
///
/// Immutable once constructed by [`crate::extract`].
#[derive(Debug, Clone)]
pub struct Document {
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub pages: Vec<String>,
}

impl Document {
    /// True when no page carries any non-whitespace text.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }
}

/// A span of document text produced by the splitter.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    pub id: String,
    /// Position in the document's chunk sequence, starting at 0.
    pub index: usize,
    pub text: String,
    /// Character offset (inclusive) into the concatenated page text.
    pub start: usize,
    /// Character offset (exclusive) into the concatenated page text.
    pub end: usize,
    /// 1-based page holding the chunk's first character.
    pub page: usize,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

/// One ranked result from a vector index query.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub score: f32,
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A turn in the session's message history.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            at: Utc::now(),
        }
    }
}
