//! # Agentic RAG
//!
//! Question answering over a single document with a ReAct agent.
//!
//! A document is loaded, split into overlapping chunks, and embedded into an
//! in-memory vector index. A reasoning loop then answers questions by
//! alternating model turns with tool calls: a retrieval tool over the index
//! and, when configured, a web search tool.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌───────────┐
//! │ Extract  │──▶│  Chunk   │──▶│ Embed +   │
//! │ PDF/OOXML│   │ (window) │   │ VectorIdx │
//! └──────────┘   └──────────┘   └─────┬─────┘
//!                                     │ Retriever
//!                      ┌──────────────┴─────────────┐
//!                      ▼                            ▼
//!                ┌───────────┐    tools     ┌──────────────┐
//!                │  Session  │─────────────▶│ Agent (ReAct │
//!                │ Controller│◀─────────────│  FSM) + LLM  │
//!                └───────────┘    answer    └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy |
//! | [`extract`] | Document loading (PDF, DOCX, PPTX, text) |
//! | [`chunk`] | Sliding-window text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | In-memory vector index and retriever |
//! | [`http`] | Shared HTTP retry policy |
//! | [`llm`] | Language model providers |
//! | [`web_search`] | Web search providers |
//! | [`tools`] | Tool trait and registry |
//! | [`agent`] | ReAct reasoning loop |
//! | [`session`] | Session lifecycle |
//! | [`progress`] | Setup progress reporting |

pub mod agent;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod http;
pub mod index;
pub mod llm;
pub mod models;
pub mod progress;
pub mod session;
pub mod tools;
pub mod web_search;
