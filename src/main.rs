//! # Agentic RAG CLI (`arag`)
//!
//! Ask questions about a single document. The document is split, embedded
//! into an in-memory index, and a ReAct agent answers by calling a
//! retrieval tool (and optionally web search).
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `arag ask <document> "<question>"` | One-shot answer |
//! | `arag chat <document>` | Interactive session over stdin |
//! | `arag chunks <document>` | Show how the document is split, without embedding |
//!
//! ## Examples
//!
//! ```bash
//! export GOOGLE_API_KEY=...
//! arag ask ./report.pdf "What was the revenue in Q3?"
//!
//! # Verbose: print every Thought/Action/Observation step
//! arag ask ./report.pdf "Who wrote this?" --verbose
//!
//! # Chat, with machine-readable setup progress
//! arag chat ./slides.pptx --progress json
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `agentic_rag=info`).

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use agentic_rag::agent::Transcript;
use agentic_rag::config::{self, Config};
use agentic_rag::models::Role;
use agentic_rag::progress::ProgressMode;
use agentic_rag::session::{describe_ask_error, describe_setup_error, SessionController};
use agentic_rag::{chunk, extract};

/// Agentic RAG: question answering over one document with a ReAct agent.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file is missing, built-in defaults are used.
#[derive(Parser)]
#[command(name = "arag", version, about = "Ask questions about a document")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/arag.toml")]
    config: PathBuf,

    /// Setup progress on stderr: `auto` (human when stderr is a TTY), `off`,
    /// `human`, or `json`.
    #[arg(long, global = true, default_value = "auto", value_parser = parse_progress)]
    progress: ProgressMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one question about a document.
    Ask {
        /// PDF, DOCX, PPTX, Markdown, or plain-text file.
        document: PathBuf,

        /// The question.
        question: String,

        /// Print the agent's reasoning steps to stderr.
        #[arg(long)]
        verbose: bool,
    },

    /// Start an interactive session.
    ///
    /// Type a question per line. `/new <path>` loads another document,
    /// `/reset` ends the session, `/history` prints the conversation and
    /// `/quit` exits.
    Chat {
        document: PathBuf,

        /// Print the agent's reasoning steps to stderr.
        #[arg(long)]
        verbose: bool,
    },

    /// Print the chunk plan for a document.
    Chunks {
        document: PathBuf,

        /// Emit chunks as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

fn parse_progress(s: &str) -> Result<ProgressMode, String> {
    ProgressMode::parse(s)
        .ok_or_else(|| format!("invalid progress mode '{}': use auto, off, human, or json", s))
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("agentic_rag=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Ask {
            document,
            question,
            verbose,
        } => {
            let mut controller = SessionController::from_config(cfg, cli.progress.reporter())?;
            if let Err(e) = controller.setup_path(&document).await {
                anyhow::bail!(describe_setup_error(&e));
            }
            println!("{}", ask(&mut controller, &question, verbose).await);
        }
        Commands::Chat { document, verbose } => {
            let mut controller = SessionController::from_config(cfg, cli.progress.reporter())?;
            run_chat(&mut controller, &document, verbose).await?;
        }
        Commands::Chunks { document, json } => {
            print_chunks(&cfg, &document, json)?;
        }
    }

    Ok(())
}

async fn ask(controller: &mut SessionController, question: &str, verbose: bool) -> String {
    if !verbose {
        return controller.ask(question).await;
    }
    match controller.ask_with_transcript(question).await {
        Ok((answer, transcript)) => {
            print_transcript(&transcript);
            answer
        }
        Err(e) => describe_ask_error(&e),
    }
}

fn print_transcript(transcript: &Transcript) {
    for (i, step) in transcript.steps().iter().enumerate() {
        eprintln!("── step {} ──", i + 1);
        if !step.thought().is_empty() {
            eprintln!("Thought: {}", step.thought());
        }
        eprintln!("Action: {}", step.action);
        eprintln!("Action Input: {}", step.action_input);
        eprintln!("Observation: {}", step.observation);
    }
}

async fn load(controller: &mut SessionController, document: &Path) {
    match controller.setup_path(document).await {
        Ok(()) => {
            if let Some(greeting) = controller.history().first() {
                println!("{}", greeting.content);
            }
        }
        Err(e) => println!("{}", describe_setup_error(&e)),
    }
}

async fn run_chat(
    controller: &mut SessionController,
    document: &Path,
    verbose: bool,
) -> anyhow::Result<()> {
    load(controller, document).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit", _) | ("/exit", _) => break,
            ("/reset", _) => {
                controller.reset();
                println!("Session cleared. Load a document with /new <path>.");
            }
            ("/new", path) if !path.trim().is_empty() => {
                load(controller, Path::new(path.trim())).await;
            }
            ("/new", _) => println!("Usage: /new <path>"),
            ("/history", _) => {
                for message in controller.history() {
                    let role = match message.role {
                        Role::User => "you",
                        Role::Assistant => "agent",
                    };
                    println!(
                        "[{}] {}: {}",
                        message.at.format("%H:%M:%S"),
                        role,
                        message.content
                    );
                }
            }
            _ => println!("{}", ask(controller, line, verbose).await),
        }
    }
    Ok(())
}

fn print_chunks(cfg: &Config, document: &Path, json: bool) -> anyhow::Result<()> {
    let doc = extract::load(document, cfg.ingest.max_document_bytes)
        .with_context(|| format!("Failed to load {}", document.display()))?;
    let chunks = chunk::split(
        &doc.pages,
        cfg.chunking.chunk_size,
        cfg.chunking.chunk_overlap,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }

    println!(
        "{}: {} pages, {} chunks (size {}, overlap {})",
        document.display(),
        doc.pages.len(),
        chunks.len(),
        cfg.chunking.chunk_size,
        cfg.chunking.chunk_overlap
    );
    for c in &chunks {
        println!(
            "  #{:<4} page {:<4} chars {:>8}..{:<8} {}",
            c.index,
            c.page,
            c.start,
            c.end,
            &c.hash[..12]
        );
    }
    Ok(())
}
