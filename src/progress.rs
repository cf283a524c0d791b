//! Session setup progress reporting.
//!
//! Reports observable progress while a document is loaded, split, and
//! embedded, so users of large documents see how much is left. Progress is
//! emitted on **stderr** so stdout stays reserved for answers.

use std::io::Write;

/// A single progress event during session setup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SetupProgressEvent {
    /// Reading and parsing the document.
    Loading { content_type: String },
    /// The document was split into this many chunks.
    Chunked { chunks: u64 },
    /// n unique chunk texts embedded out of total.
    Embedding { n: u64, total: u64 },
    /// The session is ready to answer questions.
    Ready { chunks: u64 },
}

/// Reports setup progress. Implementations write to stderr (human or JSON).
pub trait SetupProgressReporter: Send + Sync {
    fn report(&self, event: SetupProgressEvent);
}

/// Human-friendly progress on stderr: "setup  embedding  64 / 1,024 chunks".
pub struct StderrProgress;

impl SetupProgressReporter for StderrProgress {
    fn report(&self, event: SetupProgressEvent) {
        let line = match &event {
            SetupProgressEvent::Loading { content_type } => {
                format!("setup  loading {}...\n", content_type)
            }
            SetupProgressEvent::Chunked { chunks } => {
                format!("setup  split into {} chunks\n", format_number(*chunks))
            }
            SetupProgressEvent::Embedding { n, total } => format!(
                "setup  embedding  {} / {} chunks\n",
                format_number(*n),
                format_number(*total)
            ),
            SetupProgressEvent::Ready { chunks } => {
                format!("setup  ready ({} chunks indexed)\n", format_number(*chunks))
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl SetupProgressReporter for JsonProgress {
    fn report(&self, event: SetupProgressEvent) {
        let obj = match &event {
            SetupProgressEvent::Loading { content_type } => serde_json::json!({
                "event": "progress",
                "phase": "loading",
                "content_type": content_type
            }),
            SetupProgressEvent::Chunked { chunks } => serde_json::json!({
                "event": "progress",
                "phase": "chunked",
                "chunks": chunks
            }),
            SetupProgressEvent::Embedding { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "embedding",
                "n": n,
                "total": total
            }),
            SetupProgressEvent::Ready { chunks } => serde_json::json!({
                "event": "progress",
                "phase": "ready",
                "chunks": chunks
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl SetupProgressReporter for NoProgress {
    fn report(&self, _event: SetupProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Parse a `--progress` value; `auto` defers to [`default_for_tty`](Self::default_for_tty).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(Self::default_for_tty()),
            "off" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            _ => None,
        }
    }

    pub fn reporter(&self) -> Box<dyn SetupProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn parse_modes() {
        assert_eq!(ProgressMode::parse("off"), Some(ProgressMode::Off));
        assert_eq!(ProgressMode::parse("json"), Some(ProgressMode::Json));
        assert_eq!(ProgressMode::parse("loud"), None);
    }
}
