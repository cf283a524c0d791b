use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn arag_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_arag"))
}

fn setup_test_env(config_body: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_path = config_dir.join("arag.toml");
    fs::write(&config_path, config_body).unwrap();

    fs::write(
        root.join("notes.txt"),
        "Rivers of Europe include the Danube and the Rhine.\n\n\
         The capital of France is Paris.\n\n\
         Wine regions like Bordeaux are famous worldwide.",
    )
    .unwrap();

    (tmp, config_path)
}

fn run_arag(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = arag_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .arg("--progress")
        .arg("off")
        .args(args)
        .env_remove("OPENAI_API_KEY")
        .env_remove("GOOGLE_API_KEY")
        .env_remove("TAVILY_API_KEY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run arag binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

const SMALL_CHUNKS: &str = "[chunking]\nchunk_size = 40\nchunk_overlap = 10\n";

#[test]
fn test_chunks_table() {
    let (tmp, config) = setup_test_env(SMALL_CHUNKS);
    let doc = tmp.path().join("notes.txt");
    let (stdout, stderr, ok) = run_arag(&config, &["chunks", doc.to_str().unwrap()]);
    assert!(ok, "chunks failed: {}", stderr);
    // 133 characters, size 40, overlap 10: ceil(123 / 30) = 5
    assert!(stdout.contains("1 pages, 5 chunks (size 40, overlap 10)"), "{}", stdout);
    assert!(stdout.contains("#0"));
    assert!(stdout.contains("#4"));
}

#[test]
fn test_chunks_json() {
    let (tmp, config) = setup_test_env(SMALL_CHUNKS);
    let doc = tmp.path().join("notes.txt");
    let (stdout, stderr, ok) = run_arag(&config, &["chunks", doc.to_str().unwrap(), "--json"]);
    assert!(ok, "chunks --json failed: {}", stderr);

    let chunks: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let chunks = chunks.as_array().unwrap();
    assert_eq!(chunks.len(), 5);
    assert_eq!(chunks[0]["start"], 0);
    assert_eq!(chunks[1]["start"], 30);
    assert_eq!(chunks[0]["page"], 1);
}

#[test]
fn test_chunks_without_config_file_uses_defaults() {
    let (tmp, _config) = setup_test_env("");
    let doc = tmp.path().join("notes.txt");
    let missing = tmp.path().join("config/missing.toml");
    let (stdout, stderr, ok) = run_arag(&missing, &["chunks", doc.to_str().unwrap()]);
    assert!(ok, "chunks failed: {}", stderr);
    assert!(stdout.contains("1 chunks (size 5000, overlap 200)"), "{}", stdout);
}

#[test]
fn test_invalid_config_rejected() {
    let (tmp, config) = setup_test_env("[chunking]\nchunk_size = 10\nchunk_overlap = 20\n");
    let doc = tmp.path().join("notes.txt");
    let (_stdout, stderr, ok) = run_arag(&config, &["chunks", doc.to_str().unwrap()]);
    assert!(!ok);
    assert!(stderr.contains("chunk_overlap"), "{}", stderr);
}

#[test]
fn test_ask_requires_api_key() {
    let (tmp, config) = setup_test_env("[llm]\nprovider = \"openai\"\nmodel = \"gpt-4o-mini\"\n");
    let doc = tmp.path().join("notes.txt");
    let (_stdout, stderr, ok) = run_arag(
        &config,
        &["ask", doc.to_str().unwrap(), "What is the capital?"],
    );
    assert!(!ok);
    assert!(stderr.contains("OPENAI_API_KEY"), "{}", stderr);
}

#[test]
fn test_chunks_unsupported_file() {
    let (tmp, config) = setup_test_env("");
    let doc = tmp.path().join("image.png");
    fs::write(&doc, [0x89, b'P', b'N', b'G']).unwrap();
    let (_stdout, stderr, ok) = run_arag(&config, &["chunks", doc.to_str().unwrap()]);
    assert!(!ok);
    assert!(stderr.contains("unsupported content-type"), "{}", stderr);
}

#[test]
fn test_invalid_progress_mode() {
    let (tmp, config) = setup_test_env("");
    let doc = tmp.path().join("notes.txt");
    let output = Command::new(arag_binary())
        .arg("--config")
        .arg(&config)
        .args(["--progress", "loud", "chunks", doc.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid progress mode"));
}
