use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn pdfqa_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("pdfqa");
    path
}

/// Temp dir with a config pointing at a SQLite store inside it.
fn setup_test_env(extra: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_content = format!(
        r#"[store]
url = "sqlite:{}/data/chunks.sqlite"

[embedding]
provider = "ollama"
url = "http://127.0.0.1:1"
dims = 3

{}
"#,
        root.display(),
        extra
    );

    let config_path = root.join("pdfqa.toml");
    fs::write(&config_path, config_content).unwrap();
    (tmp, config_path)
}

/// Builds an uncompressed PDF with one Helvetica text line per page.
fn minimal_pdf(pages: &[&str]) -> Vec<u8> {
    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect();
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];
    for (i, text) in pages.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Contents {} 0 R /Resources << /Font << /F1 3 0 R >> >> >>",
            5 + 2 * i
        ));
        let content = format!("BT /F1 12 Tf 72 700 Td ({}) Tj ET", text);
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }
    let xref = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for offset in offsets {
        pdf.push_str(&format!("{:010} 00000 n \n", offset));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref
    ));
    pdf.into_bytes()
}

fn run_pdfqa(config_path: Option<&Path>, args: &[&str], env: &[(&str, &str)]) -> (String, String, bool) {
    let binary = pdfqa_binary();
    let mut cmd = Command::new(&binary);
    cmd.env_remove("MODEL")
        .env_remove("OLLAMA_URL")
        .env_remove("DB_URL");
    for (k, v) in env {
        cmd.env(k, v);
    }
    if let Some(path) = config_path {
        cmd.arg("--config").arg(path);
    }
    let output = cmd
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run pdfqa binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_init_creates_store() {
    let (tmp, config_path) = setup_test_env("");

    let (stdout, stderr, success) = run_pdfqa(Some(&config_path), &["init"], &[]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/chunks.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env("");

    let (_, _, success1) = run_pdfqa(Some(&config_path), &["init"], &[]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_pdfqa(Some(&config_path), &["init"], &[]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_db_url_env_without_config_file() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("env.sqlite");
    let url = format!("sqlite:{}", db.display());

    let (stdout, stderr, success) = run_pdfqa(None, &["init"], &[("DB_URL", &url)]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(db.exists());
}

#[test]
fn test_invalid_chunking_config_rejected() {
    let (_tmp, config_path) = setup_test_env("[chunking]\nchunk_size = 100\noverlap = 100");

    let (_, stderr, success) = run_pdfqa(Some(&config_path), &["init"], &[]);
    assert!(!success);
    assert!(stderr.contains("overlap"), "stderr: {}", stderr);
}

#[test]
fn test_extract_missing_file() {
    let (tmp, config_path) = setup_test_env("");
    let missing = tmp.path().join("nope.pdf");

    let (_, stderr, success) = run_pdfqa(
        Some(&config_path),
        &["extract", missing.to_str().unwrap()],
        &[],
    );
    assert!(!success);
    assert!(stderr.contains("document not found"), "stderr: {}", stderr);
}

#[test]
fn test_extract_prints_page_chunks() {
    let (tmp, config_path) = setup_test_env("");
    let pdf = tmp.path().join("handbook.pdf");
    fs::write(&pdf, minimal_pdf(&["Onboarding checklist for new staff"])).unwrap();

    let (stdout, stderr, success) =
        run_pdfqa(Some(&config_path), &["extract", pdf.to_str().unwrap()], &[]);
    assert!(success, "extract failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("\"filename\": \"handbook.pdf\""), "stdout: {}", stdout);
    assert!(stdout.contains("\"page_number\": 1"));
    assert!(stdout.contains("\"chunk_id\": \"1_1\""));
    assert!(stdout.contains("Onboarding"));
}

#[test]
fn test_ingest_corrupt_pdf_fails() {
    let (tmp, config_path) = setup_test_env("");
    let bad = tmp.path().join("bad.pdf");
    fs::write(&bad, b"not a valid pdf").unwrap();

    run_pdfqa(Some(&config_path), &["init"], &[]);
    let (stdout, _, success) =
        run_pdfqa(Some(&config_path), &["ingest", bad.to_str().unwrap()], &[]);
    assert!(!success);
    assert!(!stdout.contains("ok"));
}

#[test]
fn test_search_blank_query() {
    let (_tmp, config_path) = setup_test_env("");

    let (stdout, _, success) = run_pdfqa(Some(&config_path), &["search", "   "], &[]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_ask_reports_unreachable_embedding_service() {
    let (_tmp, config_path) = setup_test_env("");

    run_pdfqa(Some(&config_path), &["init"], &[]);
    let (_, stderr, success) = run_pdfqa(Some(&config_path), &["ask", "what is this?"], &[]);
    assert!(!success);
    assert!(stderr.contains("service unavailable"), "stderr: {}", stderr);
}

#[test]
fn test_unknown_persona_rejected() {
    let (_tmp, config_path) = setup_test_env("");

    let (_, _, success) = run_pdfqa(
        Some(&config_path),
        &["ask", "q", "--persona", "pirate"],
        &[],
    );
    assert!(!success);
}
