//! End-to-end integration tests for report-drafter.
//!
//! These tests run the real pandoc binary and, for the full run, make live
//! Gemini API calls. They are gated behind the `E2E_ENABLED` environment
//! variable so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! The full run additionally needs `GEMINI_API_KEY` and a textbook PDF at
//! `test_cases/experiment.pdf`.

use report_drafter::docx::package::DOCUMENT_PART;
use report_drafter::{
    generate_report_to_archive, markdown_to_docx, DocxPackage, DraftConfig,
};
use std::io::Read;
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Route library logs to the test output (`RUST_LOG=report_drafter=debug`).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Skip this test if E2E_ENABLED is not set *or* no file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        init_tracing();
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Assert the drafted markdown passes basic quality checks.
fn assert_draft_quality(md: &str, context: &str) {
    assert!(!md.trim().is_empty(), "[{context}] Draft is empty");
    assert!(md.ends_with('\n'), "[{context}] Draft must end with a newline");

    let first_line = md.lines().next().unwrap_or("");
    assert!(
        !first_line.starts_with("```"),
        "[{context}] Draft must not start with a code fence, got: {first_line:?}"
    );
    assert!(
        md.lines().any(|l| l.starts_with('#')),
        "[{context}] Expected at least one heading (#)"
    );

    println!("[{context}] ✓  {} bytes, quality checks passed", md.len());
}

// ── Conversion (pandoc, no LLM) ──────────────────────────────────────────────

#[tokio::test]
async fn test_sample_draft_to_docx() {
    let md = e2e_skip_unless_ready!(test_cases_dir().join("draft_sample.md"));
    let out = output_dir().join("draft_sample.docx");

    let report = markdown_to_docx(&md, &out, &DraftConfig::default())
        .await
        .expect("conversion should succeed (is pandoc installed?)");

    assert!(report.paragraphs > 0, "No body paragraphs styled");
    assert_eq!(report.tables, 1, "Sample has exactly one table");

    let bytes = std::fs::read(&out).unwrap();
    let pkg = DocxPackage::from_bytes(&bytes).unwrap();
    let xml = String::from_utf8_lossy(pkg.part(DOCUMENT_PART).unwrap()).into_owned();

    // pandoc turned the math into OMML, and styling reached the runs.
    assert!(xml.contains("<m:oMath"), "No OMML math in document");
    assert!(xml.contains(r#"w:val="both""#), "No justified paragraphs");
    assert!(xml.contains("Times New Roman"), "Latin font not applied");

    println!("Styled: {report:?} → {}", out.display());
}

#[tokio::test]
async fn test_missing_pandoc_is_reported() {
    let md = e2e_skip_unless_ready!(test_cases_dir().join("draft_sample.md"));
    let config = DraftConfig::builder()
        .pandoc_path("/definitely/not/pandoc")
        .build()
        .unwrap();

    let err = markdown_to_docx(&md, output_dir().join("never.docx"), &config)
        .await
        .unwrap_err();
    assert!(
        err.to_string().contains("could not be started"),
        "unexpected error: {err}"
    );
}

// ── Full run (needs Gemini API) ──────────────────────────────────────────────

#[tokio::test]
async fn test_full_report_archive() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("experiment.pdf"));
    let Ok(key) = std::env::var("GEMINI_API_KEY") else {
        println!("SKIP — set GEMINI_API_KEY to run the live test");
        return;
    };
    let archive = output_dir().join("experiment_report.zip");

    let config = DraftConfig::builder()
        .api_key(key)
        .max_retries(2)
        .build()
        .expect("valid config");

    let stats = generate_report_to_archive(pdf.to_str().unwrap(), &archive, &config)
        .await
        .expect("report generation should succeed");

    assert!(stats.draft_chunks > 0, "Stream yielded no chunks");
    assert!(stats.ocr_duration_ms > 0);

    let mut zip = zip::ZipArchive::new(std::fs::File::open(&archive).unwrap()).unwrap();
    let mut draft = String::new();
    zip.by_name("draft.md")
        .unwrap()
        .read_to_string(&mut draft)
        .unwrap();
    assert_draft_quality(&draft, "experiment");
    assert!(zip.by_name("textbook.md").is_ok());
    assert!(zip.by_name("report.docx").is_ok());

    println!("Stats: {stats:?}");
}
