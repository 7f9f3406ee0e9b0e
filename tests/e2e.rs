//! End-to-end tests against a real pdfium library (and, optionally, AWS).
//!
//! Gated behind `E2E_ENABLED` so they do not run in CI unless explicitly
//! requested. The pdfium library is taken from `PDFIUM_LIB_PATH` or the
//! system search path.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/opt/pdfium/lib cargo test --test e2e -- --nocapture
//!
//! The live Bedrock test additionally needs `E2E_BEDROCK=1` and AWS credentials.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_pdf_analyze::{
    AnalysisJob, AwsSettings, BedrockInferenceClient, InferenceClient, InferenceRequest,
    JobConfig, JobError, JobParams, JobStatus, LocalObjectStore, PageRasterizer,
    PdfiumRasterizer,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let _ = tracing_subscriber::fmt()
            .with_env_filter("edgequake_pdf_analyze=debug")
            .with_test_writer()
            .try_init();
    }};
}

/// A minimal two-page PDF, one inch square per page.
///
/// Page 1 is blank (white), page 2 is filled black, so the rendered order can
/// be checked from pixel values alone.
fn two_page_pdf() -> Vec<u8> {
    let fill = "0 0 0 rg 0 0 72 72 re f";
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 72 72] >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 72 72] /Contents 5 0 R >>".to_string(),
        format!("<< /Length {} >>\nstream\n{}\nendstream", fill.len(), fill),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_at = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for off in offsets {
        xref.push_str(&format!("{:010} 00000 n \n", off));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    ));
    pdf.extend_from_slice(xref.as_bytes());
    pdf
}

/// Mean luma of a PNG.
fn mean_luma(png: &[u8]) -> f64 {
    let img = image::load_from_memory(png).expect("valid PNG").to_luma8();
    let sum: u64 = img.pixels().map(|p| p.0[0] as u64).sum();
    sum as f64 / (img.width() * img.height()) as f64
}

/// Model double that keeps the request it was sent.
#[derive(Default)]
struct RecordingModel {
    last: Mutex<Option<InferenceRequest>>,
}

#[async_trait]
impl InferenceClient for RecordingModel {
    async fn invoke(&self, _model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, JobError> {
        let request: InferenceRequest = serde_json::from_slice(&body).expect("request JSON");
        *self.last.lock().unwrap() = Some(request);
        Ok(serde_json::to_vec(&json!({"content": [{"type": "text", "text": "ok"}]})).unwrap())
    }
}

// ── Rendering (pdfium, no network) ───────────────────────────────────────────

#[test]
fn test_render_two_pages_in_order() {
    e2e_skip_unless_enabled!();

    let pages = PdfiumRasterizer::from_env()
        .render(&two_page_pdf(), 300)
        .expect("render should succeed");

    assert_eq!(pages.len(), 2, "one image per page");

    let first = image::load_from_memory(&pages[0]).unwrap();
    // 1 inch at 300 DPI
    assert_eq!((first.width(), first.height()), (300, 300));

    let (white, black) = (mean_luma(&pages[0]), mean_luma(&pages[1]));
    println!("page luma: {white:.1} / {black:.1}");
    assert!(white > 200.0, "page 1 should be blank, luma {white}");
    assert!(black < 50.0, "page 2 should be filled, luma {black}");
}

#[test]
fn test_render_lower_dpi_scales_down() {
    e2e_skip_unless_enabled!();

    let pages = PdfiumRasterizer::from_env()
        .render(&two_page_pdf(), 72)
        .expect("render should succeed");
    let img = image::load_from_memory(&pages[1]).unwrap();
    assert_eq!((img.width(), img.height()), (72, 72));
}

#[test]
fn test_render_truncated_pdf_fails() {
    e2e_skip_unless_enabled!();

    let mut pdf = two_page_pdf();
    pdf.truncate(20);
    let err = PdfiumRasterizer::from_env().render(&pdf, 300).unwrap_err();
    assert_eq!(err.kind(), "RasterizationError");
}

// ── Whole job on local storage ───────────────────────────────────────────────

#[tokio::test]
async fn test_job_local_store_real_render() {
    e2e_skip_unless_enabled!();

    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("docs/documents")).unwrap();
    std::fs::write(root.path().join("docs/documents/sample.pdf"), two_page_pdf()).unwrap();

    let model = Arc::new(RecordingModel::default());
    let job = AnalysisJob::new(
        Arc::new(LocalObjectStore::new(root.path())),
        Arc::new(PdfiumRasterizer::from_env()),
        model.clone(),
        JobConfig::default(),
    );
    let params = JobParams::new("docs", "documents/sample.pdf", "123456").unwrap();

    let report = job.run(&params).await.expect("envelope written");
    assert_eq!(report.envelope.status, JobStatus::Success);

    let written = root
        .path()
        .join("docs/pdf_results/123456/sample_results.json");
    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&written).unwrap()).unwrap();
    assert_eq!(stored["status"], "SUCCESS");
    assert_eq!(stored["pdf_key"], "documents/sample.pdf");

    let request = model.last.lock().unwrap().clone().expect("model was called");
    let images: Vec<Vec<u8>> = request
        .images()
        .map(|b64| STANDARD.decode(b64).unwrap())
        .collect();
    assert_eq!(images.len(), 2);
    assert!(mean_luma(&images[0]) > mean_luma(&images[1]));
}

// ── Live Bedrock (needs credentials) ─────────────────────────────────────────

#[tokio::test]
async fn test_job_live_bedrock() {
    e2e_skip_unless_enabled!();
    if std::env::var("E2E_BEDROCK").is_err() {
        println!("SKIP — set E2E_BEDROCK=1 to call Bedrock");
        return;
    }

    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("docs")).unwrap();
    std::fs::write(root.path().join("docs/memo.pdf"), two_page_pdf()).unwrap();

    let shared = AwsSettings::default().load().await;
    let job = AnalysisJob::new(
        Arc::new(LocalObjectStore::new(root.path())),
        Arc::new(PdfiumRasterizer::from_env()),
        Arc::new(BedrockInferenceClient::from_sdk_config(&shared)),
        JobConfig::default(),
    );
    let params = JobParams::new("docs", "memo.pdf", "live").unwrap();

    let report = job.run(&params).await.expect("envelope written");
    println!("{}", report.envelope.to_json().unwrap());
    assert!(
        report.envelope.is_success(),
        "error_type: {:?}",
        report.envelope.error_type()
    );
    assert!(report.envelope.analysis_results().unwrap()["content"].is_array());
}
