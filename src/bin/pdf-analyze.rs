//! CLI binary for edgequake-pdf-analyze.
//!
//! A thin shim over the library crate that binds flags/environment to
//! `JobParams` + `JobConfig`, runs one job, and reports where the envelope went.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf_analyze::{
    AnalysisJob, AwsSettings, JobConfig, JobParams, JobStatus, LocalObjectStore,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Batch-style: everything from the environment
  INPUT_BUCKET=my-docs INPUT_KEY=documents/sample.pdf UUID=123456 pdf-analyze
  # → s3://my-docs/pdf_results/123456/sample_results.json

  # Explicit flags, print the envelope
  pdf-analyze --bucket my-docs --key documents/sample.pdf --tracking-id 123456 --json

  # Local directory instead of S3 (reads ./data/my-docs/documents/sample.pdf)
  pdf-analyze --local-root ./data --bucket my-docs --key documents/sample.pdf --tracking-id t1

ENVIRONMENT VARIABLES:
  INPUT_BUCKET            Bucket holding the input PDF (results are written there too)
  INPUT_KEY               Object key of the input PDF
  UUID                    Tracking id namespacing the result
  AWS_REGION              Region for S3 and Bedrock (or use --region)
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory); else the system library
  RUST_LOG                Overrides the log filter (e.g. edgequake_pdf_analyze=debug)

EXIT STATUS:
  0  an envelope was written (SUCCESS or FAILED; see its status)
  1  invalid parameters, or the envelope could not be written
"#;

/// Analyse one stored PDF with a hosted vision model and persist the result envelope.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-analyze",
    version,
    about = "Analyse one stored PDF with a hosted vision model",
    long_about = "Fetch a PDF from object storage, render every page at 300 DPI, send all \
pages in one multimodal request to an Amazon Bedrock model, and write a JSON result \
envelope to pdf_results/<tracking id>/<name>_results.json in the same bucket.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Bucket holding the input PDF.
    #[arg(long, env = "INPUT_BUCKET")]
    bucket: Option<String>,

    /// Object key of the input PDF.
    #[arg(long, env = "INPUT_KEY")]
    key: Option<String>,

    /// Tracking id used to namespace the result.
    #[arg(long, env = "UUID")]
    tracking_id: Option<String>,

    /// Bedrock model identifier.
    #[arg(long, env = "PDF_ANALYZE_MODEL", default_value = edgequake_pdf_analyze::config::DEFAULT_MODEL_ID)]
    model: String,

    /// AWS region for S3 and Bedrock.
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Custom S3 endpoint (MinIO, LocalStack).
    #[arg(long, env = "PDF_ANALYZE_S3_ENDPOINT")]
    s3_endpoint: Option<String>,

    /// Use a local directory tree (<root>/<bucket>/<key>) instead of S3.
    #[arg(long, env = "PDF_ANALYZE_LOCAL_ROOT")]
    local_root: Option<PathBuf>,

    /// Rendering DPI (72–600).
    #[arg(long, env = "PDF_ANALYZE_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Path to a text file containing a custom instruction.
    #[arg(long, env = "PDF_ANALYZE_PROMPT")]
    prompt: Option<PathBuf>,

    /// Print the result envelope as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Bind parameters ──────────────────────────────────────────────────
    let params = JobParams::new(
        cli.bucket.clone().unwrap_or_default(),
        cli.key.clone().unwrap_or_default(),
        cli.tracking_id.clone().unwrap_or_default(),
    )
    .context("Invalid job parameters")?;

    let config = build_config(&cli).await?;

    let aws = AwsSettings {
        region: cli.region.clone(),
        s3_endpoint: cli.s3_endpoint.clone(),
    };
    let mut job = AnalysisJob::from_aws(config, &aws).await;
    if let Some(ref root) = cli.local_root {
        job = job.with_store(Arc::new(LocalObjectStore::new(root)));
    }
    tracing::debug!("Job configuration: {:?}", job.config());

    // ── Run ──────────────────────────────────────────────────────────────
    let report = job.run(&params).await.context("Result envelope was not stored")?;

    if cli.json {
        let json = report
            .envelope
            .to_json()
            .context("Failed to serialise envelope")?;
        println!("{json}");
    }

    if !cli.quiet {
        let marker = match report.envelope.status {
            JobStatus::Success => "✔",
            JobStatus::Failed => "✘",
        };
        eprintln!(
            "{marker} {:?}  →  s3://{}/{}",
            report.envelope.status, report.bucket, report.output_key
        );
        if let Some(kind) = report.envelope.error_type() {
            eprintln!("   error_type: {kind}");
        }
    }

    Ok(())
}

/// Map CLI args to `JobConfig`.
async fn build_config(cli: &Cli) -> Result<JobConfig> {
    let mut builder = JobConfig::builder().dpi(cli.dpi).model_id(&cli.model);

    if let Some(ref path) = cli.prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt.trim());
    }

    builder.build().context("Invalid configuration")
}
