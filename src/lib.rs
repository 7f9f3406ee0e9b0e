//! # edgequake-pdf-analyze
//!
//! Analyse a stored PDF with a hosted vision model and persist the result.
//!
//! One invocation processes exactly one document, identified by a bucket, an
//! object key and a caller-supplied tracking id, and always leaves exactly one
//! JSON result envelope behind, whether the analysis succeeded or not.
//!
//! ## Pipeline Overview
//!
//! ```text
//! s3://bucket/key
//!  │
//!  ├─ 1. Fetch    read PDF bytes from object storage
//!  ├─ 2. Render   rasterise every page at 300 DPI via pdfium (spawn_blocking)
//!  ├─ 3. Encode   PNG → base64
//!  ├─ 4. Request  one user message: instruction + all pages, in order
//!  ├─ 5. Invoke   Bedrock InvokeModel, response decoded as JSON
//!  └─ 6. Write    envelope → pdf_results/<tracking id>/<stem>_results.json
//! ```
//!
//! A failure in steps 1–5 becomes a FAILED envelope that still goes through
//! step 6. Only a failure in step 6 is returned as `Err`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf_analyze::{AnalysisJob, AwsSettings, JobConfig, JobParams};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // INPUT_BUCKET, INPUT_KEY and UUID
//!     let params = JobParams::from_env()?;
//!     let job = AnalysisJob::from_aws(JobConfig::default(), &AwsSettings::default()).await;
//!     let report = job.run(&params).await?;
//!     eprintln!("{:?} → s3://{}/{}", report.envelope.status, report.bucket, report.output_key);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-analyze` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AwsSettings, JobConfig, JobConfigBuilder, JobParams};
pub use error::{JobError, StorageError};
pub use job::{run_blocking, AnalysisJob, JobStage};
pub use output::{output_key, JobReport, JobStatus, Outcome, ResultEnvelope};
pub use pipeline::encode::PageImage;
pub use pipeline::invoke::{BedrockInferenceClient, InferenceClient};
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer};
pub use pipeline::request::InferenceRequest;
pub use storage::{LocalObjectStore, ObjectStore, S3ObjectStore};
