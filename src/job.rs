//! Job orchestration: fetch → rasterise → build → invoke → write.
//!
//! ## Every run ends in an envelope
//!
//! The four processing stages are composed with `?` inside
//! [`AnalysisJob::analyze`], which yields one `Result`. [`AnalysisJob::run`]
//! turns that result into a SUCCESS or FAILED [`ResultEnvelope`] and always
//! hands it to the writer. Only a failure of the writer itself reaches the
//! caller as `Err`.
//!
//! ## Collaborators are injected
//!
//! Storage, rasteriser and model client are trait objects owned by the job.
//! Production code wires AWS and pdfium via [`AnalysisJob::from_aws`]; tests
//! pass in-memory doubles through [`AnalysisJob::new`].

use crate::config::{AwsSettings, JobConfig, JobParams};
use crate::error::JobError;
use crate::output::{output_key, JobReport, ResultEnvelope};
use crate::pipeline::invoke::{self, BedrockInferenceClient, InferenceClient};
use crate::pipeline::render::{self, PageRasterizer, PdfiumRasterizer};
use crate::pipeline::{fetch, persist, request};
use crate::storage::{ObjectStore, S3ObjectStore};
use chrono::{DateTime, FixedOffset, Local};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Last stage a run completed. Used for failure diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Start,
    Fetched,
    Rasterized,
    RequestBuilt,
    Invoked,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStage::Start => "START",
            JobStage::Fetched => "FETCHED",
            JobStage::Rasterized => "RASTERIZED",
            JobStage::RequestBuilt => "REQUEST_BUILT",
            JobStage::Invoked => "INVOKED",
        };
        f.write_str(name)
    }
}

/// A configured analysis job with its collaborators.
#[derive(Clone)]
pub struct AnalysisJob {
    store: Arc<dyn ObjectStore>,
    rasterizer: Arc<dyn PageRasterizer>,
    inference: Arc<dyn InferenceClient>,
    config: JobConfig,
}

impl fmt::Debug for AnalysisJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisJob")
            .field("store", &"<dyn ObjectStore>")
            .field("rasterizer", &"<dyn PageRasterizer>")
            .field("inference", &"<dyn InferenceClient>")
            .field("config", &self.config)
            .finish()
    }
}

impl AnalysisJob {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        rasterizer: Arc<dyn PageRasterizer>,
        inference: Arc<dyn InferenceClient>,
        config: JobConfig,
    ) -> Self {
        Self {
            store,
            rasterizer,
            inference,
            config,
        }
    }

    /// Production wiring: S3 storage, Bedrock inference, pdfium rendering
    /// (honouring `PDFIUM_LIB_PATH`).
    pub async fn from_aws(config: JobConfig, aws: &AwsSettings) -> Self {
        let shared = aws.load().await;
        Self::new(
            Arc::new(S3ObjectStore::from_sdk_config(&shared, aws.s3_endpoint.as_deref())),
            Arc::new(PdfiumRasterizer::from_env()),
            Arc::new(BedrockInferenceClient::from_sdk_config(&shared)),
            config,
        )
    }

    /// Replace the storage backend, keeping the other collaborators.
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = store;
        self
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Process one document and persist its result envelope.
    ///
    /// # Returns
    /// `Ok(JobReport)` whenever the envelope was written, including runs whose
    /// envelope records a failure (check `report.envelope.status`).
    ///
    /// # Errors
    /// Only [`JobError::Persist`]: the envelope could not be stored.
    pub async fn run(&self, params: &JobParams) -> Result<JobReport, JobError> {
        let started = Local::now().fixed_offset();
        let clock = Instant::now();
        info!(
            "Starting analysis of s3://{}/{} (tracking id {})",
            params.bucket(),
            params.input_key(),
            params.tracking_id()
        );

        let mut stage = JobStage::Start;
        let outcome = self.analyze(params, &mut stage).await;
        let finished = finish_time(&started, clock.elapsed());

        let envelope = match outcome {
            Ok(analysis) => ResultEnvelope::success(params.input_key(), &started, &finished, analysis),
            Err(e) => {
                error!(
                    "Error processing PDF {} after {} ({}): {}",
                    params.input_key(),
                    stage,
                    e.kind(),
                    e
                );
                ResultEnvelope::failure(params.input_key(), &started, &finished, &e)
            }
        };

        let key = output_key(
            &self.config.output_prefix,
            params.tracking_id(),
            params.input_key(),
        );
        if let Err(e) =
            persist::write_envelope(self.store.as_ref(), params.bucket(), &key, &envelope).await
        {
            error!("Result envelope was not stored: {}", e);
            return Err(e);
        }

        info!(
            "Processing complete: {:?} in {}ms → s3://{}/{}",
            envelope.status,
            clock.elapsed().as_millis(),
            params.bucket(),
            key
        );

        Ok(JobReport {
            bucket: params.bucket().to_string(),
            output_key: key,
            envelope,
        })
    }

    /// The processing stages, advancing `stage` as each one completes.
    async fn analyze(
        &self,
        params: &JobParams,
        stage: &mut JobStage,
    ) -> Result<serde_json::Value, JobError> {
        let pdf = fetch::fetch_document(self.store.as_ref(), params).await?;
        *stage = JobStage::Fetched;

        let pages = render::rasterize(Arc::clone(&self.rasterizer), pdf, self.config.dpi).await?;
        *stage = JobStage::Rasterized;

        let request = request::build_request(pages, &self.config)?;
        *stage = JobStage::RequestBuilt;

        let analysis =
            invoke::invoke(self.inference.as_ref(), &self.config.model_id, &request).await?;
        *stage = JobStage::Invoked;

        Ok(analysis)
    }
}

/// End time of a run: `started` advanced by the monotonic elapsed time.
///
/// Stays in the start's offset so a clock step or DST change during the run
/// cannot make the recorded end precede the start.
fn finish_time(started: &DateTime<FixedOffset>, elapsed: Duration) -> DateTime<FixedOffset> {
    chrono::Duration::from_std(elapsed)
        .ok()
        .and_then(|d| started.checked_add_signed(d))
        .unwrap_or(*started)
}

/// Synchronous wrapper around [`AnalysisJob::run`].
///
/// Creates a Tokio runtime internally; do not call from within one.
pub fn run_blocking(job: &AnalysisJob, params: &JobParams) -> Result<JobReport, JobError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| JobError::Processing(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(job.run(params))
}
