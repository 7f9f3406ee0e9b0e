//! Configuration types for an analysis job.
//!
//! Two structs, two lifetimes:
//!
//! * [`JobParams`] — *which* document to process: bucket, input key and
//!   tracking id. Required, immutable for the run, supplied per invocation.
//! * [`JobConfig`] — *how* to process it: render DPI, model identifier,
//!   response token cap, instruction text. Built via [`JobConfigBuilder`];
//!   the defaults are the values the job is deployed with.

use crate::error::JobError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Model invoked when no override is configured.
pub const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-5-sonnet-20240620-v1:0";

/// Render resolution for page images.
pub const DEFAULT_DPI: u32 = 300;

/// Response size cap sent with every request.
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Root prefix of every result object key.
pub const DEFAULT_OUTPUT_PREFIX: &str = "pdf_results";

/// Environment variable naming the bucket that holds the input PDF.
pub const ENV_INPUT_BUCKET: &str = "INPUT_BUCKET";
/// Environment variable naming the input PDF's object key.
pub const ENV_INPUT_KEY: &str = "INPUT_KEY";
/// Environment variable carrying the tracking id.
pub const ENV_TRACKING_ID: &str = "UUID";

/// The document a single invocation processes.
///
/// All three fields are non-empty; construction through [`JobParams::new`]
/// or [`JobParams::from_env`] guarantees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobParams {
    bucket: String,
    input_key: String,
    tracking_id: String,
}

impl JobParams {
    /// Validate and bind the three job parameters.
    pub fn new(
        bucket: impl Into<String>,
        input_key: impl Into<String>,
        tracking_id: impl Into<String>,
    ) -> Result<Self, JobError> {
        let params = Self {
            bucket: bucket.into(),
            input_key: input_key.into(),
            tracking_id: tracking_id.into(),
        };
        if params.bucket.trim().is_empty() {
            return Err(JobError::MissingParameter {
                name: "bucket",
                flag: "bucket",
                env: ENV_INPUT_BUCKET,
            });
        }
        if params.input_key.trim().is_empty() {
            return Err(JobError::MissingParameter {
                name: "input key",
                flag: "key",
                env: ENV_INPUT_KEY,
            });
        }
        if params.tracking_id.trim().is_empty() {
            return Err(JobError::MissingParameter {
                name: "tracking id",
                flag: "tracking-id",
                env: ENV_TRACKING_ID,
            });
        }
        Ok(params)
    }

    /// Read `INPUT_BUCKET`, `INPUT_KEY` and `UUID` from the environment.
    pub fn from_env() -> Result<Self, JobError> {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self::new(
            var(ENV_INPUT_BUCKET),
            var(ENV_INPUT_KEY),
            var(ENV_TRACKING_ID),
        )
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn input_key(&self) -> &str {
        &self.input_key
    }

    pub fn tracking_id(&self) -> &str {
        &self.tracking_id
    }
}

/// Processing settings for an analysis job.
///
/// # Example
/// ```rust
/// use edgequake_pdf_analyze::JobConfig;
///
/// let config = JobConfig::builder()
///     .dpi(200)
///     .model_id("anthropic.claude-3-haiku-20240307-v1:0")
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Render resolution in dots per inch. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// Hosted model identifier. Default: [`DEFAULT_MODEL_ID`].
    pub model_id: String,

    /// `max_tokens` sent in the request body. Default: 2048.
    pub max_tokens: u32,

    /// Instruction text override. If None, uses [`crate::prompts::DEFAULT_ANALYSIS_PROMPT`].
    pub prompt: Option<String>,

    /// Key prefix under which envelopes are written. Default: `pdf_results`.
    pub output_prefix: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            model_id: DEFAULT_MODEL_ID.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            prompt: None,
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
        }
    }
}

impl fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobConfig")
            .field("dpi", &self.dpi)
            .field("model_id", &self.model_id)
            .field("max_tokens", &self.max_tokens)
            .field("prompt", &self.prompt.as_ref().map(|p| format!("<{} chars>", p.len())))
            .field("output_prefix", &self.output_prefix)
            .finish()
    }
}

impl JobConfig {
    /// Create a new builder for `JobConfig`.
    pub fn builder() -> JobConfigBuilder {
        JobConfigBuilder {
            config: Self::default(),
        }
    }

    /// The instruction text sent ahead of the page images.
    pub fn prompt_text(&self) -> &str {
        self.prompt
            .as_deref()
            .unwrap_or(crate::prompts::DEFAULT_ANALYSIS_PROMPT)
    }
}

/// Builder for [`JobConfig`].
#[derive(Debug)]
pub struct JobConfigBuilder {
    config: JobConfig,
}

impl JobConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn model_id(mut self, model_id: impl Into<String>) -> Self {
        self.config.model_id = model_id.into();
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.output_prefix = prefix.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<JobConfig, JobError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(JobError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.model_id.trim().is_empty() {
            return Err(JobError::InvalidConfig("model id must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(JobError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.prompt.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(JobError::InvalidConfig("prompt override must not be empty".into()));
        }
        if c.output_prefix.trim_matches('/').is_empty() {
            return Err(JobError::InvalidConfig("output prefix must not be empty".into()));
        }
        Ok(self.config)
    }
}

/// Where the AWS-backed collaborators connect.
///
/// Credentials are never configured here; they come from the AWS default
/// provider chain (environment, shared profile, container/instance role).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsSettings {
    /// Region override. If None, the default chain decides (`AWS_REGION`, profile, IMDS).
    pub region: Option<String>,
    /// Custom S3 endpoint for S3-compatible stores (MinIO, LocalStack).
    pub s3_endpoint: Option<String>,
}

impl AwsSettings {
    /// Resolve the shared SDK configuration once for all AWS clients.
    pub async fn load(&self) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        loader.load().await
    }
}
