//! Error types for the edgequake-pdf-analyze library.
//!
//! Two error types reflect two layers:
//!
//! * [`JobError`] — a pipeline failure. Errors from the fetch, rasterise,
//!   build and invoke stages are recorded in a FAILED
//!   [`crate::output::ResultEnvelope`]; [`JobError::Persist`] and the
//!   configuration variants are returned to the caller because there is no
//!   envelope to put them in.
//!
//! * [`StorageError`] — what an [`crate::storage::ObjectStore`] backend
//!   reports. The fetcher and the result writer wrap it with the bucket/key
//!   they were working on.
//!
//! Each [`JobError`] has a stable [`JobError::kind`] string that ends up in
//! the envelope's `error_type` field.

use thiserror::Error;

/// All errors produced while running an analysis job.
#[derive(Debug, Error)]
pub enum JobError {
    // ── Configuration errors (raised before the pipeline starts) ──────────
    /// A required job parameter was absent or empty.
    #[error("Missing job parameter '{name}'\nSet it with --{flag} or the {env} environment variable.")]
    MissingParameter {
        name: &'static str,
        flag: &'static str,
        env: &'static str,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pipeline stage errors ─────────────────────────────────────────────
    /// The PDF could not be read from storage, or the object was empty.
    #[error("Failed to fetch 's3://{bucket}/{key}': {reason}")]
    Fetch {
        bucket: String,
        key: String,
        reason: String,
    },

    /// The bytes are not a PDF, pdfium is unavailable, or a page failed to render.
    #[error("Rasterisation failed: {detail}")]
    Rasterization { detail: String },

    /// No inference request could be built (e.g. the document has no pages).
    #[error("Failed to build inference request: {0}")]
    RequestBuild(String),

    /// The model call failed or its response was not valid JSON.
    #[error("Inference call to '{model_id}' failed: {detail}")]
    Invocation { model_id: String, detail: String },

    /// Writing the result envelope failed. Never captured in an envelope.
    #[error("Failed to write results to 's3://{bucket}/{key}': {reason}")]
    Persist {
        bucket: String,
        key: String,
        reason: String,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal failure (e.g. a panicked render task).
    #[error("Processing error: {0}")]
    Processing(String),
}

impl JobError {
    /// The `error_type` recorded in a FAILED result envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::MissingParameter { .. } | JobError::InvalidConfig(_) => "ConfigError",
            JobError::Fetch { .. } => "FetchError",
            JobError::Rasterization { .. } => "RasterizationError",
            JobError::RequestBuild(_) => "RequestBuildError",
            JobError::Invocation { .. } => "InvocationError",
            JobError::Persist { .. } => "PersistError",
            JobError::Processing(_) => "ProcessingError",
        }
    }

    pub(crate) fn rasterization(detail: impl Into<String>) -> Self {
        JobError::Rasterization {
            detail: detail.into(),
        }
    }
}

/// Errors reported by object storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The bucket or key does not exist.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Credentials lack permission for the operation.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Any other service-side or transport failure.
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
