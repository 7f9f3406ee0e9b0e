//! Result envelope: the one durable artifact of a job run.
//!
//! The envelope is written exactly once per run, on success and on failure
//! alike, at a key derived only from the tracking id and the input key (see
//! [`output_key`]).
//!
//! ```json
//! {
//!   "pdf_key": "documents/sample.pdf",
//!   "processing_start_time": "20241016_141503",
//!   "processing_end_time": "20241016_141519",
//!   "status": "SUCCESS",
//!   "analysis_results": { ... }
//! }
//! ```

use crate::error::JobError;
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// `strftime` layout of the envelope timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Format a time the way envelopes record it (wall clock, no offset).
pub fn format_timestamp<Tz: TimeZone>(t: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Success,
    Failed,
}

/// The payload half of an envelope. Exactly one shape is ever present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    /// The model's decoded response, verbatim.
    Success { analysis_results: serde_json::Value },
    /// The captured stage error.
    Failed { error: String, error_type: String },
}

/// The persisted JSON record describing a run's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub pdf_key: String,
    pub processing_start_time: String,
    pub processing_end_time: String,
    pub status: JobStatus,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ResultEnvelope {
    /// Envelope for a run whose model call succeeded.
    pub fn success<Tz: TimeZone>(
        pdf_key: impl Into<String>,
        started: &DateTime<Tz>,
        finished: &DateTime<Tz>,
        analysis_results: serde_json::Value,
    ) -> Self
    where
        Tz::Offset: Display,
    {
        Self {
            pdf_key: pdf_key.into(),
            processing_start_time: format_timestamp(started),
            processing_end_time: format_timestamp(finished),
            status: JobStatus::Success,
            outcome: Outcome::Success { analysis_results },
        }
    }

    /// Envelope for a run that failed before a result could be produced.
    pub fn failure<Tz: TimeZone>(
        pdf_key: impl Into<String>,
        started: &DateTime<Tz>,
        finished: &DateTime<Tz>,
        error: &JobError,
    ) -> Self
    where
        Tz::Offset: Display,
    {
        Self {
            pdf_key: pdf_key.into(),
            processing_start_time: format_timestamp(started),
            processing_end_time: format_timestamp(finished),
            status: JobStatus::Failed,
            outcome: Outcome::Failed {
                error: error.to_string(),
                error_type: error.kind().to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }

    /// The model response, if the run succeeded.
    pub fn analysis_results(&self) -> Option<&serde_json::Value> {
        match &self.outcome {
            Outcome::Success { analysis_results } => Some(analysis_results),
            Outcome::Failed { .. } => None,
        }
    }

    /// The recorded `error_type`, if the run failed.
    pub fn error_type(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failed { error_type, .. } => Some(error_type),
        }
    }

    /// Canonical JSON text: pretty-printed with two-space indentation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// What [`crate::job::AnalysisJob::run`] hands back once the envelope is stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobReport {
    /// Bucket the envelope was written to.
    pub bucket: String,
    /// Object key the envelope was written to.
    pub output_key: String,
    pub envelope: ResultEnvelope,
}

/// Deterministic result location for an input key.
///
/// `<prefix>/<tracking_id>/<basename of input_key without its last extension>_results.json`
///
/// Only the basename of the input key matters: `a/report.pdf` and
/// `b/report.pdf` under the same tracking id map to the same key.
pub fn output_key(prefix: &str, tracking_id: &str, input_key: &str) -> String {
    let basename = input_key.rsplit('/').next().unwrap_or_default();
    let stem = strip_extension(basename);
    format!(
        "{}/{}/{}_results.json",
        prefix.trim_end_matches('/'),
        tracking_id,
        stem
    )
}

/// Drop the last `.ext` of a file name. Leading dots never start an
/// extension, so `.hidden`, `..` and `...` are returned unchanged.
fn strip_extension(name: &str) -> &str {
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(dot) => &name[..leading + dot],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 10, 16, h, m, s).unwrap()
    }

    #[test]
    fn output_key_strips_directories_and_extension() {
        assert_eq!(
            output_key("pdf_results", "123456", "documents/sample.pdf"),
            "pdf_results/123456/sample_results.json"
        );
        assert_eq!(
            output_key("pdf_results", "t", "report.pdf"),
            "pdf_results/t/report_results.json"
        );
        assert_eq!(
            output_key("pdf_results", "t", "a/b/archive.tar.gz"),
            "pdf_results/t/archive.tar_results.json"
        );
        assert_eq!(
            output_key("pdf_results", "t", "noext"),
            "pdf_results/t/noext_results.json"
        );
        assert_eq!(
            output_key("pdf_results", "t", "folder/"),
            "pdf_results/t/_results.json"
        );
    }

    #[test]
    fn output_key_leading_dots_are_not_an_extension() {
        assert_eq!(output_key("p", "t", ".."), "p/t/.._results.json");
        assert_eq!(output_key("p", "t", "in/..."), "p/t/..._results.json");
        assert_eq!(output_key("p", "t", ".hidden"), "p/t/.hidden_results.json");
        assert_eq!(output_key("p", "t", ".hidden.pdf"), "p/t/.hidden_results.json");
        assert_eq!(output_key("p", "t", "trailing."), "p/t/trailing_results.json");
    }

    #[test]
    fn output_key_is_disjoint_across_tracking_ids() {
        let a = output_key("pdf_results", "run-a", "docs/x.pdf");
        let b = output_key("pdf_results", "run-b", "docs/x.pdf");
        assert_ne!(a, b);
        assert_eq!(a, output_key("pdf_results", "run-a", "docs/x.pdf"));
    }

    #[test]
    fn timestamp_layout() {
        assert_eq!(format_timestamp(&at(9, 5, 7)), "20241016_090507");
    }

    #[test]
    fn success_envelope_json_shape() {
        let env = ResultEnvelope::success(
            "documents/sample.pdf",
            &at(14, 15, 3),
            &at(14, 15, 19),
            json!({"content": [{"type": "text", "text": "ok"}]}),
        );
        let value: serde_json::Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "pdf_key": "documents/sample.pdf",
                "processing_start_time": "20241016_141503",
                "processing_end_time": "20241016_141519",
                "status": "SUCCESS",
                "analysis_results": {"content": [{"type": "text", "text": "ok"}]}
            })
        );
    }

    #[test]
    fn failure_envelope_json_shape() {
        let err = JobError::RequestBuild("document has no pages".into());
        let env = ResultEnvelope::failure("x.pdf", &at(1, 0, 0), &at(1, 0, 1), &err);
        let value: serde_json::Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
        assert_eq!(value["status"], "FAILED");
        assert_eq!(value["error_type"], "RequestBuildError");
        assert!(value["error"].as_str().unwrap().contains("no pages"));
        assert!(value.get("analysis_results").is_none());
        assert_eq!(env.error_type(), Some("RequestBuildError"));
        assert!(env.analysis_results().is_none());
    }

    #[test]
    fn json_is_indented_two_spaces() {
        let env = ResultEnvelope::success("k", &at(0, 0, 0), &at(0, 0, 0), json!({}));
        let text = env.to_json().unwrap();
        assert!(text.contains("\n  \"pdf_key\""), "got: {text}");
    }

    #[test]
    fn envelope_reads_back() {
        let env = ResultEnvelope::success("k.pdf", &at(2, 0, 0), &at(2, 0, 5), json!({"id": "msg_1"}));
        let back: ResultEnvelope = serde_json::from_str(&env.to_json().unwrap()).unwrap();
        assert_eq!(back, env);
        assert!(back.is_success());
    }
}
