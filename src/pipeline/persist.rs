//! Result persistence: store the envelope as pretty-printed JSON.

use crate::error::JobError;
use crate::output::ResultEnvelope;
use crate::storage::ObjectStore;
use tracing::info;

/// Content type of every stored envelope.
pub const ENVELOPE_CONTENT_TYPE: &str = "application/json";

/// Serialise `envelope` and write it to `bucket/key`.
///
/// Failures are [`JobError::Persist`]; this is the last stage, so there is
/// nowhere left to record them and the caller receives them directly.
pub async fn write_envelope(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    envelope: &ResultEnvelope,
) -> Result<(), JobError> {
    let persist_error = |reason: String| JobError::Persist {
        bucket: bucket.to_string(),
        key: key.to_string(),
        reason,
    };

    let body = envelope
        .to_json()
        .map_err(|e| persist_error(format!("cannot serialise envelope: {e}")))?;

    info!("Writing results to {} in bucket {}", key, bucket);
    store
        .put(bucket, key, body.into_bytes(), ENVELOPE_CONTENT_TYPE)
        .await
        .map_err(|e| persist_error(e.to_string()))
}
