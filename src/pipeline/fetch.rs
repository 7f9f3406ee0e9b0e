//! Document fetch: read the input PDF from object storage.

use crate::config::JobParams;
use crate::error::JobError;
use crate::storage::ObjectStore;
use tracing::{debug, info};

/// Download the job's PDF.
///
/// A missing object, denied access, or a zero-byte payload all fail with
/// [`JobError::Fetch`]. An empty object is never treated as a zero-page PDF.
pub async fn fetch_document(
    store: &dyn ObjectStore,
    params: &JobParams,
) -> Result<Vec<u8>, JobError> {
    let (bucket, key) = (params.bucket(), params.input_key());
    info!("Downloading PDF from s3://{}/{}", bucket, key);

    let bytes = store
        .get(bucket, key)
        .await
        .map_err(|e| JobError::Fetch {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason: e.to_string(),
        })?;

    if bytes.is_empty() {
        return Err(JobError::Fetch {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason: "no PDF data received (object is empty)".into(),
        });
    }

    debug!("Fetched {} bytes", bytes.len());
    Ok(bytes)
}
