//! Object storage capability: `get(bucket, key)` and `put(bucket, key, bytes, content_type)`.
//!
//! The job only ever needs these two calls, so the trait stays that small.
//! [`S3ObjectStore`] is the production backend; [`LocalObjectStore`] maps
//! `bucket/key` onto a directory tree for local runs and tests.

use crate::error::StorageError;
use async_trait::async_trait;
use aws_sdk_s3::{primitives::ByteStream, Client};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Read/write access to a bucketed object namespace.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's full contents.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Create or overwrite an object.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;
}

// ── S3 ───────────────────────────────────────────────────────────────────

/// Amazon S3 (or S3-compatible) backend.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Wrap an already configured client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from a loaded AWS config.
    ///
    /// A custom `endpoint` (MinIO, LocalStack) switches to path-style addressing.
    pub fn from_sdk_config(shared: &aws_config::SdkConfig, endpoint: Option<&str>) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(shared);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self::new(Client::from_conf(builder.build()))
    }
}

/// Classify an SDK error by its service error code.
fn classify_s3_error(code: Option<&str>, rendered: String, what: String) -> StorageError {
    match code {
        Some("NoSuchKey") | Some("NoSuchBucket") | Some("NotFound") => StorageError::NotFound(what),
        Some("AccessDenied") | Some("Forbidden") => StorageError::AccessDenied(what),
        _ => StorageError::Backend(rendered),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                classify_s3_error(
                    e.code(),
                    DisplayErrorContext(&e).to_string(),
                    format!("s3://{bucket}/{key}"),
                )
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(format!("reading body: {e}")))?
            .into_bytes();

        debug!("GET s3://{}/{} → {} bytes", bucket, key, bytes.len());
        Ok(bytes.to_vec())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};

        let len = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                classify_s3_error(
                    e.code(),
                    DisplayErrorContext(&e).to_string(),
                    format!("s3://{bucket}/{key}"),
                )
            })?;

        debug!("PUT s3://{}/{} ({} bytes, {})", bucket, key, len, content_type);
        Ok(())
    }
}

// ── Local directory tree ─────────────────────────────────────────────────

/// Stores `bucket/key` as `<root>/<bucket>/<key>` on the local filesystem.
///
/// Writes go to a temp file that is renamed into place, so a reader never
/// sees a half-written envelope. Content types are not persisted.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve an object to a path under the root. Keys that would escape
    /// the root (`..`, absolute paths) are rejected.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        let mut path = self.root.clone();
        for part in [bucket, key] {
            for component in Path::new(part).components() {
                match component {
                    Component::Normal(c) => path.push(c),
                    Component::CurDir => {}
                    _ => {
                        return Err(StorageError::AccessDenied(format!(
                            "'{bucket}/{key}' escapes the storage root"
                        )))
                    }
                }
            }
        }
        Ok(path)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!("Read {} ({} bytes)", path.display(), bytes.len());
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.display().to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(StorageError::AccessDenied(path.display().to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        tokio::fs::write(&tmp_path, &body).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        debug!("Wrote {} ({} bytes)", path.display(), body.len());
        Ok(())
    }
}
