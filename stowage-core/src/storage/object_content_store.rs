use crate::storage::content_store::{BlobStream, ContentStore, generate_file_name};
use crate::{Result, StowageError};
use async_trait::async_trait;
use chrono::Utc;
use futures_util::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use bytes::Bytes;
use object_store::{ObjectStore, PutPayloadMut, WriteMultipart};
use std::sync::Arc;

/// Blobs smaller than this go up in a single PUT.
pub const DEFAULT_MULTIPART_THRESHOLD: usize = 8 * 1024 * 1024;

/// Parts allowed in flight before the upload waits for one to finish.
const MAX_INFLIGHT_PARTS: usize = 4;

/// Settings for an S3-compatible bucket.
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub allow_http: bool,
}

/// Content store backed by any `object_store` implementation.
///
/// Names are laid out as `{prefix}/{yyyy}/{mm}/{dd}/{hash}.{ext}`.
pub struct ObjectContentStore {
    inner: Arc<dyn ObjectStore>,
    prefix: Option<String>,
    multipart_threshold: usize,
}

impl ObjectContentStore {
    pub fn new(inner: Arc<dyn ObjectStore>, prefix: Option<String>) -> Self {
        let prefix = prefix
            .map(|value| value.trim_matches('/').to_string())
            .filter(|value| !value.is_empty());
        Self {
            inner,
            prefix,
            multipart_threshold: DEFAULT_MULTIPART_THRESHOLD,
        }
    }

    pub fn with_multipart_threshold(mut self, threshold: usize) -> Self {
        self.multipart_threshold = threshold.max(1);
        self
    }

    pub fn in_memory(prefix: Option<String>) -> Self {
        Self::new(Arc::new(InMemory::new()), prefix)
    }

    pub fn s3(settings: &S3Settings, prefix: Option<String>) -> Result<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&settings.bucket)
            .with_region(&settings.region)
            .with_allow_http(settings.allow_http);

        if let Some(endpoint) = &settings.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if let Some(access_key_id) = &settings.access_key_id {
            builder = builder.with_access_key_id(access_key_id);
        }
        if let Some(secret_access_key) = &settings.secret_access_key {
            builder = builder.with_secret_access_key(secret_access_key);
        }

        let store = builder
            .build()
            .map_err(|error| StowageError::Config(error.to_string()))?;
        Ok(Self::new(Arc::new(store), prefix))
    }

    fn object_path(&self, name: &str) -> Result<ObjectPath> {
        ObjectPath::parse(name)
            .map_err(|error| StowageError::InvalidArgument(format!("{}: {}", name, error)))
    }

    fn new_name(&self, extension: &str) -> String {
        let date = Utc::now().format("%Y/%m/%d");
        let file_name = generate_file_name(extension);
        match &self.prefix {
            Some(prefix) => format!("{}/{}/{}", prefix, date, file_name),
            None => format!("{}/{}", date, file_name),
        }
    }
}

#[async_trait]
impl ContentStore for ObjectContentStore {
    async fn store(
        &self,
        extension: &str,
        mut data: BlobStream,
        length: Option<u64>,
    ) -> Result<String> {
        let name = self.new_name(extension);
        let location = self.object_path(&name)?;

        // Small blobs never start a multipart upload
        let mut head = Vec::new();
        let mut buffered = 0usize;
        while buffered < self.multipart_threshold {
            match data.next().await {
                Some(chunk) => {
                    let chunk = chunk?;
                    buffered += chunk.len();
                    head.push(chunk);
                }
                None => {
                    let received = buffered as u64;
                    check_length(length, received)?;

                    let mut payload = PutPayloadMut::new();
                    for chunk in head {
                        payload.push(chunk);
                    }
                    self.inner.put(&location, payload.freeze()).await?;

                    tracing::debug!("Stored object {} ({} bytes)", name, received);
                    return Ok(name);
                }
            }
        }

        let mut upload = WriteMultipart::new(self.inner.put_multipart(&location).await?);
        match write_parts(&mut upload, head, data, length).await {
            Ok(received) => {
                upload.finish().await?;
                tracing::debug!("Stored object {} in parts ({} bytes)", name, received);
                Ok(name)
            }
            Err(error) => {
                if let Err(abort_error) = upload.abort().await {
                    tracing::warn!("Failed to abort upload of {}: {}", name, abort_error);
                }
                Err(error)
            }
        }
    }

    async fn retrieve(&self, name: &str) -> Result<BlobStream> {
        let location = self.object_path(name)?;
        let result = self.inner.get(&location).await?;
        Ok(result.into_stream().map_err(std::io::Error::other).boxed())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let location = self.object_path(name)?;
        // S3 deletes succeed on missing keys
        self.inner.head(&location).await?;
        self.inner.delete(&location).await?;
        tracing::debug!("Removed object {}", name);
        Ok(())
    }
}

fn check_length(expected: Option<u64>, received: u64) -> Result<()> {
    match expected {
        Some(expected) if expected != received => Err(StowageError::InvalidArgument(format!(
            "declared length {} does not match {} bytes received",
            expected, received
        ))),
        _ => Ok(()),
    }
}

/// Feed the buffered head and the rest of the stream into `upload`.
async fn write_parts(
    upload: &mut WriteMultipart,
    head: Vec<Bytes>,
    mut data: BlobStream,
    length: Option<u64>,
) -> Result<u64> {
    let mut received = 0u64;
    for chunk in head {
        upload.write(&chunk);
        received += chunk.len() as u64;
    }

    while let Some(chunk) = data.next().await {
        let chunk = chunk?;
        upload.wait_for_capacity(MAX_INFLIGHT_PARTS).await?;
        upload.write(&chunk);
        received += chunk.len() as u64;
    }

    check_length(length, received)?;
    Ok(received)
}
