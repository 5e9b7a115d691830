use crate::storage::content_store::{BlobStream, ContentStore, generate_file_name};
use crate::{Result, StowageError};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

/// FsContentStore keeps blobs on local disk.
/// Blobs are stored in {root}/{name[0..2]}/{name[2..4]}/{name}; the returned
/// blob name is that relative path.
pub struct FsContentStore {
    base_path: PathBuf,
}

impl FsContentStore {
    pub fn new(base_path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Resolve a blob name to its location on disk.
    pub fn blob_path(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let is_plain = !name.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain {
            return Err(StowageError::InvalidArgument(format!(
                "blob name escapes the store root: {}",
                name
            )));
        }
        Ok(self.base_path.join(relative))
    }

    async fn write_temp(&self, temp_path: &Path, mut data: BlobStream) -> Result<u64> {
        let mut file = fs::File::create(temp_path).await?;
        let mut written = 0u64;
        while let Some(chunk) = data.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.sync_all().await?;
        Ok(written)
    }
}

/// Shard a file name into two levels of two-character directories.
fn sharded_name(file_name: &str) -> String {
    format!("{}/{}/{}", &file_name[..2], &file_name[2..4], file_name)
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn store(
        &self,
        extension: &str,
        data: BlobStream,
        length: Option<u64>,
    ) -> Result<String> {
        let name = sharded_name(&generate_file_name(extension));
        let blob_path = self.blob_path(&name)?;

        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to temporary file first, then rename for atomicity
        let temp_path = blob_path.with_extension("tmp");
        let written = match self.write_temp(&temp_path, data).await {
            Ok(written) => written,
            Err(error) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(error);
            }
        };

        if let Some(expected) = length {
            if expected != written {
                let _ = fs::remove_file(&temp_path).await;
                return Err(StowageError::InvalidArgument(format!(
                    "declared length {} does not match {} bytes received",
                    expected, written
                )));
            }
        }

        fs::rename(&temp_path, &blob_path).await?;

        tracing::debug!("Stored blob {} ({} bytes)", name, written);
        Ok(name)
    }

    async fn retrieve(&self, name: &str) -> Result<BlobStream> {
        let blob_path = self.blob_path(name)?;
        let file = fs::File::open(&blob_path)
            .await
            .map_err(|error| StowageError::from_io(error, name))?;
        Ok(ReaderStream::new(file).boxed())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let blob_path = self.blob_path(name)?;
        fs::remove_file(&blob_path)
            .await
            .map_err(|error| StowageError::from_io(error, name))?;
        tracing::debug!("Removed blob {}", name);
        Ok(())
    }
}
