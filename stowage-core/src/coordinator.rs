use crate::operations::{
    CleanBlobsOperation, CleanBlobsOperationRequest, DeleteBlobsOperation,
    DeleteBlobsOperationRequest, PutBlobOperation, PutBlobOperationRequest,
};
use crate::{
    BlobRecord, BlobStream, ClaimLedger, ContentStore, Result, SweepStats, bytes_stream,
    collect_stream,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Entry point for application code.
///
/// Holds no state besides the two backends, so it is cheap to clone and safe to
/// share between tasks. Build one per configuration and hand it to whoever needs it.
#[derive(Clone)]
pub struct StorageCoordinator {
    content_store: Arc<dyn ContentStore>,
    ledger: Arc<dyn ClaimLedger>,
    put_blob: PutBlobOperation,
    delete_blobs: DeleteBlobsOperation,
    clean_blobs: CleanBlobsOperation,
}

impl StorageCoordinator {
    pub fn new(content_store: Arc<dyn ContentStore>, ledger: Arc<dyn ClaimLedger>) -> Self {
        Self {
            put_blob: PutBlobOperation::new(content_store.clone(), ledger.clone()),
            delete_blobs: DeleteBlobsOperation::new(content_store.clone(), ledger.clone()),
            clean_blobs: CleanBlobsOperation::new(content_store.clone(), ledger.clone()),
            content_store,
            ledger,
        }
    }

    pub fn content_store(&self) -> &Arc<dyn ContentStore> {
        &self.content_store
    }

    pub fn ledger(&self) -> &Arc<dyn ClaimLedger> {
        &self.ledger
    }

    pub async fn put(
        &self,
        filename: Option<&str>,
        extension: &str,
        data: impl Into<Bytes>,
    ) -> Result<BlobRecord> {
        let data = data.into();
        let length = data.len() as u64;
        self.put_stream(filename, extension, bytes_stream(data), Some(length))
            .await
    }

    pub async fn put_stream(
        &self,
        filename: Option<&str>,
        extension: &str,
        body: BlobStream,
        length: Option<u64>,
    ) -> Result<BlobRecord> {
        self.put_blob
            .run(PutBlobOperationRequest {
                filename: filename.map(str::to_string),
                extension: extension.to_string(),
                body,
                length,
            })
            .await
    }

    /// Read the whole blob. The ledger is not consulted.
    pub async fn get(&self, name: &str) -> Result<Bytes> {
        collect_stream(self.get_stream(name).await?).await
    }

    pub async fn get_stream(&self, name: &str) -> Result<BlobStream> {
        self.content_store.retrieve(name).await
    }

    pub async fn get_metadata(&self, names: &[String]) -> Result<Vec<BlobRecord>> {
        self.ledger.lookup(names).await
    }

    /// True iff every name is registered.
    pub async fn check(&self, names: &[String]) -> Result<bool> {
        self.ledger.exists(names).await
    }

    pub async fn use_blobs(&self, claimant: &str, names: &[String]) -> Result<()> {
        self.ledger.claim(claimant, names).await
    }

    pub async fn unuse_blobs(&self, claimant: &str, names: &[String]) -> Result<()> {
        self.ledger.release(claimant, names).await
    }

    /// Delete blobs in order, failing with `InUse` at the first claimed one.
    ///
    /// Returns the deleted names.
    pub async fn delete(&self, names: &[String]) -> Result<Vec<String>> {
        let result = self
            .delete_blobs
            .run(DeleteBlobsOperationRequest {
                names: names.to_vec(),
            })
            .await?;
        Ok(result.deleted)
    }

    /// Reclaim every unclaimed blob created before `cutoff`.
    pub async fn clean(&self, cutoff: DateTime<Utc>) -> Result<SweepStats> {
        let result = self
            .clean_blobs
            .run(CleanBlobsOperationRequest { cutoff })
            .await?;
        Ok(result.stats)
    }
}
