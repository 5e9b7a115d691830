use crate::{BlobRecord, BlobStream, ClaimLedger, ContentStore, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct PutBlobOperation {
    content_store: Arc<dyn ContentStore>,
    ledger: Arc<dyn ClaimLedger>,
}

pub struct PutBlobOperationRequest {
    pub filename: Option<String>,
    pub extension: String,
    pub body: BlobStream,
    pub length: Option<u64>,
}

impl PutBlobOperation {
    pub fn new(content_store: Arc<dyn ContentStore>, ledger: Arc<dyn ClaimLedger>) -> Self {
        Self {
            content_store,
            ledger,
        }
    }

    /// Store the bytes, then register the returned name.
    ///
    /// A failed registration leaves the stored bytes behind; nothing is rolled back.
    pub async fn run(&self, request: PutBlobOperationRequest) -> Result<BlobRecord> {
        let PutBlobOperationRequest {
            filename,
            extension,
            body,
            length,
        } = request;

        let name = self
            .content_store
            .store(&extension, body, length)
            .await?;

        let record = BlobRecord::new(name, filename);
        if let Err(error) = self.ledger.register(&record).await {
            tracing::warn!(
                "Blob {} stored but not registered, bytes are orphaned: {}",
                record.name,
                error
            );
            return Err(error);
        }

        tracing::debug!("Put blob {}", record.name);
        Ok(record)
    }
}
