use crate::{BlobRecord, ClaimLedger, ContentStore, Result, SweepStats, SweepVisitor};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct CleanBlobsOperation {
    content_store: Arc<dyn ContentStore>,
    ledger: Arc<dyn ClaimLedger>,
}

#[derive(Debug, Clone)]
pub struct CleanBlobsOperationRequest {
    pub cutoff: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct CleanBlobsOperationResult {
    pub stats: SweepStats,
}

/// Removes a sweep candidate's bytes before the ledger drops its record.
struct RemoveBlobBytes {
    content_store: Arc<dyn ContentStore>,
}

#[async_trait]
impl SweepVisitor for RemoveBlobBytes {
    async fn visit(&self, record: &BlobRecord) -> Result<()> {
        let path = record.storage_path();
        match self.content_store.remove(path).await {
            Ok(()) => Ok(()),
            Err(error) if error.is_not_found() => {
                tracing::warn!("Bytes for swept blob {} already gone", path);
                Ok(())
            }
            Err(error) => {
                tracing::error!("Failed to remove swept blob {}: {}", path, error);
                Err(error)
            }
        }
    }
}

impl CleanBlobsOperation {
    pub fn new(content_store: Arc<dyn ContentStore>, ledger: Arc<dyn ClaimLedger>) -> Self {
        Self {
            content_store,
            ledger,
        }
    }

    pub async fn run(
        &self,
        request: CleanBlobsOperationRequest,
    ) -> Result<CleanBlobsOperationResult> {
        let visitor = RemoveBlobBytes {
            content_store: self.content_store.clone(),
        };

        let stats = self.ledger.sweep(request.cutoff, &visitor).await?;

        tracing::info!(
            "Sweep before {} removed {} blobs in {} batches",
            request.cutoff.to_rfc3339(),
            stats.removed,
            stats.batches
        );
        Ok(CleanBlobsOperationResult { stats })
    }
}
