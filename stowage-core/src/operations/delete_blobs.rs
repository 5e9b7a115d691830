use crate::{ClaimLedger, ContentStore, Result, StowageError};
use std::sync::Arc;

#[derive(Clone)]
pub struct DeleteBlobsOperation {
    content_store: Arc<dyn ContentStore>,
    ledger: Arc<dyn ClaimLedger>,
}

#[derive(Debug, Clone)]
pub struct DeleteBlobsOperationRequest {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteBlobsOperationResult {
    pub deleted: Vec<String>,
}

impl DeleteBlobsOperation {
    pub fn new(content_store: Arc<dyn ContentStore>, ledger: Arc<dyn ClaimLedger>) -> Self {
        Self {
            content_store,
            ledger,
        }
    }

    /// Delete each name in order, stopping at the first claimed one.
    ///
    /// Names handled before the stop stay deleted. Bytes are removed before the
    /// record so a failed removal can simply be retried. An unregistered name
    /// fails with `NotFound` and its bytes are left alone.
    pub async fn run(
        &self,
        request: DeleteBlobsOperationRequest,
    ) -> Result<DeleteBlobsOperationResult> {
        let mut result = DeleteBlobsOperationResult::default();

        for name in request.names {
            if self.ledger.is_claimed(&name).await? {
                tracing::warn!(
                    "Delete blocked on claimed blob {} after {} deletions",
                    name,
                    result.deleted.len()
                );
                return Err(StowageError::InUse(name));
            }

            let record = self
                .ledger
                .lookup(std::slice::from_ref(&name))
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| StowageError::NotFound(name.clone()))?;

            match self.content_store.remove(record.storage_path()).await {
                Ok(()) => {}
                Err(error) if error.is_not_found() => {
                    tracing::warn!("Bytes for blob {} already gone", name);
                }
                Err(error) => return Err(error),
            }

            self.ledger.delete(&name).await?;
            tracing::debug!("Deleted blob {}", name);
            result.deleted.push(name);
        }

        Ok(result)
    }
}
