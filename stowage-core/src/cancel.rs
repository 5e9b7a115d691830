use crate::{Result, StowageError};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Run `future` unless `token` fires first, in which case the future is dropped
/// and `Cancelled` is returned.
///
/// Dropping only stops the future at its next await point. Ledger calls run on
/// the blocking pool, and a statement already handed to SQLite still commits,
/// so a cancelled `use_blobs` may have claimed its blobs anyway. Callers that
/// need certainty re-check with the ledger or release explicitly.
pub async fn cancellable<T, F>(token: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(StowageError::Cancelled),
        result = future => result,
    }
}
