use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A known blob as recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRecord {
    pub name: String,
    pub filename: Option<String>,
    /// Storage location, when it differs from `name`.
    pub path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BlobRecord {
    pub fn new(name: impl Into<String>, filename: Option<String>) -> Self {
        Self {
            name: name.into(),
            filename: filename.filter(|value| !value.is_empty()),
            path: None,
            created_at: Utc::now(),
        }
    }

    /// The key the content store knows this blob by.
    pub fn storage_path(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }
}

/// One claimant's dependency on one blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub blob_name: String,
    pub claimant: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    /// Non-empty candidate batches processed.
    pub batches: usize,
    pub removed: usize,
}

/// Callback invoked by [`ClaimLedger::sweep`] for every candidate record.
///
/// Returning an error aborts the sweep before the record is deleted.
#[async_trait]
pub trait SweepVisitor: Send + Sync {
    async fn visit(&self, record: &BlobRecord) -> Result<()>;
}

/// Durable record of known blobs and of who claims them.
#[async_trait]
pub trait ClaimLedger: Send + Sync {
    /// Insert a new record. `Conflict` if the name is already known.
    async fn register(&self, record: &BlobRecord) -> Result<()>;

    /// Records for the given names; unknown names are omitted.
    async fn lookup(&self, names: &[String]) -> Result<Vec<BlobRecord>>;

    /// True iff every given name has a record.
    async fn exists(&self, names: &[String]) -> Result<bool>;

    /// Remove the record and every claim on it. `NotFound` if absent.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Add one claim per name for `claimant`, all or nothing.
    async fn claim(&self, claimant: &str, names: &[String]) -> Result<()>;

    async fn is_claimed(&self, name: &str) -> Result<bool>;

    /// Drop claims matching `claimant` and/or `names`.
    ///
    /// An empty claimant matches every claimant and an empty name list matches every
    /// name, but both being empty is rejected with `InvalidArgument`.
    async fn release(&self, claimant: &str, names: &[String]) -> Result<()>;

    /// Visit and delete unclaimed records created strictly before `cutoff`.
    ///
    /// Candidates are re-queried batch by batch until none remain. A visitor error
    /// stops the sweep; records already visited stay deleted.
    async fn sweep(&self, cutoff: DateTime<Utc>, visitor: &dyn SweepVisitor)
    -> Result<SweepStats>;
}
