//! Stowage Core - claim-tracked blob storage
//!
//! Bytes live in a [`ContentStore`], blob records and claims live in a
//! [`ClaimLedger`], and the [`StorageCoordinator`] ties the two together:
//! - a claimed blob is never deleted
//! - unclaimed blobs older than a cutoff are reclaimed by a batched sweep
//! - no two-phase commit; every cross-store step is ordered to be retry-safe

pub mod cancel;
pub mod coordinator;
pub mod error;
pub mod operations;
pub mod storage;

pub use cancel::cancellable;
pub use coordinator::StorageCoordinator;
pub use error::{ErrorKind, Result, StowageError};
pub use operations::{
    CleanBlobsOperation, CleanBlobsOperationRequest, CleanBlobsOperationResult,
    DeleteBlobsOperation, DeleteBlobsOperationRequest, DeleteBlobsOperationResult,
    PutBlobOperation, PutBlobOperationRequest,
};
pub use storage::{
    BlobRecord, BlobStream, Claim, ClaimLedger, ContentStore, ContentStoreBuilder,
    DEFAULT_BUSY_TIMEOUT, DEFAULT_SWEEP_BATCH_SIZE, FsContentStore, ObjectContentStore,
    S3Settings, SqliteClaimLedger, SweepStats, SweepVisitor, bytes_stream, collect_stream,
    compute_hash,
};
