//! Storage modules for Stowage
//!
//! Provides the content store and claim ledger interfaces along with their
//! reference backends.

pub mod claim_ledger;
pub mod content_store;
pub mod factory;
pub mod fs_content_store;
pub mod object_content_store;
pub mod sqlite_ledger;

pub use claim_ledger::{BlobRecord, Claim, ClaimLedger, SweepStats, SweepVisitor};
pub use content_store::{
    BlobStream, ContentStore, bytes_stream, collect_stream, compute_hash, generate_file_name,
};
pub use factory::ContentStoreBuilder;
pub use fs_content_store::FsContentStore;
pub use object_content_store::{DEFAULT_MULTIPART_THRESHOLD, ObjectContentStore, S3Settings};
pub use sqlite_ledger::{DEFAULT_BUSY_TIMEOUT, DEFAULT_SWEEP_BATCH_SIZE, SqliteClaimLedger};
