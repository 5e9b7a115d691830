pub mod clean_blobs;
pub mod delete_blobs;
pub mod put_blob;

pub use clean_blobs::{CleanBlobsOperation, CleanBlobsOperationRequest, CleanBlobsOperationResult};
pub use delete_blobs::{
    DeleteBlobsOperation, DeleteBlobsOperationRequest, DeleteBlobsOperationResult,
};
pub use put_blob::{PutBlobOperation, PutBlobOperationRequest};
