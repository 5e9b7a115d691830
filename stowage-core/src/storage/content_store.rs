use crate::Result;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use sha2::{Digest, Sha256};
use ulid::Ulid;

/// A stream of byte chunks flowing into or out of a content store.
pub type BlobStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Durable byte storage keyed by backend-generated names.
///
/// Implementations hold no metadata. Every call is independent, so a single
/// instance can be shared across tasks behind an `Arc`.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persist `data` and return the generated name.
    ///
    /// `length` is the size announced by the caller, when known.
    async fn store(&self, extension: &str, data: BlobStream, length: Option<u64>)
    -> Result<String>;

    /// Open the blob for reading from the first byte.
    async fn retrieve(&self, name: &str) -> Result<BlobStream>;

    /// Delete the blob. Fails with `NotFound` if nothing is stored under `name`.
    async fn remove(&self, name: &str) -> Result<()>;
}

/// Compute SHA256 hash of data
pub fn compute_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Generate a fresh file name: the hash of a new ULID followed by the extension.
pub fn generate_file_name(extension: &str) -> String {
    let stem = compute_hash(Ulid::new().to_string().as_bytes());
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        stem
    } else {
        format!("{}.{}", stem, extension)
    }
}

pub fn bytes_stream(data: Bytes) -> BlobStream {
    stream::once(async move { Ok(data) }).boxed()
}

/// Drain a blob stream into one contiguous buffer.
pub async fn collect_stream(mut data: BlobStream) -> Result<Bytes> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = data.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_hash() {
        let data = b"hello world";
        let hash = compute_hash(data);
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_generate_file_name() {
        let a = generate_file_name(".txt");
        let b = generate_file_name("txt");
        assert!(a.ends_with(".txt"));
        assert!(b.ends_with(".txt"));
        assert_ne!(a, b);
        assert_eq!(generate_file_name("").len(), 64);
    }

    #[tokio::test]
    async fn test_collect_chunked_stream() {
        let chunks = vec![Ok(Bytes::from("ab")), Ok(Bytes::from("cd"))];
        let collected = collect_stream(stream::iter(chunks).boxed()).await.unwrap();
        assert_eq!(collected, Bytes::from("abcd"));
    }
}
