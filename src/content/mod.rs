//! Content store backends.
//!
//! Content is only ever consumed as a stream of byte chunks; no backend hands
//! out a whole object at once.

pub mod memory;
pub mod http;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Stream of content chunks.
pub type ContentStream = BoxStream<'static, Result<Bytes, ContentError>>;

/// Content store failure.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// No content stored under this id.
    #[error("content not found: {0}")]
    NotFound(String),
    /// The store answered with a status other than 200.
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// The configured base URL cannot address content.
    #[error("invalid content store url: {0}")]
    InvalidUrl(String),
    /// The request or the body stream failed or timed out.
    #[error("transport error: {0}")]
    Transport(String),
    /// Writing a local copy failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte-stream access to stored content.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Open the content stored under `id`.
    async fn open(&self, id: &str) -> Result<ContentStream, ContentError>;
}

/// Copy the content stored under `id` into `writer`, returning bytes written.
pub async fn download_to<S, W>(store: &S, id: &str, writer: &mut W) -> Result<u64, ContentError>
where
    S: ContentStore + ?Sized,
    W: AsyncWrite + Unpin + Send,
{
    let mut stream = store.open(id).await?;
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if chunk.is_empty() {
            continue;
        }
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    writer.flush().await?;

    Ok(written)
}

pub use memory::InMemoryContentStore;
pub use http::{HttpContentStore, HttpContentConfig};

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_download_to_copies_all_chunks() {
        let store = InMemoryContentStore::with_chunk_size(3);
        store.insert("obj-1", b"hello world".to_vec());

        let mut out: Vec<u8> = Vec::new();
        let written = download_to(&store, "obj-1", &mut out).await.unwrap();

        assert_eq!(written, 11);
        assert_eq!(out, b"hello world");
    }

    #[tokio::test]
    async fn test_download_missing_content() {
        let store = InMemoryContentStore::new();
        let mut out: Vec<u8> = Vec::new();
        let err = download_to(&store, "missing", &mut out).await.unwrap_err();
        assert!(matches!(err, ContentError::NotFound(_)));
    }
}
