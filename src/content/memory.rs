//! In-memory content store for testing.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use futures_util::StreamExt;
use parking_lot::RwLock;

use super::{ContentError, ContentStore, ContentStream};

/// In-memory content store that replays objects in fixed-size chunks.
#[derive(Debug)]
pub struct InMemoryContentStore {
    objects: RwLock<BTreeMap<String, Bytes>>,
    chunk_size: usize,
}

impl InMemoryContentStore {
    /// Create an empty store emitting 1 KiB chunks.
    pub fn new() -> Self {
        Self::with_chunk_size(1024)
    }

    /// Create an empty store emitting chunks of `chunk_size` bytes.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Store content under `id`.
    pub fn insert(&self, id: impl Into<String>, content: impl Into<Bytes>) {
        self.objects.write().insert(id.into(), content.into());
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn open(&self, id: &str) -> Result<ContentStream, ContentError> {
        let content = self
            .objects
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ContentError::NotFound(id.to_string()))?;

        let chunks: Vec<Result<Bytes, ContentError>> = (0..content.len())
            .step_by(self.chunk_size)
            .map(|start| {
                let end = (start + self.chunk_size).min(content.len());
                Ok(content.slice(start..end))
            })
            .collect();

        Ok(stream::iter(chunks).boxed())
    }
}
