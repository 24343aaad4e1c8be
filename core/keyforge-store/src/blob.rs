//! The object-store boundary for release binaries.

use crate::error::StoreResult;
use async_trait::async_trait;
use bytes::Bytes;
use keyforge_crypto::ByteStream;
use std::collections::HashMap;
use std::sync::RwLock;

/// Default chunk size for in-memory streams (matches typical object-store
/// part reads).
const CHUNK_SIZE: usize = 64 * 1024;

/// Read access to release binaries by `(bucket, key)`.
///
/// Implementations return a lazily-consumed byte stream; callers must never
/// need the whole object in memory.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Opens the object, or returns `None` if it does not exist.
    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Option<ByteStream>>;
}

/// In-memory [`BlobStore`] for tests and the fixture-seeded demo binary.
///
/// Objects are served in fixed-size chunks so consumers exercise the same
/// multi-chunk path a remote store produces.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<(String, String), Bytes>>,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an object.
    pub fn insert(&self, bucket: impl Into<String>, key: impl Into<String>, body: Bytes) {
        self.objects
            .write()
            .expect("blob store lock poisoned")
            .insert((bucket.into(), key.into()), body);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Option<ByteStream>> {
        let body = {
            let objects = self.objects.read().expect("blob store lock poisoned");
            objects.get(&(bucket.to_string(), key.to_string())).cloned()
        };
        Ok(body.map(|body| {
            let chunks: Vec<std::io::Result<Bytes>> = (0..body.len())
                .step_by(CHUNK_SIZE.max(1))
                .map(|start| {
                    let end = (start + CHUNK_SIZE).min(body.len());
                    Ok(body.slice(start..end))
                })
                .collect();
            let stream: ByteStream = Box::pin(futures::stream::iter(chunks));
            stream
        }))
    }
}
