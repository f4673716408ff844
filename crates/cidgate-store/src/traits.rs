use async_trait::async_trait;
use bytes::Bytes;
use cidgate_types::ContentId;

use crate::error::{StoreError, StoreResult};
use crate::types::{DirEntry, Stat};

/// Narrow capability over an external content-addressable store.
///
/// Implementations are expected to be called by a single writer at a time
/// for namespace mutations; they do not serialize callers themselves. The
/// namespace is addressed by absolute, slash-separated paths.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Ingest `data` without pinning and return its content identifier.
    ///
    /// Ingested content that is never linked into the namespace may be
    /// collected by the store at any time.
    async fn ingest(&self, data: Bytes) -> StoreResult<ContentId>;

    /// Stat the node at `path`.
    ///
    /// Returns [`StoreError::NotFound`] if nothing exists there.
    async fn stat(&self, path: &str) -> StoreResult<Stat>;

    /// Link existing content `cid` into the namespace at `path`.
    ///
    /// The parent directory must exist and `path` must be free.
    async fn link(&self, cid: &ContentId, path: &str) -> StoreResult<()>;

    /// Remove the entry at `path`.
    async fn unlink(&self, path: &str) -> StoreResult<()>;

    /// List the direct children of the directory at `path`.
    async fn list(&self, path: &str) -> StoreResult<Vec<DirEntry>>;

    /// Check whether anything exists at `path`.
    ///
    /// Only [`StoreError::NotFound`] is turned into `false`; every other
    /// failure propagates.
    async fn exists(&self, path: &str) -> StoreResult<bool> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
