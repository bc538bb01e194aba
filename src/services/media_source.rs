//! The remote media backend as an injected capability.
//!
//! Everything the gateway knows about the messaging backend goes through
//! [`MediaSource`]: one call for the message header, one for a byte window of
//! the payload. Implementations own their session; the gateway never sees it.

use crate::models::media::{MediaDescriptor, ObjectRef};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} carries no media")]
    NoMedia(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Lazily produced payload chunks, in increasing byte order.
pub type ChunkStream = BoxStream<'static, SourceResult<Bytes>>;

/// Chunks returned for a fetch, plus the offset of their first byte.
///
/// Backends that can only start reads at aligned offsets may begin before the
/// requested offset; `first_byte` is never greater than the request.
pub struct SourceChunks {
    pub first_byte: u64,
    pub chunks: ChunkStream,
}

/// Result of one readiness probe run by a source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceCheck {
    pub name: &'static str,
    pub ok: bool,
    pub error: Option<String>,
}

#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Fetch the message header (no payload) for `object`.
    async fn object_metadata(&self, object: &ObjectRef) -> SourceResult<MediaDescriptor>;

    /// Open a chunk stream covering `offset..offset + limit`.
    ///
    /// `limit == None` means "until the end of the object". Chunks should not
    /// exceed `chunk_size`, though callers re-split oversized chunks.
    async fn fetch_chunks(
        &self,
        object: &ObjectRef,
        offset: u64,
        limit: Option<u64>,
        chunk_size: usize,
    ) -> SourceResult<SourceChunks>;

    /// Readiness probes reported by `/readyz`.
    async fn checks(&self) -> Vec<SourceCheck> {
        Vec::new()
    }
}
