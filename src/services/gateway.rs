//! GatewayService: the router state tying the streaming pipeline together.
//!
//! One request flows locator → metadata → planner → fetcher → assembler; the
//! handlers only pick a [`StreamPolicy`] and turn the outcome into a response.
//! Everything here is per request; the struct itself is cheap to clone and
//! holds no mutable state.

use crate::{
    models::media::{ObjectMetadata, ObjectRef},
    services::{
        assembler::{BodyStream, assemble},
        fetcher::ChunkFetcher,
        locator::locate,
        media_source::{MediaSource, SourceError},
        metadata::MetadataResolver,
        planner::{Plan, StreamPolicy},
    },
};
use std::{future::Future, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    NoMedia(String),
    #[error("{0}")]
    AccessDenied(String),
    #[error("range not satisfiable for object of {total_size} bytes")]
    Unsatisfiable { total_size: u64 },
    #[error("backend error: {0}")]
    Backend(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<SourceError> for GatewayError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(what) => GatewayError::NotFound(format!("{} not found", what)),
            SourceError::NoMedia(what) => {
                GatewayError::NoMedia(format!("{} does not contain any media", what))
            }
            SourceError::AccessDenied(reason) => GatewayError::AccessDenied(reason),
            SourceError::Backend(reason) => GatewayError::Backend(reason),
            SourceError::Sqlx(err) => GatewayError::Backend(err.to_string()),
            SourceError::Io(err) => GatewayError::Backend(err.to_string()),
        }
    }
}

/// Await a backend call, failing with `Backend` once `timeout` elapses.
pub(crate) async fn bounded<F: Future>(
    timeout: Option<Duration>,
    fut: F,
) -> GatewayResult<F::Output> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            GatewayError::Backend(format!("backend call timed out after {:?}", limit))
        }),
        None => Ok(fut.await),
    }
}

/// Tunables shared by every endpoint.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Upper bound for a single emitted chunk.
    pub chunk_size: usize,
    /// Bound on each backend call; `None` waits forever.
    pub fetch_timeout: Option<Duration>,
    pub stream_policy: StreamPolicy,
    pub download_policy: StreamPolicy,
}

/// Everything a handler needs to answer one request, resolved before any
/// header is committed.
#[derive(Debug, Clone)]
pub struct PreparedStream {
    pub object: ObjectRef,
    pub metadata: ObjectMetadata,
    pub plan: Plan,
}

#[derive(Clone)]
pub struct GatewayService {
    /// Backend capability shared by all requests.
    pub source: Arc<dyn MediaSource>,
    pub settings: Arc<GatewaySettings>,
}

impl GatewayService {
    pub fn new(source: Arc<dyn MediaSource>, settings: GatewaySettings) -> Self {
        Self {
            source,
            settings: Arc::new(settings),
        }
    }

    pub fn stream_policy(&self) -> &StreamPolicy {
        &self.settings.stream_policy
    }

    pub fn download_policy(&self) -> &StreamPolicy {
        &self.settings.download_policy
    }

    pub fn resolver(&self) -> MetadataResolver {
        MetadataResolver::new(self.source.clone(), self.settings.fetch_timeout)
    }

    pub fn fetcher(&self) -> ChunkFetcher {
        ChunkFetcher::new(
            self.source.clone(),
            self.settings.chunk_size,
            self.settings.fetch_timeout,
        )
    }

    /// Parse identifiers, resolve metadata and plan the response.
    pub async fn prepare(
        &self,
        container_raw: &str,
        object_raw: &str,
        range_header: Option<&str>,
        policy: &StreamPolicy,
    ) -> GatewayResult<PreparedStream> {
        let object = locate(container_raw, object_raw)?;
        let metadata = self.resolver().resolve(&object).await?;
        let plan = policy.plan(range_header, &metadata);
        debug!(object = %object, size = metadata.total_size, plan = ?plan, "planned response");
        Ok(PreparedStream {
            object,
            metadata,
            plan,
        })
    }

    /// Open the backend stream for a prepared 200/206 response.
    ///
    /// The first backend round-trip happens here, so a source that rejects the
    /// request still surfaces as a proper error status.
    pub async fn open_body(&self, prepared: &PreparedStream) -> GatewayResult<BodyStream> {
        let (offset, window) = match &prepared.plan {
            Plan::Full { window, .. } => (0, *window),
            Plan::Partial(window) => (window.start, Some(*window)),
            Plan::Unsatisfiable => {
                return Err(GatewayError::Unsatisfiable {
                    total_size: prepared.metadata.total_size,
                });
            }
        };
        let limit = window.map(|w| w.len());
        let chunks = self.fetcher().fetch(&prepared.object, offset, limit).await?;
        Ok(assemble(chunks, window, prepared.object.clone()))
    }
}
