//! ChunkFetcher: the single point where bytes are pulled from the backend.
//!
//! Normalizes whatever the source yields into chunks that start exactly at
//! the requested offset, never exceed the configured chunk size, and stop at
//! the byte limit. Backend failures come through as `Err` items, never as a
//! silently short stream.

use crate::{
    models::media::ObjectRef,
    services::{
        gateway::{GatewayError, GatewayResult, bounded},
        media_source::MediaSource,
    },
};
use bytes::Bytes;
use futures::{StreamExt, stream::BoxStream};
use std::{sync::Arc, time::Duration};

/// Normalized chunks produced by [`ChunkFetcher::fetch`].
pub type GatewayChunks = BoxStream<'static, GatewayResult<Bytes>>;

pub struct ChunkFetcher {
    source: Arc<dyn MediaSource>,
    chunk_size: usize,
    timeout: Option<Duration>,
}

impl ChunkFetcher {
    pub fn new(source: Arc<dyn MediaSource>, chunk_size: usize, timeout: Option<Duration>) -> Self {
        Self {
            source,
            chunk_size: chunk_size.max(1),
            timeout,
        }
    }

    /// Stream up to `limit` bytes of `object` starting at `offset`.
    ///
    /// Opening the stream is awaited here so the first backend rejection is
    /// reported before a response is committed. The returned stream is lazy:
    /// dropping it drops the backend stream and no further chunk is requested.
    pub async fn fetch(
        &self,
        object: &ObjectRef,
        offset: u64,
        limit: Option<u64>,
    ) -> GatewayResult<GatewayChunks> {
        let opened = bounded(
            self.timeout,
            self.source
                .fetch_chunks(object, offset, limit, self.chunk_size),
        )
        .await??;

        if opened.first_byte > offset {
            return Err(GatewayError::Internal(format!(
                "source started at byte {} after requested offset {}",
                opened.first_byte, offset
            )));
        }

        let chunk_size = self.chunk_size;
        let timeout = self.timeout;
        let mut to_skip = offset - opened.first_byte;
        let mut remaining = limit;
        let mut chunks = opened.chunks;

        let stream = async_stream::stream! {
            loop {
                if remaining == Some(0) {
                    break;
                }
                let next = match bounded(timeout, chunks.next()).await {
                    Ok(next) => next,
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                };
                let mut chunk = match next {
                    None => break,
                    Some(Ok(chunk)) => chunk,
                    Some(Err(err)) => {
                        yield Err(GatewayError::from(err));
                        break;
                    }
                };

                // aligned sources may start before `offset`
                if to_skip > 0 {
                    let len = chunk.len() as u64;
                    if len <= to_skip {
                        to_skip -= len;
                        continue;
                    }
                    chunk = chunk.slice(to_skip as usize..);
                    to_skip = 0;
                }

                if let Some(left) = remaining {
                    if chunk.len() as u64 > left {
                        chunk.truncate(left as usize);
                    }
                    remaining = Some(left - chunk.len() as u64);
                }

                while !chunk.is_empty() {
                    let piece = chunk.split_to(chunk.len().min(chunk_size));
                    yield Ok(piece);
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::media::ContainerId, test_support::{FakeSource, pattern}};
    use futures::TryStreamExt;

    fn object() -> ObjectRef {
        ObjectRef {
            container: ContainerId::Alias("@films".into()),
            object_id: 3,
        }
    }

    async fn collect(chunks: GatewayChunks) -> Vec<Bytes> {
        chunks.try_collect().await.unwrap()
    }

    #[tokio::test]
    async fn respects_offset_limit_and_chunk_size() {
        let data = pattern(10_000);
        let source = Arc::new(FakeSource::new(data.clone()));
        let fetcher = ChunkFetcher::new(source.clone(), 1024, None);

        let chunks = collect(fetcher.fetch(&object(), 1_500, Some(3_000)).await.unwrap()).await;
        assert!(chunks.iter().all(|c| c.len() <= 1024));
        let joined: Vec<u8> = chunks.concat();
        assert_eq!(joined, data[1_500..4_500]);
        assert_eq!(source.requested_offsets(), vec![1_500]);
    }

    #[tokio::test]
    async fn unbounded_fetch_runs_to_end_of_object() {
        let data = pattern(5_000);
        let fetcher = ChunkFetcher::new(Arc::new(FakeSource::new(data.clone())), 4096, None);
        let joined: Vec<u8> = collect(fetcher.fetch(&object(), 0, None).await.unwrap())
            .await
            .concat();
        assert_eq!(joined, data);
    }

    #[tokio::test]
    async fn aligned_source_is_trimmed_to_offset() {
        let data = pattern(8_192);
        let source = FakeSource::new(data.clone()).with_alignment(4_096);
        let fetcher = ChunkFetcher::new(Arc::new(source), 1_000, None);

        let joined: Vec<u8> = collect(fetcher.fetch(&object(), 5_000, Some(100)).await.unwrap())
            .await
            .concat();
        assert_eq!(joined, data[5_000..5_100]);
    }

    #[tokio::test]
    async fn oversized_source_chunks_are_split() {
        let data = pattern(3_000);
        let source = FakeSource::new(data.clone()).with_source_chunk(3_000);
        let fetcher = ChunkFetcher::new(Arc::new(source), 1_000, None);

        let chunks = collect(fetcher.fetch(&object(), 0, None).await.unwrap()).await;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), data);
    }

    #[tokio::test]
    async fn mid_stream_failure_is_an_error_item() {
        let source = FakeSource::new(pattern(4_000)).failing_after(2_000);
        let fetcher = ChunkFetcher::new(Arc::new(source), 500, None);

        let items: Vec<_> = fetcher
            .fetch(&object(), 0, None)
            .await
            .unwrap()
            .collect()
            .await;
        let ok_bytes: usize = items
            .iter()
            .filter_map(|item| item.as_ref().ok())
            .map(|c| c.len())
            .sum();
        assert_eq!(ok_bytes, 2_000);
        assert!(matches!(items.last(), Some(Err(GatewayError::Backend(_)))));
    }

    #[tokio::test]
    async fn open_failure_is_reported_before_streaming() {
        let fetcher = ChunkFetcher::new(Arc::new(FakeSource::missing()), 500, None);
        assert!(matches!(
            fetcher.fetch(&object(), 0, None).await,
            Err(GatewayError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_chunk_times_out() {
        let source = FakeSource::new(pattern(4_000)).with_chunk_delay(Duration::from_secs(120));
        let fetcher = ChunkFetcher::new(Arc::new(source), 1_000, Some(Duration::from_secs(10)));

        let items: Vec<_> = fetcher
            .fetch(&object(), 0, None)
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(GatewayError::Backend(_))));
    }
}
