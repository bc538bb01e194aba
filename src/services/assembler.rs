//! StreamAssembler: turns fetched chunks into the exact body a response
//! promised.
//!
//! Once headers are on the wire the status can no longer change, so a backend
//! failure mid-stream is logged and the body simply ends short. The client
//! sees fewer bytes than Content-Length announced, which is the failure
//! signal HTTP already defines.

use crate::{
    models::media::{ByteWindow, ObjectRef},
    services::fetcher::GatewayChunks,
};
use bytes::Bytes;
use futures::{StreamExt, stream::BoxStream};
use std::io;
use tracing::{info, warn};

/// Body stream handed to `axum::body::Body::from_stream`.
pub type BodyStream = BoxStream<'static, io::Result<Bytes>>;

/// Per-response bookkeeping, owned by a single body stream.
#[derive(Debug, Clone)]
pub struct StreamState {
    /// Window the response promised; `None` when the length is unknown.
    pub window: Option<ByteWindow>,
    pub bytes_emitted: u64,
    pub chunk_count: u64,
}

impl StreamState {
    pub fn new(window: Option<ByteWindow>) -> Self {
        Self {
            window,
            bytes_emitted: 0,
            chunk_count: 0,
        }
    }

    fn remaining(&self) -> Option<u64> {
        self.window
            .map(|w| w.len().saturating_sub(self.bytes_emitted))
    }

    /// Account for `chunk`, trimming it so the total never exceeds the window.
    fn admit(&mut self, mut chunk: Bytes) -> Bytes {
        if let Some(left) = self.remaining() {
            if chunk.len() as u64 > left {
                chunk.truncate(left as usize);
            }
        }
        self.bytes_emitted += chunk.len() as u64;
        self.chunk_count += 1;
        chunk
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == Some(0)
    }
}

/// Drive `chunks` and emit at most `window.len()` bytes.
///
/// Stops pulling from the fetcher as soon as the window is filled. Errors are
/// logged and end the stream cleanly; no error item ever reaches the body.
pub fn assemble(
    chunks: GatewayChunks,
    window: Option<ByteWindow>,
    object: ObjectRef,
) -> BodyStream {
    let stream = async_stream::stream! {
        let mut chunks = chunks;
        let mut state = StreamState::new(window);
        let mut failed = false;

        while !state.is_complete() {
            match chunks.next().await {
                None => break,
                Some(Ok(chunk)) => {
                    if chunk.is_empty() {
                        continue;
                    }
                    let chunk = state.admit(chunk);
                    yield Ok::<Bytes, io::Error>(chunk);
                }
                Some(Err(err)) => {
                    warn!(
                        object = %object,
                        bytes_emitted = state.bytes_emitted,
                        chunks = state.chunk_count,
                        error = %err,
                        "backend failed mid-stream; ending body early"
                    );
                    failed = true;
                    break;
                }
            }
        }
        drop(chunks);

        match state.window {
            Some(window) if !failed && !state.is_complete() => warn!(
                object = %object,
                window = %window,
                bytes_emitted = state.bytes_emitted,
                expected = window.len(),
                "backend ended before the promised length"
            ),
            _ if !failed => info!(
                object = %object,
                bytes_emitted = state.bytes_emitted,
                chunks = state.chunk_count,
                "stream complete"
            ),
            _ => {}
        }
    };

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::media::ContainerId, services::gateway::GatewayError};
    use futures::{TryStreamExt, stream};

    fn object() -> ObjectRef {
        ObjectRef {
            container: ContainerId::Numeric(-1),
            object_id: 1,
        }
    }

    fn chunks(items: Vec<Result<&'static str, GatewayError>>) -> GatewayChunks {
        Box::pin(stream::iter(
            items
                .into_iter()
                .map(|item| item.map(|s| Bytes::from_static(s.as_bytes())))
                .collect::<Vec<_>>(),
        ))
    }

    async fn body(stream: BodyStream) -> Vec<u8> {
        let parts: Vec<Bytes> = stream.try_collect().await.unwrap();
        parts.concat()
    }

    #[tokio::test]
    async fn trims_final_chunk_to_window() {
        let source = chunks(vec![Ok("abcd"), Ok("efgh"), Ok("ijkl")]);
        let window = ByteWindow::new(0, 5);
        assert_eq!(body(assemble(source, window, object())).await, b"abcdef");
    }

    #[tokio::test]
    async fn stops_pulling_once_window_is_full() {
        // the trailing error would surface if the assembler kept reading
        let source = chunks(vec![
            Ok("abcd"),
            Err(GatewayError::Backend("should not be reached".into())),
        ]);
        let window = ByteWindow::new(10, 13);
        assert_eq!(body(assemble(source, window, object())).await, b"abcd");
    }

    #[tokio::test]
    async fn unknown_length_passes_everything_through() {
        let source = chunks(vec![Ok("ab"), Ok(""), Ok("cd")]);
        assert_eq!(body(assemble(source, None, object())).await, b"abcd");
    }

    #[tokio::test]
    async fn failure_ends_body_without_error_item() {
        let source = chunks(vec![
            Ok("abcd"),
            Err(GatewayError::Backend("connection reset".into())),
            Ok("efgh"),
        ]);
        let items: Vec<io::Result<Bytes>> = assemble(source, ByteWindow::new(0, 11), object())
            .collect()
            .await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), &Bytes::from_static(b"abcd"));
    }

    #[tokio::test]
    async fn short_source_ends_without_padding() {
        let source = chunks(vec![Ok("abc")]);
        assert_eq!(
            body(assemble(source, ByteWindow::new(0, 99), object())).await,
            b"abc"
        );
    }

    #[test]
    fn state_counts_bytes_and_chunks() {
        let mut state = StreamState::new(ByteWindow::new(0, 4));
        assert_eq!(state.admit(Bytes::from_static(b"abc")).len(), 3);
        assert_eq!(state.admit(Bytes::from_static(b"defg")).len(), 2);
        assert!(state.is_complete());
        assert_eq!(state.bytes_emitted, 5);
        assert_eq!(state.chunk_count, 2);
    }
}
