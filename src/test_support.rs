//! In-memory [`MediaSource`] for exercising the pipeline without a backend.

use crate::{
    models::media::{MediaDescriptor, MediaKind, ObjectRef},
    services::media_source::{MediaSource, SourceChunks, SourceError, SourceResult},
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

/// Deterministic, non-repeating-looking payload of `len` bytes.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + i / 251) % 251) as u8).collect()
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Media,
    Missing,
    NoMedia,
    Denied,
}

pub struct FakeSource {
    data: Bytes,
    outcome: Outcome,
    report_size: bool,
    kind: MediaKind,
    mime: Option<String>,
    name: Option<String>,
    alignment: u64,
    source_chunk: usize,
    fail_after: Option<u64>,
    metadata_delay: Option<Duration>,
    chunk_delay: Option<Duration>,
    offsets: Mutex<Vec<u64>>,
    pulled: Arc<AtomicUsize>,
}

impl FakeSource {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Bytes::from(data),
            outcome: Outcome::Media,
            report_size: true,
            kind: MediaKind::Document,
            mime: None,
            name: None,
            alignment: 0,
            source_chunk: 0,
            fail_after: None,
            metadata_delay: None,
            chunk_delay: None,
            offsets: Mutex::new(Vec::new()),
            pulled: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_outcome(outcome: Outcome) -> Self {
        Self {
            outcome,
            ..Self::new(Vec::new())
        }
    }

    pub fn missing() -> Self {
        Self::with_outcome(Outcome::Missing)
    }

    pub fn without_media() -> Self {
        Self::with_outcome(Outcome::NoMedia)
    }

    pub fn denied() -> Self {
        Self::with_outcome(Outcome::Denied)
    }

    pub fn with_mime(mut self, mime: &str) -> Self {
        self.mime = Some(mime.to_string());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }

    /// Report size 0, as backends do for media of unknown length.
    pub fn with_unknown_size(mut self) -> Self {
        self.report_size = false;
        self
    }

    /// Only start reads at multiples of `alignment`.
    pub fn with_alignment(mut self, alignment: u64) -> Self {
        self.alignment = alignment;
        self
    }

    /// Produce chunks of this size regardless of what the caller asks for.
    pub fn with_source_chunk(mut self, size: usize) -> Self {
        self.source_chunk = size;
        self
    }

    /// Fail the stream once this many bytes have been produced.
    pub fn failing_after(mut self, bytes: u64) -> Self {
        self.fail_after = Some(bytes);
        self
    }

    pub fn with_metadata_delay(mut self, delay: Duration) -> Self {
        self.metadata_delay = Some(delay);
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Chunks handed out so far; counted as each one is polled.
    pub fn chunks_pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    /// Offsets passed to `fetch_chunks`, in call order.
    pub fn requested_offsets(&self) -> Vec<u64> {
        self.offsets.lock().unwrap().clone()
    }

    fn check_outcome(&self, object: &ObjectRef) -> SourceResult<()> {
        match self.outcome {
            Outcome::Media => Ok(()),
            Outcome::Missing => Err(SourceError::NotFound(format!("message {}", object))),
            Outcome::NoMedia => Err(SourceError::NoMedia(format!("message {}", object))),
            Outcome::Denied => Err(SourceError::AccessDenied("CHANNEL_PRIVATE".into())),
        }
    }
}

#[async_trait]
impl MediaSource for FakeSource {
    async fn object_metadata(&self, object: &ObjectRef) -> SourceResult<MediaDescriptor> {
        if let Some(delay) = self.metadata_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_outcome(object)?;
        Ok(MediaDescriptor {
            kind: self.kind,
            size_bytes: if self.report_size {
                self.data.len() as u64
            } else {
                0
            },
            mime_type: self.mime.clone(),
            file_name: self.name.clone(),
        })
    }

    async fn fetch_chunks(
        &self,
        object: &ObjectRef,
        offset: u64,
        limit: Option<u64>,
        chunk_size: usize,
    ) -> SourceResult<SourceChunks> {
        self.check_outcome(object)?;
        self.offsets.lock().unwrap().push(offset);

        let len = self.data.len() as u64;
        let first_byte = match self.alignment {
            0 => offset,
            align => offset - offset % align,
        }
        .min(len);
        let end = limit.map_or(len, |limit| (offset + limit).min(len));
        let piece = if self.source_chunk > 0 {
            self.source_chunk
        } else {
            chunk_size
        } as u64;

        let mut items: Vec<SourceResult<Bytes>> = Vec::new();
        let mut pos = first_byte;
        let mut produced = 0u64;
        while pos < end {
            let mut next = (pos + piece).min(end);
            if let Some(fail_after) = self.fail_after {
                if produced >= fail_after {
                    items.push(Err(SourceError::Backend("FILE_REFERENCE_EXPIRED".into())));
                    break;
                }
                next = next.min(pos + (fail_after - produced));
            }
            items.push(Ok(self.data.slice(pos as usize..next as usize)));
            produced += next - pos;
            pos = next;
        }

        let delay = self.chunk_delay;
        let pulled = self.pulled.clone();
        let chunks = stream::iter(items).then(move |item| {
            pulled.fetch_add(1, Ordering::SeqCst);
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                item
            }
        });

        Ok(SourceChunks {
            first_byte,
            chunks: Box::pin(chunks),
        })
    }
}
