//! MetadataResolver: backend header → [`ObjectMetadata`].

use crate::{
    models::media::{ObjectMetadata, ObjectRef},
    services::{
        gateway::{GatewayResult, bounded},
        media_source::MediaSource,
    },
};
use std::{sync::Arc, time::Duration};

const FALLBACK_MIME: &str = "application/octet-stream";

pub struct MetadataResolver {
    source: Arc<dyn MediaSource>,
    timeout: Option<Duration>,
}

impl MetadataResolver {
    pub fn new(source: Arc<dyn MediaSource>, timeout: Option<Duration>) -> Self {
        Self { source, timeout }
    }

    /// Fetch the message header for `object` and fill in display name and
    /// MIME type.
    ///
    /// MIME precedence: backend value, then the display name's extension,
    /// then `application/octet-stream`.
    pub async fn resolve(&self, object: &ObjectRef) -> GatewayResult<ObjectMetadata> {
        let descriptor = bounded(self.timeout, self.source.object_metadata(object)).await??;

        let display_name = descriptor
            .file_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| descriptor.kind.default_file_name(object.object_id));

        let mime_type = descriptor
            .mime_type
            .filter(|mime| !mime.is_empty() && mime != FALLBACK_MIME)
            .or_else(|| mime_from_name(&display_name).map(str::to_string))
            .unwrap_or_else(|| FALLBACK_MIME.to_string());

        Ok(ObjectMetadata {
            total_size: descriptor.size_bytes,
            mime_type,
            display_name,
        })
    }
}

/// Guess a MIME type from the file extension of `name`.
pub fn mime_from_name(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    let mime = match ext.to_ascii_lowercase().as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "ts" => "video/mp2t",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "flac" => "audio/flac",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "txt" => "text/plain",
        "srt" => "application/x-subrip",
        _ => return None,
    };
    Some(mime)
}
