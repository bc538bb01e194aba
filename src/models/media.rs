//! Identifiers and metadata for media objects relayed from the backend.

use serde::Serialize;
use std::fmt;

/// The logical grouping an object lives in.
///
/// The backend treats numeric peer ids and `@alias` tokens differently, so an
/// alias is kept verbatim (including the leading `@`) and never coerced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContainerId {
    Numeric(i64),
    Alias(String),
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerId::Numeric(id) => write!(f, "{}", id),
            ContainerId::Alias(alias) => write!(f, "{}", alias),
        }
    }
}

/// Canonical reference to one media object: a container plus the message id
/// carrying the payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub container: ContainerId,
    pub object_id: i64,
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.object_id)
    }
}

/// Kind of media attached to a backend message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
    Photo,
    Voice,
    VideoNote,
    Animation,
    Document,
}

impl MediaKind {
    /// Parse the lowercase tag stored by the archive backend.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "video" => Some(MediaKind::Video),
            "audio" => Some(MediaKind::Audio),
            "photo" => Some(MediaKind::Photo),
            "voice" => Some(MediaKind::Voice),
            "video_note" => Some(MediaKind::VideoNote),
            "animation" => Some(MediaKind::Animation),
            "document" => Some(MediaKind::Document),
            _ => None,
        }
    }

    /// Display name used when the backend carries no file name.
    pub fn default_file_name(self, object_id: i64) -> String {
        match self {
            MediaKind::Video => format!("video_{}.mp4", object_id),
            MediaKind::Audio => format!("audio_{}.mp3", object_id),
            MediaKind::Photo => format!("photo_{}.jpg", object_id),
            MediaKind::Voice => format!("voice_{}.ogg", object_id),
            MediaKind::VideoNote => format!("video_note_{}.mp4", object_id),
            MediaKind::Animation => format!("animation_{}.mp4", object_id),
            MediaKind::Document => format!("document_{}", object_id),
        }
    }
}

/// Raw media description as reported by a [`MediaSource`].
///
/// [`MediaSource`]: crate::services::media_source::MediaSource
#[derive(Debug, Clone)]
pub struct MediaDescriptor {
    pub kind: MediaKind,
    /// Size in bytes; `0` when the backend does not know it.
    pub size_bytes: u64,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

/// Resolved, immutable metadata for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectMetadata {
    /// `0` means unknown length; ranging and Content-Length are disabled.
    pub total_size: u64,
    pub mime_type: String,
    pub display_name: String,
}

impl ObjectMetadata {
    pub fn size_known(&self) -> bool {
        self.total_size > 0
    }
}

/// Inclusive byte span a single response must deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteWindow {
    pub start: u64,
    pub end: u64,
}

impl ByteWindow {
    /// Build a window, rejecting `end < start`.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    // a window always holds at least one byte
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Shrink the window so it spans at most `max_len` bytes.
    pub fn capped(self, max_len: u64) -> Self {
        if max_len == 0 || self.len() <= max_len {
            return self;
        }
        Self {
            start: self.start,
            end: self.start + max_len - 1,
        }
    }
}

impl fmt::Display for ByteWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_len_is_inclusive() {
        let window = ByteWindow::new(1_000_000, 1_999_999).unwrap();
        assert_eq!(window.len(), 1_000_000);
        assert_eq!(ByteWindow::new(7, 7).unwrap().len(), 1);
        assert!(ByteWindow::new(8, 7).is_none());
    }

    #[test]
    fn capped_window_keeps_start() {
        let window = ByteWindow::new(100, 10_099).unwrap();
        assert_eq!(window.capped(0), window);
        assert_eq!(window.capped(50_000), window);
        assert_eq!(window.capped(1_000), ByteWindow { start: 100, end: 1_099 });
    }

    #[test]
    fn default_names_follow_kind() {
        assert_eq!(MediaKind::Video.default_file_name(12), "video_12.mp4");
        assert_eq!(MediaKind::VideoNote.default_file_name(3), "video_note_3.mp4");
        assert_eq!(MediaKind::Document.default_file_name(9), "document_9");
        assert_eq!(MediaKind::from_tag("voice"), Some(MediaKind::Voice));
        assert_eq!(MediaKind::from_tag("sticker"), None);
    }

    #[test]
    fn alias_displays_verbatim() {
        let object = ObjectRef {
            container: ContainerId::Alias("@Films".into()),
            object_id: 42,
        };
        assert_eq!(object.to_string(), "@Films/42");
    }
}
