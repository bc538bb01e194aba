//! Rows of the local media archive index.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A container (channel, group or chat) mirrored into the archive.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct ContainerRecord {
    /// Numeric peer id as used by the messaging backend.
    pub id: i64,

    /// Public alias without the leading `@`, if the container has one.
    pub alias: Option<String>,

    /// Human readable title.
    pub title: Option<String>,

    /// Whether the account lost access to this container.
    pub restricted: bool,
}

/// One archived message and, when present, its media payload.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct MessageRecord {
    /// Parent container id.
    pub container_id: i64,

    /// Message id inside the container.
    pub message_id: i64,

    /// Media kind tag (`video`, `document`, ...); `NULL` for text-only messages.
    pub kind: Option<String>,

    /// Original file name attached by the sender.
    pub file_name: Option<String>,

    /// MIME type reported by the backend.
    pub mime_type: Option<String>,

    /// Payload size in bytes, `0` when unknown.
    pub size_bytes: i64,

    /// Payload path relative to the archive root.
    pub storage_path: Option<String>,
}
