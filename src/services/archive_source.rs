//! src/services/archive_source.rs
//!
//! ArchiveSource: a [`MediaSource`] over a local mirror of the messaging
//! backend. SQLite holds the container and message index; payloads live on
//! disk beneath `base_path`, addressed by the relative `storage_path` stored
//! with each message. Reads honor exact byte offsets.

use crate::{
    models::{
        archive::{ContainerRecord, MessageRecord},
        media::{ContainerId, MediaDescriptor, MediaKind, ObjectRef},
    },
    services::media_source::{
        MediaSource, SourceChunks, SourceCheck, SourceError, SourceResult,
    },
};
use async_trait::async_trait;
use futures::StreamExt;
use sqlx::SqlitePool;
use std::{
    io::{self, SeekFrom},
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::{AsyncRead, AsyncReadExt, AsyncSeekExt},
};
use tokio_util::io::ReaderStream;
use tracing::debug;

const MAX_STORAGE_PATH_LEN: usize = 1024;

#[derive(Clone)]
pub struct ArchiveSource {
    /// Shared SQLite connection pool holding the archive index.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where payloads are stored.
    pub base_path: PathBuf,
}

impl ArchiveSource {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Reject stored paths that could escape `base_path`.
    fn ensure_path_safe(&self, storage_path: &str) -> SourceResult<()> {
        let invalid = || SourceError::Backend(format!("invalid storage path `{}`", storage_path));
        if storage_path.is_empty() || storage_path.len() > MAX_STORAGE_PATH_LEN {
            return Err(invalid());
        }
        if storage_path
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\')
        {
            return Err(invalid());
        }
        if !Path::new(storage_path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(invalid());
        }
        Ok(())
    }

    fn payload_path(&self, storage_path: &str) -> SourceResult<PathBuf> {
        self.ensure_path_safe(storage_path)?;
        Ok(self.base_path.join(storage_path))
    }

    /// Look up a container by numeric id or alias.
    ///
    /// Unknown and restricted containers are both access failures: the
    /// backend cannot tell the two apart either.
    async fn fetch_container(&self, container: &ContainerId) -> SourceResult<ContainerRecord> {
        let query = match container {
            ContainerId::Numeric(id) => sqlx::query_as::<sqlx::Sqlite, ContainerRecord>(
                "SELECT id, alias, title, restricted FROM containers WHERE id = ?",
            )
            .bind(*id),
            ContainerId::Alias(alias) => sqlx::query_as::<sqlx::Sqlite, ContainerRecord>(
                "SELECT id, alias, title, restricted FROM containers WHERE alias = ? COLLATE NOCASE",
            )
            .bind(alias.trim_start_matches('@').to_string()),
        };

        let record = query
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => SourceError::AccessDenied(format!(
                    "container `{}` is not accessible",
                    container
                )),
                other => SourceError::Sqlx(other),
            })?;

        if record.restricted {
            return Err(SourceError::AccessDenied(format!(
                "container `{}` is restricted",
                container
            )));
        }
        Ok(record)
    }

    async fn fetch_message(
        &self,
        container: &ContainerRecord,
        object: &ObjectRef,
    ) -> SourceResult<MessageRecord> {
        sqlx::query_as::<_, MessageRecord>(
            "SELECT container_id, message_id, kind, file_name, mime_type, size_bytes, storage_path
             FROM messages WHERE container_id = ? AND message_id = ?",
        )
        .bind(container.id)
        .bind(object.object_id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => SourceError::NotFound(format!("message {}", object)),
            other => SourceError::Sqlx(other),
        })
    }

    /// Resolve `object` to its message row, failing with `NoMedia` for
    /// messages without a payload.
    async fn media_message(&self, object: &ObjectRef) -> SourceResult<(MediaKind, MessageRecord)> {
        let container = self.fetch_container(&object.container).await?;
        let message = self.fetch_message(&container, object).await?;
        let kind = match message.kind.as_deref() {
            None => return Err(SourceError::NoMedia(format!("message {}", object))),
            Some(tag) => MediaKind::from_tag(tag).unwrap_or(MediaKind::Document),
        };
        Ok((kind, message))
    }
}

#[async_trait]
impl MediaSource for ArchiveSource {
    async fn object_metadata(&self, object: &ObjectRef) -> SourceResult<MediaDescriptor> {
        let (kind, message) = self.media_message(object).await?;
        Ok(MediaDescriptor {
            kind,
            size_bytes: message.size_bytes.max(0) as u64,
            mime_type: message.mime_type,
            file_name: message.file_name,
        })
    }

    async fn fetch_chunks(
        &self,
        object: &ObjectRef,
        offset: u64,
        limit: Option<u64>,
        chunk_size: usize,
    ) -> SourceResult<SourceChunks> {
        let (_, message) = self.media_message(object).await?;
        let storage_path = message
            .storage_path
            .as_deref()
            .ok_or_else(|| SourceError::NoMedia(format!("message {}", object)))?;
        let path = self.payload_path(storage_path)?;

        let mut file = File::open(&path).await.map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                SourceError::NotFound(format!("payload of message {}", object))
            } else {
                SourceError::Io(err)
            }
        })?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await?;
        }
        debug!(
            "reading {} from offset {} (limit {:?})",
            path.display(),
            offset,
            limit
        );

        let reader: Box<dyn AsyncRead + Send + Unpin> = match limit {
            Some(limit) => Box::new(file.take(limit)),
            None => Box::new(file),
        };
        let chunks = ReaderStream::with_capacity(reader, chunk_size.max(1))
            .map(|chunk| chunk.map_err(SourceError::Io));

        Ok(SourceChunks {
            first_byte: offset,
            chunks: Box::pin(chunks),
        })
    }

    async fn checks(&self) -> Vec<SourceCheck> {
        let sqlite = match sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await
        {
            Ok(1) => SourceCheck {
                name: "sqlite",
                ok: true,
                error: None,
            },
            Ok(v) => SourceCheck {
                name: "sqlite",
                ok: false,
                error: Some(format!("unexpected result: {}", v)),
            },
            Err(e) => SourceCheck {
                name: "sqlite",
                ok: false,
                error: Some(format!("error: {}", e)),
            },
        };

        let archive = match fs::metadata(&self.base_path).await {
            Ok(meta) if meta.is_dir() => SourceCheck {
                name: "archive",
                ok: true,
                error: None,
            },
            Ok(_) => SourceCheck {
                name: "archive",
                ok: false,
                error: Some(format!("{} is not a directory", self.base_path.display())),
            },
            Err(e) => SourceCheck {
                name: "archive",
                ok: false,
                error: Some(format!("could not stat archive root: {}", e)),
            },
        };

        vec![sqlite, archive]
    }
}

/// Apply a `;`-separated SQL script statement by statement.
pub async fn apply_migration(db: &SqlitePool, sql: &str) -> SourceResult<usize> {
    let statements = sql
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    for stmt in &statements {
        debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(statements.len())
}
