//! Core data models for the media relay.
//!
//! `media` holds the per-request types that flow through the streaming
//! pipeline; `archive` maps the SQLite index of the bundled archive backend
//! via `sqlx::FromRow`.

pub mod archive;
pub mod media;
