//! Streaming pipeline and the backends it reads from.

pub mod archive_source;
pub mod assembler;
pub mod fetcher;
pub mod gateway;
pub mod locator;
pub mod media_source;
pub mod metadata;
pub mod planner;
pub mod range;
