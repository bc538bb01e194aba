use crate::services::{
    gateway::GatewaySettings,
    planner::{Disposition, RangeMode, StreamPolicy},
};
use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, fmt::Display, str::FromStr, time::Duration};

const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub archive_dir: String,
    pub database_url: String,
    pub chunk_size: usize,
    pub max_range_bytes: u64,
    pub fetch_timeout_secs: u64,
    pub stream_range_mode: RangeMode,
    pub download_range_mode: RangeMode,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Range-aware media streaming gateway")]
pub struct Args {
    /// Host to bind to (overrides MEDIA_RELAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides MEDIA_RELAY_PORT, then PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Root directory of archived payloads (overrides MEDIA_RELAY_ARCHIVE_DIR)
    #[arg(long)]
    pub archive_dir: Option<String>,

    /// Archive index database URL (overrides MEDIA_RELAY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Largest chunk sent to the client, in bytes (overrides MEDIA_RELAY_CHUNK_SIZE)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Cap on the length of a single ranged response, 0 for none
    /// (overrides MEDIA_RELAY_MAX_RANGE_BYTES)
    #[arg(long)]
    pub max_range_bytes: Option<u64>,

    /// Timeout for each backend call in seconds, 0 disables
    /// (overrides MEDIA_RELAY_FETCH_TIMEOUT_SECS)
    #[arg(long)]
    pub fetch_timeout_secs: Option<u64>,

    /// Range handling on /stream (overrides MEDIA_RELAY_STREAM_RANGE_MODE)
    #[arg(long, value_enum)]
    pub stream_range_mode: Option<RangeMode>,

    /// Range handling on /dl (overrides MEDIA_RELAY_DOWNLOAD_RANGE_MODE)
    #[arg(long, value_enum)]
    pub download_range_mode: Option<RangeMode>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::merge(args, |name| env::var(name))?;
        Ok((cfg, migrate))
    }

    /// Merge CLI args over values read through `lookup`.
    fn merge<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        // --- Environment fallback ---
        let env_host = lookup("MEDIA_RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env_value(&lookup, "MEDIA_RELAY_PORT")? {
            Some(port) => Some(port),
            None => env_value(&lookup, "PORT")?,
        }
        .unwrap_or(8000);
        let env_archive =
            lookup("MEDIA_RELAY_ARCHIVE_DIR").unwrap_or_else(|_| "./data/media".into());
        let env_db = lookup("MEDIA_RELAY_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/media_relay.db".into());
        let env_chunk =
            env_value(&lookup, "MEDIA_RELAY_CHUNK_SIZE")?.unwrap_or(DEFAULT_CHUNK_SIZE);
        let env_max_range = env_value(&lookup, "MEDIA_RELAY_MAX_RANGE_BYTES")?.unwrap_or(0);
        let env_timeout = env_value(&lookup, "MEDIA_RELAY_FETCH_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);
        let env_stream_mode =
            env_mode(&lookup, "MEDIA_RELAY_STREAM_RANGE_MODE")?.unwrap_or(RangeMode::Honor);
        let env_download_mode =
            env_mode(&lookup, "MEDIA_RELAY_DOWNLOAD_RANGE_MODE")?.unwrap_or(RangeMode::Ignore);

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            archive_dir: args.archive_dir.unwrap_or(env_archive),
            database_url: args.database_url.unwrap_or(env_db),
            chunk_size: args.chunk_size.unwrap_or(env_chunk),
            max_range_bytes: args.max_range_bytes.unwrap_or(env_max_range),
            fetch_timeout_secs: args.fetch_timeout_secs.unwrap_or(env_timeout),
            stream_range_mode: args.stream_range_mode.unwrap_or(env_stream_mode),
            download_range_mode: args.download_range_mode.unwrap_or(env_download_mode),
        };

        if cfg.chunk_size == 0 {
            bail!("chunk size must be at least one byte");
        }
        if cfg.download_range_mode == RangeMode::Honor {
            bail!("the download endpoint never honors ranges; use ignore or fallback");
        }
        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        (self.fetch_timeout_secs > 0).then(|| Duration::from_secs(self.fetch_timeout_secs))
    }

    /// Endpoint policies and shared tunables for `GatewayService`.
    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            chunk_size: self.chunk_size,
            fetch_timeout: self.fetch_timeout(),
            stream_policy: StreamPolicy {
                range_mode: self.stream_range_mode,
                disposition: Disposition::Inline,
                max_range_bytes: self.max_range_bytes,
            },
            download_policy: StreamPolicy {
                range_mode: self.download_range_mode,
                disposition: Disposition::Attachment,
                max_range_bytes: self.max_range_bytes,
            },
        }
    }
}

/// Read and parse an optional variable; present-but-invalid is an error.
fn env_value<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Result<String, env::VarError>,
{
    match lookup(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| anyhow::anyhow!("{}", err))
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

fn env_mode<F>(lookup: &F, name: &str) -> Result<Option<RangeMode>>
where
    F: Fn(&str) -> Result<String, env::VarError>,
{
    match lookup(name) {
        Ok(value) => <RangeMode as ValueEnum>::from_str(value.trim(), true)
            .map(Some)
            .map_err(|err| anyhow::anyhow!("{}", err))
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
