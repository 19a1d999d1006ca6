//! Process configuration, read once from the environment (and `.env`).

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BUCKET: &str = "investing-data-bucket";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Gcs,
    Local,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gcs" => Ok(StorageBackend::Gcs),
            "local" => Ok(StorageBackend::Local),
            other => Err(anyhow!("unknown storage backend `{}` (expected gcs or local)", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bucket: String,
    pub gcs_access_token: Option<String>,
    /// Alternative GCS endpoint, e.g. `http://localhost:4443` for an emulator
    pub gcs_base_url: Option<String>,
    pub backend: StorageBackend,
    pub local_output_dir: PathBuf,
    pub render_timeout: Duration,
    pub poll_interval: Duration,
    pub max_concurrent: usize,
    pub cron: Option<String>,
    pub user_agent: String,
}

impl Settings {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            bucket: get("GCS_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            gcs_access_token: get("GCS_ACCESS_TOKEN"),
            gcs_base_url: get("GCS_BASE_URL"),
            backend: get("STORAGE_BACKEND")
                .map(|v| v.parse::<StorageBackend>())
                .transpose()?
                .unwrap_or(StorageBackend::Gcs),
            local_output_dir: get("LOCAL_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./output")),
            render_timeout: Duration::from_secs(parse_or(get("RENDER_TIMEOUT_SECS"), "RENDER_TIMEOUT_SECS", 30)?),
            poll_interval: Duration::from_millis(parse_or(get("RENDER_POLL_MILLIS"), "RENDER_POLL_MILLIS", 1000)?),
            max_concurrent: parse_or(get("MAX_CONCURRENT_RENDERS"), "MAX_CONCURRENT_RENDERS", 1)?,
            cron: get("SCRAPE_CRON"),
            user_agent: get("USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v.trim().parse().with_context(|| format!("{} must be a number, got `{}`", key, v)),
        None => Ok(default),
    }
}
