use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::DownloadError;

/// Largest accepted timeout or backoff ceiling, in seconds (one week).
pub const MAX_SECS: f64 = 7.0 * 24.0 * 3600.0;

/// Shortest network timeout the engine will use, in seconds.
const MIN_TIMEOUT_SECS: f64 = 0.001;

/// Seconds clamped into `[min, MAX_SECS]`; NaN falls back to `min`. Never panics.
pub(crate) fn clamped_secs(secs: f64, min: f64) -> Duration {
    let secs = if secs.is_nan() { min } else { secs.clamp(min, MAX_SECS) };
    Duration::from_secs_f64(secs)
}

fn check_secs(field: &str, secs: f64, min: f64) -> Result<(), DownloadError> {
    match Duration::try_from_secs_f64(secs) {
        Ok(_) if secs >= min && secs <= MAX_SECS => Ok(()),
        _ => Err(DownloadError::InvalidConfig(format!(
            "{field} must be between {min} and {MAX_SECS} seconds, got {secs}"
        ))),
    }
}

/// Retry policy parameters (optional `[retry]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retry count at which a timing-out file aborts the batch.
    pub max_retries: u32,
    /// Ceiling the backoff delay approaches, in seconds.
    pub delay_ceiling_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_ceiling_secs: 60.0,
        }
    }
}

/// Batch configuration loaded from `~/.config/adl/config.toml`; CLI flags override it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Directory downloads land in (None = current directory).
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Probes and fetches holding a connection at once.
    pub concurrent_downloads: usize,
    /// Re-download when the destination exists with a different size.
    pub allow_overwrite: bool,
    /// Continue from an existing `.part` file when the server supports ranges.
    pub allow_partial: bool,
    /// Network timeout applied to every probe and fetch, in seconds.
    pub timeout_secs: f64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            concurrent_downloads: 5,
            allow_overwrite: true,
            allow_partial: true,
            timeout_secs: 30.0,
            retry: None,
        }
    }
}

impl DownloaderConfig {
    pub fn timeout(&self) -> Duration {
        clamped_secs(self.timeout_secs, MIN_TIMEOUT_SECS)
    }

    /// Rejects timeouts and backoff ceilings that are negative, non-finite or
    /// longer than [`MAX_SECS`].
    pub fn validate(&self) -> Result<(), DownloadError> {
        check_secs("timeout_secs", self.timeout_secs, MIN_TIMEOUT_SECS)?;
        if let Some(retry) = &self.retry {
            check_secs("retry.delay_ceiling_secs", retry.delay_ceiling_secs, 0.0)?;
        }
        Ok(())
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    /// Absolute download directory.
    pub fn resolved_download_dir(&self) -> std::io::Result<PathBuf> {
        let dir = self.download_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        std::path::absolute(dir)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("adl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DownloaderConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DownloaderConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: DownloaderConfig = toml::from_str(&data)?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
