//! CLI for the adl batch downloader.

mod display;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use adl_core::config::{self, DownloaderConfig};
use adl_core::{DownloadRequest, Downloader};

use display::IndicatifSink;

/// Download a batch of files concurrently, resuming partial transfers.
#[derive(Debug, Parser)]
#[command(name = "adl", version)]
#[command(about = "adl: concurrent resumable batch downloader", long_about = None)]
pub struct Cli {
    /// URLs to download.
    #[arg(value_name = "URLS")]
    pub urls: Vec<String>,

    /// Read more requests from FILE, one `URL [NAME]` per line.
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Directory to save into (default: config value, else current directory).
    #[arg(short = 'o', long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Probes and transfers allowed at once.
    #[arg(short = 'n', long, value_name = "N")]
    pub concurrent_downloads: Option<usize>,

    /// Keep existing files whose size differs from the server's.
    #[arg(short = 'O', long)]
    pub no_overwrite: bool,

    /// Ignore `.part` files and always download from the start.
    #[arg(short = 'P', long)]
    pub no_partial: bool,

    /// Network timeout in seconds.
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Retry count at which a timing-out file aborts the batch.
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        cli.run(cli.apply(cfg)).await
    }

    /// Overrides config-file values with the flags that were given.
    pub fn apply(&self, mut cfg: DownloaderConfig) -> DownloaderConfig {
        if let Some(dir) = &self.download_dir {
            cfg.download_dir = Some(dir.clone());
        }
        if let Some(n) = self.concurrent_downloads {
            cfg.concurrent_downloads = n.max(1);
        }
        if self.no_overwrite {
            cfg.allow_overwrite = false;
        }
        if self.no_partial {
            cfg.allow_partial = false;
        }
        if let Some(secs) = self.timeout {
            cfg.timeout_secs = secs;
        }
        if let Some(retries) = self.retries {
            let mut retry = cfg.retry_config();
            retry.max_retries = retries;
            cfg.retry = Some(retry);
        }
        cfg
    }

    /// Positional URLs followed by the lines of `--input`.
    pub fn requests(&self) -> Result<Vec<DownloadRequest>> {
        let mut requests: Vec<DownloadRequest> =
            self.urls.iter().map(|u| DownloadRequest::new(u.as_str())).collect();
        if let Some(path) = &self.input {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            requests.extend(text.lines().filter_map(DownloadRequest::parse_line));
        }
        if requests.is_empty() {
            bail!("no URLs given (pass them as arguments or with --input)");
        }
        Ok(requests)
    }

    async fn run(&self, cfg: DownloaderConfig) -> Result<()> {
        let requests = self.requests()?;
        let sink = Arc::new(IndicatifSink::new());
        let downloader = Downloader::new(cfg).with_sink(sink.clone());

        let mut stream = downloader.stream(requests).await?;
        let mut failure = None;
        while let Some(item) = stream.next().await {
            match item {
                Ok(path) => sink.print_path(&path),
                Err(e) => failure = Some(e),
            }
        }
        sink.finish();

        match failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests;
