//! HTTP transport: API queries, artifact fetches and reachability probes.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use reqwest::redirect::Policy;

use crate::config::InstallerConfig;
use crate::error::{InstallError, Result};

/// Maximum redirects followed for a single request.
const MAX_REDIRECTS: usize = 10;

/// Timeout for the HEAD reachability probe only.
const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Network operations the installers depend on.
pub trait Transport {
    /// GET `url` and return the body as text.
    fn get_text(&self, url: &str) -> Result<String>;

    /// GET `url` and stream the body into `dest`, returning the byte count.
    ///
    /// Fails with [`InstallError::DownloadFailed`] on transport errors and
    /// non-2xx terminal statuses.
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;

    /// Best-effort HEAD request used for diagnostics.
    fn probe(&self, url: &str) -> Result<()>;
}

/// `reqwest` blocking implementation of [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    show_progress: bool,
}

impl HttpTransport {
    /// Creates a client carrying the configured user agent.
    pub fn new(config: &InstallerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| InstallError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            show_progress: config.show_progress,
        })
    }
}

impl Transport for HttpTransport {
    fn get_text(&self, url: &str) -> Result<String> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(InstallError::Network(format!(
                "request to {url} failed with status {status}"
            )));
        }
        Ok(response.text()?)
    }

    fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        let failed = |reason: String| InstallError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        tracing::info!("Downloading {} to {}", url, dest.display());

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("server responded with status {status}")));
        }

        let total = response.content_length();
        let mut file = File::create(dest).map_err(|e| failed(e.to_string()))?;

        let written = if self.show_progress {
            let bar = progress_bar(total);
            let copied = io::copy(&mut response, &mut bar.wrap_write(&mut file));
            bar.finish_and_clear();
            copied
        } else {
            io::copy(&mut response, &mut file)
        }
        .map_err(|e| failed(e.to_string()))?;

        file.flush().map_err(|e| failed(e.to_string()))?;
        file.sync_all().map_err(|e| failed(e.to_string()))?;

        if let Some(expected) = total
            && expected != written
        {
            return Err(failed(format!(
                "connection closed after {} of {}",
                format_bytes(written),
                format_bytes(expected)
            )));
        }

        tracing::info!("Download complete: {}", format_bytes(written));
        Ok(written)
    }

    fn probe(&self, url: &str) -> Result<()> {
        let response = self.client.head(url).timeout(PROBE_TIMEOUT).send()?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(InstallError::Network(format!("HEAD {url} returned {status}")))
        }
    }
}

fn progress_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(len) => {
            let bar = ProgressBar::new(len);
            let style = ProgressStyle::with_template(
                "{bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
            bar.set_style(style);
            bar
        }
        None => {
            let bar = ProgressBar::new_spinner();
            let style = ProgressStyle::with_template("{spinner:.cyan} {bytes} ({bytes_per_sec})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            bar.set_style(style);
            bar
        }
    }
}

/// Format bytes as a human-readable string.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
