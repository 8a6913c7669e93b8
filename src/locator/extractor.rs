//! Generic site-aware extractor (yt-dlp) used both to resolve stream URIs and
//! to download pages the fetcher cannot stream by itself.

use async_trait::async_trait;
use std::path::Path;
use std::process::{Output, Stdio};
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;
use url::Url;

use super::traits::{LocateStrategy, StrategyError, StrategyOutcome};
use super::types::{MediaLocation, SourceUrl, StrategyKind};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to run extractor '{bin}': {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("extractor exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("extractor returned no playable stream")]
    NoStream,
}

/// Capability that understands many hosting-site conventions.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Best progressive stream URI for `page`
    async fn resolve(&self, page: &Url) -> Result<Url, ExtractError>;

    /// Select a format and download `page` to exactly `dest`
    async fn download(&self, page: &Url, dest: &Path) -> Result<(), ExtractError>;
}

/// Drives the `yt-dlp` command line.
#[derive(Debug, Clone)]
pub struct YtDlp {
    bin: String,
    format: String,
}

impl YtDlp {
    pub fn new(bin: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            format: format.into(),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.bin);
        command
            .arg("--format")
            .arg(&self.format)
            .arg("--no-playlist")
            .arg("--no-check-certificates")
            .arg("--geo-bypass")
            .arg("--quiet")
            .arg("--no-warnings")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn run(&self, mut command: Command) -> Result<Output, ExtractError> {
        let output = command.output().await.map_err(|source| ExtractError::Spawn {
            bin: self.bin.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(ExtractError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

#[async_trait]
impl MediaExtractor for YtDlp {
    async fn resolve(&self, page: &Url) -> Result<Url, ExtractError> {
        let mut command = self.command();
        command.arg("--get-url").arg(page.as_str());

        let output = self.run(command).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(page = %page, "Extractor resolved stream");

        first_stream_url(&stdout).ok_or(ExtractError::NoStream)
    }

    async fn download(&self, page: &Url, dest: &Path) -> Result<(), ExtractError> {
        let mut command = self.command();
        command
            .arg("--restrict-filenames")
            .arg("--no-part")
            .arg("--output")
            .arg(dest)
            .arg(page.as_str());

        self.run(command).await?;
        debug!(page = %page, dest = %dest.display(), "Extractor download finished");
        Ok(())
    }
}

/// yt-dlp prints one URL per selected format; with a single progressive
/// format selected the first http(s) line is the stream. HLS and DASH
/// manifests are not byte streams and count as no stream.
fn first_stream_url(stdout: &str) -> Option<Url> {
    let url = stdout
        .lines()
        .map(str::trim)
        .filter_map(|line| Url::parse(line).ok())
        .find(|url| matches!(url.scheme(), "http" | "https"))?;

    let path = url.path().to_ascii_lowercase();
    let manifest = path.ends_with(".m3u8") || path.ends_with(".mpd");
    (!manifest).then_some(url)
}

/// Locate strategy backed by a [`MediaExtractor`].
///
/// Registered as `DirectExtractor` the resolved URI is streamed by the
/// fetcher; registered as `GenericFallback` the fetcher hands the page URL
/// back to the extractor's own downloader.
pub struct ExtractorStrategy {
    extractor: Arc<dyn MediaExtractor>,
    kind: StrategyKind,
}

impl ExtractorStrategy {
    pub fn direct(extractor: Arc<dyn MediaExtractor>) -> Self {
        Self {
            extractor,
            kind: StrategyKind::DirectExtractor,
        }
    }

    pub fn generic_fallback(extractor: Arc<dyn MediaExtractor>) -> Self {
        Self {
            extractor,
            kind: StrategyKind::GenericFallback,
        }
    }
}

#[async_trait]
impl LocateStrategy for ExtractorStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn attempt(&self, source: &SourceUrl) -> StrategyOutcome {
        match self.extractor.resolve(source.url()).await {
            Ok(uri) => {
                StrategyOutcome::Success(MediaLocation::new(source.clone(), uri, self.kind))
            }
            Err(ExtractError::Spawn { bin, source: err }) => {
                StrategyOutcome::HardFail(StrategyError::CapabilityUnavailable {
                    capability: "extractor",
                    reason: format!("{bin}: {err}"),
                })
            }
            Err(e) => StrategyOutcome::SoftFail(e.to_string()),
        }
    }
}
