//! Locate → Fetch → Transcode for one request.
//!
//! Steps run strictly in sequence inside a per-request [`Workspace`] and under
//! a single deadline. Child processes are spawned with `kill_on_drop`, so a
//! request abandoned at the deadline also tears down its browser, extractor
//! or encoder.

mod workspace;

pub use workspace::Workspace;

use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::fetch::{FetchError, Fetcher, HttpClient, HttpConfig, HttpError};
use crate::locator::{
    HeadlessChrome, LocateError, Locator, MediaExtractor, Renderer, SourceUrl, SourceUrlError,
    YtDlp,
};
use crate::observability::Metrics;
use crate::transcode::{
    Ffmpeg, MediaToolkit, SizeBudget, TranscodeError, TranscodeReport, Transcoder,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidSource(#[from] SourceUrlError),

    #[error("{0} is currently unsupported")]
    BlockedHost(String),

    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("transcode failed: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("workspace I/O on {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),
}

impl PipelineError {
    /// The client's input was the problem, not the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidSource(_)
                | PipelineError::BlockedHost(_)
                | PipelineError::Locate(LocateError::NoMediaFound { .. })
        )
    }
}

/// External tools the pipeline drives. Swapped for stubs in tests.
#[derive(Clone)]
pub struct Capabilities {
    pub renderer: Arc<dyn Renderer>,
    pub extractor: Arc<dyn MediaExtractor>,
    pub toolkit: Arc<dyn MediaToolkit>,
}

impl Capabilities {
    pub fn from_config(config: &Config) -> Self {
        Self {
            renderer: Arc::new(HeadlessChrome::new(&config.locator.browser_bin)),
            extractor: Arc::new(YtDlp::new(
                &config.locator.extractor_bin,
                &config.locator.extractor_format,
            )),
            toolkit: Arc::new(Ffmpeg::from_config(&config.transcode)),
        }
    }
}

/// Compressed result ready to send
#[derive(Debug, Clone)]
pub struct CompressedVideo {
    pub file_name: String,
    pub bytes: Bytes,
    pub report: TranscodeReport,
}

pub struct Pipeline {
    locator: Locator,
    fetcher: Fetcher,
    transcoder: Transcoder,
    output_dir: PathBuf,
    deadline: Duration,
    metrics: Arc<Metrics>,
}

impl Pipeline {
    pub fn build(
        config: &Config,
        capabilities: Capabilities,
        metrics: Arc<Metrics>,
    ) -> Result<Self, HttpError> {
        let http = HttpClient::new(HttpConfig::from(&config.fetch))?;
        let locator = Locator::from_config(
            &config.locator,
            capabilities.renderer,
            capabilities.extractor.clone(),
            metrics.clone(),
        );

        info!(
            strategies = ?locator.strategy_order(),
            target_size = %config.transcode.target_size,
            output_dir = %config.workspace.output_dir.display(),
            "Pipeline ready"
        );

        Ok(Self {
            locator,
            fetcher: Fetcher::new(http, capabilities.extractor),
            transcoder: Transcoder::new(
                capabilities.toolkit,
                SizeBudget::from(&config.transcode),
            ),
            output_dir: config.workspace.output_dir.clone(),
            deadline: config.server.request_deadline(),
            metrics,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Validate `raw_url` and run the whole pipeline under the request deadline.
    ///
    /// Validation failures return before any filesystem or network activity.
    pub async fn run(&self, raw_url: &str) -> Result<CompressedVideo, PipelineError> {
        let source = SourceUrl::parse(raw_url)?;
        if let Some(entry) = self.locator.blocked_entry(&source) {
            return Err(PipelineError::BlockedHost(entry.to_string()));
        }

        self.metrics.request_accepted();

        let result = match tokio::time::timeout(self.deadline, self.execute(&source)).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::DeadlineExceeded(self.deadline)),
        };

        match &result {
            Ok(video) => {
                self.metrics.request_succeeded();
                info!(
                    url = %source,
                    file = %video.file_name,
                    bytes = video.bytes.len(),
                    "Request completed"
                );
            }
            Err(e) if e.is_client_error() => {
                self.metrics.request_failed();
                warn!(url = %source, error = %e, "Request rejected");
            }
            Err(e) => {
                self.metrics.request_failed();
                error!(url = %source, error = %e, "Request failed");
            }
        }

        result
    }

    async fn execute(&self, source: &SourceUrl) -> Result<CompressedVideo, PipelineError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| workspace_error(&self.output_dir, e))?;

        let workspace = Workspace::allocate(&self.output_dir);

        let location = self.locator.locate(source).await?;
        let raw = self.fetcher.fetch(&location, workspace.raw_path()).await?;
        let report = self
            .transcoder
            .transcode(raw, workspace.compressed_path())
            .await?;

        workspace
            .discard_raw()
            .await
            .map_err(|e| workspace_error(workspace.raw_path(), e))?;

        let bytes = tokio::fs::read(workspace.compressed_path())
            .await
            .map_err(|e| workspace_error(workspace.compressed_path(), e))?;

        Ok(CompressedVideo {
            file_name: workspace.file_name(),
            bytes: Bytes::from(bytes),
            report,
        })
    }
}

fn workspace_error(path: &Path, source: std::io::Error) -> PipelineError {
    PipelineError::Workspace {
        path: path.to_path_buf(),
        source,
    }
}
