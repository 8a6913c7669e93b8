//! Persists a located media resource to local storage.
//!
//! Locations found by the browser or the direct extractor are streamed by
//! [`HttpClient`]. `GenericFallback` locations are handed back to the
//! extractor, which downloads the original page URL on its own. Either way
//! the result is a single file at the requested path.

pub mod http;

pub use http::{HttpClient, HttpConfig, HttpError};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::locator::{ExtractError, MediaExtractor, MediaLocation, StrategyKind};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("extractor download failed: {0}")]
    Extractor(#[from] ExtractError),

    #[error("destination {} already exists", .0.display())]
    DestinationExists(PathBuf),

    #[error("expected download at {} but no file was written", .0.display())]
    MissingOutput(PathBuf),

    #[error("download at {} is empty", .0.display())]
    Empty(PathBuf),
}

/// A media file on local disk, owned by the request that fetched it.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMediaFile {
    pub path: PathBuf,
    pub byte_size: u64,
    /// Known once the transcoder has probed the file
    pub duration_seconds: Option<f64>,
}

impl LocalMediaFile {
    pub fn new(path: PathBuf, byte_size: u64) -> Self {
        Self {
            path,
            byte_size,
            duration_seconds: None,
        }
    }
}

pub struct Fetcher {
    http: HttpClient,
    extractor: Arc<dyn MediaExtractor>,
}

impl Fetcher {
    pub fn new(http: HttpClient, extractor: Arc<dyn MediaExtractor>) -> Self {
        Self { http, extractor }
    }

    pub async fn fetch(
        &self,
        location: &MediaLocation,
        dest: &Path,
    ) -> Result<LocalMediaFile, FetchError> {
        if tokio::fs::try_exists(dest).await.unwrap_or(false) {
            return Err(FetchError::DestinationExists(dest.to_path_buf()));
        }

        let byte_size = match location.strategy() {
            StrategyKind::GenericFallback => {
                self.extractor.download(location.source().url(), dest).await?;
                match tokio::fs::metadata(dest).await {
                    Ok(meta) if meta.is_file() => meta.len(),
                    _ => return Err(FetchError::MissingOutput(dest.to_path_buf())),
                }
            }
            StrategyKind::BrowserScrape | StrategyKind::DirectExtractor => {
                self.http.stream_to_file(location.resolved_uri(), dest).await?
            }
        };

        if byte_size == 0 {
            return Err(FetchError::Empty(dest.to_path_buf()));
        }

        info!(
            url = %location.source(),
            strategy = %location.strategy(),
            dest = %dest.display(),
            size = byte_size,
            "Media fetched"
        );

        Ok(LocalMediaFile::new(dest.to_path_buf(), byte_size))
    }
}
