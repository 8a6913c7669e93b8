//! HTTP client that streams media bodies straight to disk

use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::config::FetchConfig;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("request to {uri} failed: {reason}")]
    RequestFailed { uri: String, reason: String },

    #[error("{uri} answered HTTP {status}")]
    Status { uri: String, status: StatusCode },

    #[error("connection to {uri} timed out")]
    Timeout { uri: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, HttpError>;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub chunk_size: usize,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            chunk_size: 8 * 1024,
            user_agent: concat!("smolvid/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl From<&FetchConfig> for HttpConfig {
    fn from(config: &FetchConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            chunk_size: usize::try_from(config.chunk_size.as_u64()).unwrap_or(usize::MAX),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Streaming downloader.
///
/// No overall request timeout is set: bodies can be hundreds of megabytes and
/// the caller bounds the whole request instead.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Stream `uri` into a new file at `dest`. Returns the number of bytes written.
    ///
    /// `dest` must not exist. On error the partially written file is left
    /// behind for the caller to clean up.
    pub async fn stream_to_file(&self, uri: &str, dest: &Path) -> Result<u64> {
        debug!(uri, dest = %dest.display(), "Starting download");

        let response = self.client.get(uri).send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout {
                    uri: uri.to_string(),
                }
            } else {
                HttpError::RequestFailed {
                    uri: uri.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                uri: uri.to_string(),
                status,
            });
        }

        let io_error = |source: std::io::Error| HttpError::Io {
            path: dest.to_path_buf(),
            source,
        };

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dest)
            .await
            .map_err(io_error)?;
        let mut writer = BufWriter::with_capacity(self.config.chunk_size, file);

        let mut written: u64 = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| HttpError::RequestFailed {
                uri: uri.to_string(),
                reason: format!("body stream interrupted: {e}"),
            })?;
            writer.write_all(&chunk).await.map_err(io_error)?;
            written += chunk.len() as u64;
        }
        writer.flush().await.map_err(io_error)?;

        debug!(uri, size = written, "Download completed");

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::ByteSize;

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.chunk_size, 8192);
        assert!(config.user_agent.starts_with("smolvid/"));
    }

    #[test]
    fn test_http_config_from_fetch_config() {
        let fetch = FetchConfig {
            connect_timeout_secs: 3,
            chunk_size: ByteSize(64 * 1024),
            user_agent: "test-agent".to_string(),
        };

        let config = HttpConfig::from(&fetch);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.chunk_size, 64 * 1024);
        assert_eq!(config.user_agent, "test-agent");
    }
}
