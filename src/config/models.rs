use crate::humanize::ByteSize;
use crate::locator::StrategyKind;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub locator: LocatorConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub transcode: TranscodeConfig,
}

/// HTTP listener and per-request limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    /// Overridden by the bare `PORT` environment variable when set
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on locate + fetch + transcode for one request
    #[serde(default = "default_request_deadline_secs")]
    pub request_deadline_secs: u64,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_deadline_secs: default_request_deadline_secs(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    5000
}

fn default_request_deadline_secs() -> u64 {
    300
}

/// Where per-request raw and compressed files live
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("compressed_videos")
}

/// Strategy table for turning a page URL into a media URI
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocatorConfig {
    /// Evaluated in order; the first success wins
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyKind>,
    /// Hosts that reject non-browser clients. Subdomains match too.
    #[serde(default = "default_browser_domains")]
    pub browser_domains: Vec<String>,
    /// Hosts rejected with 400 before any work starts
    #[serde(default = "default_blocked_domains")]
    pub blocked_domains: Vec<String>,
    #[serde(default = "default_render_timeout_secs")]
    pub render_timeout_secs: u64,
    #[serde(default = "default_browser_bin")]
    pub browser_bin: String,
    #[serde(default = "default_extractor_bin")]
    pub extractor_bin: String,
    /// yt-dlp format selector. The default keeps plain http(s) MP4 formats
    /// only, since HLS and DASH entries are also labelled `mp4`.
    #[serde(default = "default_extractor_format")]
    pub extractor_format: String,
}

impl LocatorConfig {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
            browser_domains: default_browser_domains(),
            blocked_domains: default_blocked_domains(),
            render_timeout_secs: default_render_timeout_secs(),
            browser_bin: default_browser_bin(),
            extractor_bin: default_extractor_bin(),
            extractor_format: default_extractor_format(),
        }
    }
}

fn default_strategies() -> Vec<StrategyKind> {
    vec![StrategyKind::BrowserScrape, StrategyKind::GenericFallback]
}

fn default_browser_domains() -> Vec<String> {
    ["twitter.com", "x.com", "tiktok.com"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_blocked_domains() -> Vec<String> {
    vec!["youtube.com".to_string(), "youtu.be".to_string()]
}

fn default_render_timeout_secs() -> u64 {
    15
}

fn default_browser_bin() -> String {
    "chromium".to_string()
}

fn default_extractor_bin() -> String {
    "yt-dlp".to_string()
}

fn default_extractor_format() -> String {
    "best[ext=mp4][protocol^=http][protocol!*=dash]".to_string()
}

/// Streaming HTTP client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Write buffer between the response stream and the file
    #[serde(default = "default_chunk_size")]
    pub chunk_size: ByteSize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl FetchConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            chunk_size: default_chunk_size(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_chunk_size() -> ByteSize {
    ByteSize(8 * 1024)
}

fn default_user_agent() -> String {
    concat!("smolvid/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Size budget and encoder settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    #[serde(default = "default_target_size")]
    pub target_size: ByteSize,
    /// Reserved out of `target_size` before the video bitrate is computed.
    /// Zero keeps the whole budget for video.
    #[serde(default)]
    pub audio_headroom: ByteSize,
    #[serde(default = "default_video_codec")]
    pub video_codec: String,
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    #[serde(default = "default_ffmpeg_bin")]
    pub ffmpeg_bin: String,
    #[serde(default = "default_ffprobe_bin")]
    pub ffprobe_bin: String,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            target_size: default_target_size(),
            audio_headroom: ByteSize::default(),
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            ffmpeg_bin: default_ffmpeg_bin(),
            ffprobe_bin: default_ffprobe_bin(),
        }
    }
}

fn default_target_size() -> ByteSize {
    ByteSize::mib(10)
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_ffmpeg_bin() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_bin() -> String {
    "ffprobe".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_addr().to_string(), "0.0.0.0:5000");
        assert_eq!(config.server.request_deadline(), Duration::from_secs(300));
        assert_eq!(config.workspace.output_dir, PathBuf::from("compressed_videos"));
        assert_eq!(config.transcode.target_size.as_u64(), 10 * 1024 * 1024);
        assert!(config.transcode.audio_headroom.is_zero());
        assert_eq!(config.fetch.chunk_size.as_u64(), 8192);
        assert_eq!(config.locator.render_timeout(), Duration::from_secs(15));
        assert_eq!(
            config.locator.strategies,
            vec![StrategyKind::BrowserScrape, StrategyKind::GenericFallback]
        );
    }

    #[test]
    fn test_default_format_excludes_playlists() {
        let format = LocatorConfig::default().extractor_format;

        assert!(format.starts_with("best[ext=mp4]"));
        assert!(format.contains("[protocol^=http]"));
        assert!(format.contains("[protocol!*=dash]"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[transcode]
target_size = "8MB"
audio_headroom = "512KB"

[locator]
browser_domains = ["tiktok.com"]
            "#,
        )
        .unwrap();

        assert_eq!(config.transcode.target_size.as_u64(), 8 * 1024 * 1024);
        assert_eq!(config.transcode.audio_headroom.as_u64(), 512 * 1024);
        assert_eq!(config.transcode.video_codec, "libx264");
        assert_eq!(config.locator.browser_domains, vec!["tiktok.com"]);
        assert_eq!(config.locator.extractor_bin, "yt-dlp");
        assert_eq!(config.server.port, 5000);
    }
}
