//! ffprobe / ffmpeg command-line toolkit

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

use super::{TranscodeError, TranscodeJob};
use crate::config::TranscodeConfig;

/// Media probe and encode capability.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Container duration in seconds
    async fn probe_duration(&self, input: &Path) -> Result<f64, TranscodeError>;

    /// Re-encode `job.input` to `output`, replacing any existing file
    async fn encode(&self, job: &TranscodeJob, output: &Path) -> Result<(), TranscodeError>;
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Duration from `ffprobe -print_format json -show_format` output.
pub(crate) fn parse_probe_duration(stdout: &[u8]) -> Result<f64, String> {
    let probe: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| format!("unreadable probe output: {e}"))?;

    let raw = probe
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| "container reports no duration".to_string())?;

    raw.trim()
        .parse::<f64>()
        .map_err(|_| format!("unparseable duration '{raw}'"))
}

#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg_bin: String,
    ffprobe_bin: String,
    video_codec: String,
    audio_codec: String,
}

impl Ffmpeg {
    pub fn from_config(config: &TranscodeConfig) -> Self {
        Self {
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            ffprobe_bin: config.ffprobe_bin.clone(),
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
        }
    }

    async fn run(tool: &str, command: &mut Command) -> Result<Output, TranscodeError> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| TranscodeError::Spawn {
                tool: tool.to_string(),
                source,
            })
    }
}

#[async_trait]
impl MediaToolkit for Ffmpeg {
    async fn probe_duration(&self, input: &Path) -> Result<f64, TranscodeError> {
        let output = Self::run(
            &self.ffprobe_bin,
            Command::new(&self.ffprobe_bin)
                .args(["-v", "error", "-print_format", "json", "-show_format"])
                .arg(input),
        )
        .await?;

        let probe_error = |reason: String| TranscodeError::Probe {
            path: input.to_path_buf(),
            reason,
        };

        if !output.status.success() {
            return Err(probe_error(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        parse_probe_duration(&output.stdout).map_err(probe_error)
    }

    async fn encode(&self, job: &TranscodeJob, output: &Path) -> Result<(), TranscodeError> {
        debug!(
            input = %job.input.path.display(),
            output = %output.display(),
            bitrate_kbps = job.computed_bitrate_kbps,
            "Encoding"
        );

        let result = Self::run(
            &self.ffmpeg_bin,
            Command::new(&self.ffmpeg_bin)
                .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
                .arg(&job.input.path)
                .arg("-b:v")
                .arg(format!("{}k", job.computed_bitrate_kbps))
                .args(["-c:v", &self.video_codec, "-c:a", &self.audio_codec])
                .args(["-f", "mp4"])
                .arg(output),
        )
        .await?;

        if !result.status.success() {
            return Err(TranscodeError::Encode {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
