//! Bitrate-fitting re-encode.
//!
//! The whole target size is spent on the video bitrate:
//! `kbps = floor(floor(target_bits / duration) / 1000)`. Audio and container
//! overhead are not budgeted, so output can land above the target; an
//! optional `audio_headroom` is taken off the target first.

mod ffmpeg;

pub use ffmpeg::{Ffmpeg, MediaToolkit};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::TranscodeConfig;
use crate::fetch::LocalMediaFile;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot probe {}: {reason}", path.display())]
    Probe { path: PathBuf, reason: String },

    #[error("invalid media duration {0}s")]
    InvalidDuration(f64),

    #[error("encoder exited with {status}: {stderr}")]
    Encode { status: String, stderr: String },

    #[error("cannot read encoded output {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Byte budget for one output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBudget {
    pub target_bytes: u64,
    pub audio_headroom: u64,
}

impl SizeBudget {
    /// Bytes left for the video stream
    pub fn video_bytes(&self) -> u64 {
        self.target_bytes.saturating_sub(self.audio_headroom)
    }
}

impl From<&TranscodeConfig> for SizeBudget {
    fn from(config: &TranscodeConfig) -> Self {
        Self {
            target_bytes: config.target_size.as_u64(),
            audio_headroom: config.audio_headroom.as_u64(),
        }
    }
}

/// Derived encode parameters, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeJob {
    pub input: LocalMediaFile,
    pub target_bytes: u64,
    pub computed_bitrate_kbps: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeReport {
    pub duration_seconds: f64,
    pub bitrate_kbps: u64,
    pub output_bytes: u64,
}

/// Video bitrate in kbps that spends `budget_bytes` over `duration_seconds`.
pub fn compute_bitrate_kbps(
    budget_bytes: u64,
    duration_seconds: f64,
) -> Result<u64, TranscodeError> {
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
        return Err(TranscodeError::InvalidDuration(duration_seconds));
    }

    let bits = budget_bytes as f64 * 8.0;
    let bps = (bits / duration_seconds).floor() as u64;
    let kbps = bps / 1000;

    if kbps == 0 {
        return Err(TranscodeError::InvalidDuration(duration_seconds));
    }
    Ok(kbps)
}

pub struct Transcoder {
    toolkit: Arc<dyn MediaToolkit>,
    budget: SizeBudget,
}

impl Transcoder {
    pub fn new(toolkit: Arc<dyn MediaToolkit>, budget: SizeBudget) -> Self {
        Self { toolkit, budget }
    }

    /// Probe `input`, compute the bitrate and encode to `output`.
    pub async fn transcode(
        &self,
        mut input: LocalMediaFile,
        output: &Path,
    ) -> Result<TranscodeReport, TranscodeError> {
        let duration = self.toolkit.probe_duration(&input.path).await?;
        let bitrate_kbps = compute_bitrate_kbps(self.budget.video_bytes(), duration)?;
        input.duration_seconds = Some(duration);

        let job = TranscodeJob {
            input,
            target_bytes: self.budget.target_bytes,
            computed_bitrate_kbps: bitrate_kbps,
        };

        self.toolkit.encode(&job, output).await?;

        let output_bytes = tokio::fs::metadata(output)
            .await
            .map_err(|source| TranscodeError::Output {
                path: output.to_path_buf(),
                source,
            })?
            .len();

        if output_bytes > job.target_bytes {
            warn!(
                output = %output.display(),
                output_bytes,
                target_bytes = job.target_bytes,
                "Encoded file exceeds size target"
            );
        }

        info!(
            input_bytes = job.input.byte_size,
            duration_seconds = duration,
            bitrate_kbps,
            output_bytes,
            "Transcode finished"
        );

        Ok(TranscodeReport {
            duration_seconds: duration,
            bitrate_kbps,
            output_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const TEN_MIB: u64 = 10 * 1024 * 1024;

    /// Reports a fixed duration and writes a fixed number of bytes on encode.
    struct FakeToolkit {
        duration: f64,
        encoded_bytes: usize,
        jobs: Mutex<Vec<TranscodeJob>>,
    }

    impl FakeToolkit {
        fn new(duration: f64) -> Arc<Self> {
            Arc::new(Self {
                duration,
                encoded_bytes: 1024,
                jobs: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl MediaToolkit for FakeToolkit {
        async fn probe_duration(&self, _input: &Path) -> Result<f64, TranscodeError> {
            Ok(self.duration)
        }

        async fn encode(&self, job: &TranscodeJob, output: &Path) -> Result<(), TranscodeError> {
            self.jobs.lock().unwrap().push(job.clone());
            std::fs::write(output, vec![0u8; self.encoded_bytes]).unwrap();
            Ok(())
        }
    }

    fn budget() -> SizeBudget {
        SizeBudget {
            target_bytes: TEN_MIB,
            audio_headroom: 0,
        }
    }

    #[test]
    fn bitrate_for_one_minute() {
        // 83_886_080 bits / 60 s = 1_398_101 bps
        assert_eq!(compute_bitrate_kbps(TEN_MIB, 60.0).unwrap(), 1398);
    }

    #[test]
    fn bitrate_matches_formula() {
        for duration in [1.0, 7.5, 33.3, 120.0, 599.99, 3600.0] {
            let expected = ((TEN_MIB as f64 * 8.0 / duration).floor() as u64) / 1000;
            assert_eq!(compute_bitrate_kbps(TEN_MIB, duration).unwrap(), expected);
        }
        assert_eq!(compute_bitrate_kbps(TEN_MIB, 120.0).unwrap(), 699);
    }

    #[test]
    fn non_positive_durations_are_rejected() {
        for duration in [0.0, -0.0, -12.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                compute_bitrate_kbps(TEN_MIB, duration),
                Err(TranscodeError::InvalidDuration(_))
            ));
        }
    }

    #[test]
    fn bitrate_that_rounds_to_zero_is_rejected() {
        assert!(matches!(
            compute_bitrate_kbps(1024, 10_000.0),
            Err(TranscodeError::InvalidDuration(_))
        ));
    }

    #[test]
    fn headroom_reduces_video_budget() {
        let budget = SizeBudget {
            target_bytes: TEN_MIB,
            audio_headroom: 1024 * 1024,
        };
        assert_eq!(budget.video_bytes(), 9 * 1024 * 1024);
        assert_eq!(compute_bitrate_kbps(budget.video_bytes(), 60.0).unwrap(), 1258);
    }

    #[tokio::test]
    async fn zero_duration_never_reaches_encoder() {
        let dir = TempDir::new().unwrap();
        let toolkit = FakeToolkit::new(0.0);
        let transcoder = Transcoder::new(toolkit.clone(), budget());

        let input = LocalMediaFile::new(dir.path().join("raw.mp4"), 4096);
        let err = transcoder
            .transcode(input, &dir.path().join("out.mp4"))
            .await
            .unwrap_err();

        assert!(matches!(err, TranscodeError::InvalidDuration(d) if d == 0.0));
        assert!(toolkit.jobs.lock().unwrap().is_empty());
        assert!(!dir.path().join("out.mp4").exists());
    }

    #[tokio::test]
    async fn encodes_with_computed_bitrate() {
        let dir = TempDir::new().unwrap();
        let toolkit = FakeToolkit::new(60.0);
        let transcoder = Transcoder::new(toolkit.clone(), budget());

        let input = LocalMediaFile::new(dir.path().join("raw.mp4"), 50 * 1024 * 1024);
        let report = transcoder
            .transcode(input, &dir.path().join("out.mp4"))
            .await
            .unwrap();

        assert_eq!(report.bitrate_kbps, 1398);
        assert_eq!(report.output_bytes, 1024);

        let jobs = toolkit.jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].target_bytes, TEN_MIB);
        assert_eq!(jobs[0].computed_bitrate_kbps, 1398);
        assert_eq!(jobs[0].input.duration_seconds, Some(60.0));
    }
}
