//! End-to-end test against the real toolchain.
//!
//! Prerequisites:
//! - `yt-dlp`, `ffmpeg` and `ffprobe` on PATH
//! - Network access
//! - `SMOLVID_E2E_URL` set to a short public video page
//!
//! Run via: `cargo test --test e2e -- --ignored`

use std::sync::Arc;
use tempfile::TempDir;

use smolvid::config::Config;
use smolvid::observability::Metrics;
use smolvid::pipeline::{Capabilities, Pipeline};

#[tokio::test]
#[ignore = "needs yt-dlp, ffmpeg and network access"]
async fn compresses_real_video_under_target() {
    let Ok(url) = std::env::var("SMOLVID_E2E_URL") else {
        eprintln!("SMOLVID_E2E_URL not set, skipping");
        return;
    };

    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.workspace.output_dir = dir.path().to_path_buf();
    // Leave room for audio so the result reliably fits
    config.transcode.audio_headroom = smolvid::config::ByteSize::mib(1);

    let pipeline = Pipeline::build(
        &config,
        Capabilities::from_config(&config),
        Arc::new(Metrics::new()),
    )
    .unwrap();

    let video = pipeline.run(&url).await.unwrap();

    assert!(!video.bytes.is_empty());
    assert!(video.report.bitrate_kbps > 0);
    assert_eq!(&video.bytes[4..8], b"ftyp");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
