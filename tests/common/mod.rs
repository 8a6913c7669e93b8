//! Stub capabilities shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;

use smolvid::config::Config;
use smolvid::locator::{ExtractError, MediaExtractor, RenderError, Renderer};
use smolvid::observability::Metrics;
use smolvid::pipeline::{Capabilities, Pipeline};
use smolvid::transcode::{MediaToolkit, TranscodeError, TranscodeJob};

/// What the stub browser reports for every page
#[derive(Clone)]
pub enum RenderScript {
    Found(String),
    NothingFound,
    Crash,
}

pub struct StubRenderer {
    script: RenderScript,
    pub calls: AtomicUsize,
}

impl StubRenderer {
    pub fn new(script: RenderScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn find_media_source(
        &self,
        _page: &Url,
        _timeout: Duration,
    ) -> Result<Option<String>, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            RenderScript::Found(src) => Ok(Some(src.clone())),
            RenderScript::NothingFound => Ok(None),
            RenderScript::Crash => Err(RenderError::Crashed {
                status: "signal: 11".into(),
                stderr: "segfault".into(),
            }),
        }
    }
}

/// Resolves every page to a fixed stream and "downloads" by writing
/// `payload`. A `None` payload makes both calls fail.
pub struct StubExtractor {
    payload: Option<Vec<u8>>,
    delay: Duration,
    pub downloads: AtomicUsize,
}

impl StubExtractor {
    pub fn new(payload: Option<&[u8]>) -> Arc<Self> {
        Arc::new(Self {
            payload: payload.map(<[u8]>::to_vec),
            delay: Duration::ZERO,
            downloads: AtomicUsize::new(0),
        })
    }

    pub fn slow(payload: &[u8], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            payload: Some(payload.to_vec()),
            delay,
            downloads: AtomicUsize::new(0),
        })
    }

    fn unsupported() -> ExtractError {
        ExtractError::Failed {
            status: "exit status: 1".into(),
            stderr: "ERROR: Unsupported URL".into(),
        }
    }
}

#[async_trait]
impl MediaExtractor for StubExtractor {
    async fn resolve(&self, page: &Url) -> Result<Url, ExtractError> {
        if self.payload.is_none() {
            return Err(Self::unsupported());
        }
        let mut stream = page.clone();
        stream.set_path("/stream.mp4");
        Ok(stream)
    }

    async fn download(&self, _page: &Url, dest: &Path) -> Result<(), ExtractError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            for suffix in [".ytdl", ".part-Frag1"] {
                let mut sidecar = dest.as_os_str().to_owned();
                sidecar.push(suffix);
                let _ = tokio::fs::write(&sidecar, b"partial").await;
            }
            tokio::time::sleep(self.delay).await;
        }
        match &self.payload {
            Some(bytes) => {
                tokio::fs::write(dest, bytes).await.map_err(|source| ExtractError::Spawn {
                    bin: "stub".into(),
                    source,
                })?;
                Ok(())
            }
            None => Err(Self::unsupported()),
        }
    }
}

/// Probes a fixed duration; encodes by writing a small marker file.
pub struct StubToolkit {
    duration: f64,
    fail_encode: bool,
    pub encodes: AtomicUsize,
}

pub const ENCODED: &[u8] = b"smol-mp4";

impl StubToolkit {
    pub fn new(duration: f64) -> Arc<Self> {
        Arc::new(Self {
            duration,
            fail_encode: false,
            encodes: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            duration: 60.0,
            fail_encode: true,
            encodes: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl MediaToolkit for StubToolkit {
    async fn probe_duration(&self, _input: &Path) -> Result<f64, TranscodeError> {
        Ok(self.duration)
    }

    async fn encode(&self, _job: &TranscodeJob, output: &Path) -> Result<(), TranscodeError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        if self.fail_encode {
            // Leave a partial file behind like a crashed encoder would
            let _ = tokio::fs::write(output, b"partial").await;
            return Err(TranscodeError::Encode {
                status: "exit status: 1".into(),
                stderr: "Conversion failed!".into(),
            });
        }
        tokio::fs::write(output, ENCODED)
            .await
            .map_err(|source| TranscodeError::Output {
                path: output.to_path_buf(),
                source,
            })
    }
}

pub fn test_config(output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.workspace.output_dir = output_dir.to_path_buf();
    config
}

pub struct Harness {
    pub dir: TempDir,
    pub pipeline: Pipeline,
}

impl Harness {
    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// Files left in the output directory
    pub fn leftovers(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.output_dir()) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

pub fn harness(
    renderer: Arc<StubRenderer>,
    extractor: Arc<StubExtractor>,
    toolkit: Arc<StubToolkit>,
    tweak: impl FnOnce(&mut Config),
) -> Harness {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir.path().join("out"));
    tweak(&mut config);

    let capabilities = Capabilities {
        renderer,
        extractor,
        toolkit,
    };
    let pipeline = Pipeline::build(&config, capabilities, Arc::new(Metrics::new())).unwrap();

    Harness { dir, pipeline }
}
