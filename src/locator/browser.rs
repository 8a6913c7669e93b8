//! Headless-browser scraping for hosts that refuse plain HTTP clients.

use async_trait::async_trait;
use regex::Regex;
use std::process::Stdio;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;
use url::Url;

use super::domains::DomainTable;
use super::traits::{LocateStrategy, StrategyOutcome};
use super::types::{MediaLocation, SourceUrl, StrategyKind};

/// Extra wall-clock time for the browser to start and serialize the DOM
/// on top of the render budget.
const LAUNCH_GRACE: Duration = Duration::from_secs(5);

static VIDEO_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<video\b([^>]*)>(.*?)</video>").unwrap());
static SOURCE_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<source\b([^>]*)>").unwrap());
static SRC_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)src\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no media element appeared within {0:?}")]
    Timeout(Duration),

    #[error("failed to launch browser '{bin}': {source}")]
    Launch {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("browser exited with {status}: {stderr}")]
    Crashed { status: String, stderr: String },
}

/// Script-capable rendering engine.
///
/// Implementations navigate to `page`, wait at most `timeout` for a playable
/// media element and return its `src` as written in the DOM.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn find_media_source(
        &self,
        page: &Url,
        timeout: Duration,
    ) -> Result<Option<String>, RenderError>;
}

/// Chromium in headless mode, one isolated process and profile per call.
#[derive(Debug, Clone)]
pub struct HeadlessChrome {
    bin: String,
    launch_grace: Duration,
}

impl HeadlessChrome {
    pub fn new(bin: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            launch_grace: LAUNCH_GRACE,
        }
    }

    fn launch_error(&self, source: std::io::Error) -> RenderError {
        RenderError::Launch {
            bin: self.bin.clone(),
            source,
        }
    }
}

#[async_trait]
impl Renderer for HeadlessChrome {
    async fn find_media_source(
        &self,
        page: &Url,
        timeout: Duration,
    ) -> Result<Option<String>, RenderError> {
        // Removed when this call returns, after the browser is gone.
        let profile = tempfile::TempDir::new().map_err(|e| self.launch_error(e))?;

        let mut command = Command::new(&self.bin);
        command
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--no-first-run")
            .arg("--mute-audio")
            .arg(format!("--user-data-dir={}", profile.path().display()))
            .arg(format!("--virtual-time-budget={}", timeout.as_millis()))
            .arg("--dump-dom")
            .arg(page.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Chromium forks zygote and renderer processes; give them a group of
        // their own so they can be killed together.
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|e| self.launch_error(e))?;
        let _group = ProcessGroupGuard(child.id());

        debug!(page = %page, bin = %self.bin, "Browser session started");

        let session = tokio::time::timeout(timeout + self.launch_grace, child.wait_with_output());
        let output = match session.await {
            Ok(result) => result.map_err(|e| self.launch_error(e))?,
            Err(_) => return Err(RenderError::Timeout(timeout)),
        };

        if !output.status.success() {
            return Err(RenderError::Crashed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let dom = String::from_utf8_lossy(&output.stdout);
        debug!(page = %page, dom_bytes = dom.len(), "Browser session finished");

        Ok(extract_media_source(&dom))
    }
}

/// Kills the browser's whole process group when the session ends, including
/// when the request owning it is cancelled.
struct ProcessGroupGuard(Option<u32>);

impl Drop for ProcessGroupGuard {
    #[cfg(unix)]
    fn drop(&mut self) {
        let Some(pgid) = self.0.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
            return;
        };
        // SAFETY: killpg takes no pointers; the group was created at spawn.
        if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                debug!(pgid, error = %err, "Failed to kill browser process group");
            }
        }
    }

    #[cfg(not(unix))]
    fn drop(&mut self) {}
}

/// First media `src` in a rendered document: the `<video>` attribute wins over
/// nested `<source>` children.
pub(crate) fn extract_media_source(dom: &str) -> Option<String> {
    for video in VIDEO_ELEMENT.captures_iter(dom) {
        let attrs = video.get(1).map_or("", |m| m.as_str());
        if let Some(src) = src_attribute(attrs) {
            return Some(src);
        }

        let body = video.get(2).map_or("", |m| m.as_str());
        for source in SOURCE_ELEMENT.captures_iter(body) {
            if let Some(src) = source.get(1).and_then(|m| src_attribute(m.as_str())) {
                return Some(src);
            }
        }
    }
    None
}

fn src_attribute(attrs: &str) -> Option<String> {
    let captures = SRC_ATTRIBUTE.captures(attrs)?;
    let value = captures.get(1).or_else(|| captures.get(2))?.as_str().trim();
    if value.is_empty() {
        return None;
    }
    Some(value.replace("&amp;", "&"))
}

/// Resolve a DOM `src` against the page. Only http(s) results are fetchable;
/// `blob:` and `data:` sources are not.
pub(crate) fn resolve_media_uri(page: &Url, src: &str) -> Option<Url> {
    let resolved = page.join(src).ok()?;
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

/// Renders browser-required hosts and reads the media element's source.
pub struct BrowserScrape {
    renderer: Arc<dyn Renderer>,
    domains: Arc<DomainTable>,
    timeout: Duration,
}

impl BrowserScrape {
    pub fn new(renderer: Arc<dyn Renderer>, domains: Arc<DomainTable>, timeout: Duration) -> Self {
        Self {
            renderer,
            domains,
            timeout,
        }
    }
}

#[async_trait]
impl LocateStrategy for BrowserScrape {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BrowserScrape
    }

    fn applies_to(&self, source: &SourceUrl) -> bool {
        self.domains.requires_browser(source)
    }

    async fn attempt(&self, source: &SourceUrl) -> StrategyOutcome {
        if !self.applies_to(source) {
            return StrategyOutcome::SoftFail(format!(
                "{} does not require a browser",
                source.host()
            ));
        }

        match self.renderer.find_media_source(source.url(), self.timeout).await {
            Ok(Some(src)) => match resolve_media_uri(source.url(), &src) {
                Some(uri) => StrategyOutcome::Success(MediaLocation::new(
                    source.clone(),
                    uri,
                    StrategyKind::BrowserScrape,
                )),
                None => StrategyOutcome::SoftFail(format!(
                    "media element source '{src}' is not fetchable"
                )),
            },
            Ok(None) => {
                StrategyOutcome::SoftFail("no media element in rendered page".to_string())
            }
            Err(e) => StrategyOutcome::SoftFail(e.to_string()),
        }
    }
}
