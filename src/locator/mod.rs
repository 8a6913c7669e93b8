//! Turns a submitted page URL into a fetchable media location.
//!
//! ## Key Components
//!
//! - [`Locator`] - evaluates an ordered strategy list
//! - [`LocateStrategy`] - one way of finding media, returning a tagged [`StrategyOutcome`]
//! - [`BrowserScrape`] - headless browser for hosts in the browser-required table
//! - [`ExtractorStrategy`] - yt-dlp resolution, as direct extractor or generic fallback
//! - [`DomainTable`] - browser-required and blocked host lists
//!
//! The locator is a small state machine: `SoftFail` moves on to the next
//! strategy, `Success` and `HardFail` stop evaluation. Running out of
//! strategies yields [`LocateError::NoMediaFound`] with every attempt recorded.

mod browser;
mod domains;
mod extractor;
mod traits;
mod types;

pub use browser::{BrowserScrape, HeadlessChrome, RenderError, Renderer};
pub use domains::DomainTable;
pub use extractor::{ExtractError, ExtractorStrategy, MediaExtractor, YtDlp};
pub use traits::{LocateStrategy, StrategyError, StrategyOutcome};
pub use types::{MediaLocation, SourceUrl, SourceUrlError, StrategyKind};

use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::LocatorConfig;
use crate::observability::Metrics;

/// One strategy that did not produce a location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub strategy: StrategyKind,
    pub reason: String,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("No media could be found at {url}")]
    NoMediaFound { url: String, attempts: Vec<Attempt> },

    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

/// Ordered strategy list plus the host tables that drive it.
pub struct Locator {
    strategies: Vec<Arc<dyn LocateStrategy>>,
    domains: Arc<DomainTable>,
    metrics: Arc<Metrics>,
}

impl Locator {
    pub fn new(
        strategies: Vec<Arc<dyn LocateStrategy>>,
        domains: Arc<DomainTable>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            strategies,
            domains,
            metrics,
        }
    }

    /// Build the configured strategy list on top of the given capabilities.
    pub fn from_config(
        config: &LocatorConfig,
        renderer: Arc<dyn Renderer>,
        extractor: Arc<dyn MediaExtractor>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let domains = Arc::new(DomainTable::new(
            &config.browser_domains,
            &config.blocked_domains,
        ));

        let strategies = config
            .strategies
            .iter()
            .map(|kind| -> Arc<dyn LocateStrategy> {
                match kind {
                    StrategyKind::BrowserScrape => Arc::new(BrowserScrape::new(
                        renderer.clone(),
                        domains.clone(),
                        config.render_timeout(),
                    )),
                    StrategyKind::DirectExtractor => {
                        Arc::new(ExtractorStrategy::direct(extractor.clone()))
                    }
                    StrategyKind::GenericFallback => {
                        Arc::new(ExtractorStrategy::generic_fallback(extractor.clone()))
                    }
                }
            })
            .collect();

        Self::new(strategies, domains, metrics)
    }

    pub fn strategy_order(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Blocked-table entry matching the source, checked before any work starts
    pub fn blocked_entry(&self, source: &SourceUrl) -> Option<&str> {
        self.domains.blocked_entry(source)
    }

    pub async fn locate(&self, source: &SourceUrl) -> Result<MediaLocation, LocateError> {
        let mut attempts: Vec<Attempt> = Vec::new();

        for strategy in &self.strategies {
            let kind = strategy.kind();

            if !strategy.applies_to(source) {
                debug!(url = %source, strategy = %kind, "Strategy does not apply, skipping");
                continue;
            }

            if let Some(previous) = attempts.last() {
                info!(url = %source, from = %previous.strategy, to = %kind, "Falling back");
                self.metrics.strategy_fallback();
            }

            match strategy.attempt(source).await {
                StrategyOutcome::Success(location) => {
                    info!(
                        url = %source,
                        strategy = %kind,
                        fallbacks = attempts.len(),
                        "Media located"
                    );
                    return Ok(location);
                }
                StrategyOutcome::SoftFail(reason) => {
                    info!(url = %source, strategy = %kind, %reason, "Strategy yielded nothing");
                    attempts.push(Attempt {
                        strategy: kind,
                        reason,
                    });
                }
                StrategyOutcome::HardFail(err) => {
                    warn!(url = %source, strategy = %kind, error = %err, "Strategy failed hard");
                    return Err(err.into());
                }
            }
        }

        Err(LocateError::NoMediaFound {
            url: source.to_string(),
            attempts,
        })
    }
}
