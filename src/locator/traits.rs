use async_trait::async_trait;
use thiserror::Error;

use super::types::{MediaLocation, SourceUrl, StrategyKind};

/// Failure that stops the locator instead of moving on to the next strategy
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("{capability} could not be started: {reason}")]
    CapabilityUnavailable {
        capability: &'static str,
        reason: String,
    },
}

/// Tagged result of a single strategy attempt.
#[derive(Debug)]
pub enum StrategyOutcome {
    Success(MediaLocation),
    /// Nothing usable here; the next strategy should run
    SoftFail(String),
    /// Stop and surface the error
    HardFail(StrategyError),
}

/// One way of turning a page URL into a media location.
#[async_trait]
pub trait LocateStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Whether this strategy has anything to try for `source`. The locator
    /// skips strategies that do not apply.
    fn applies_to(&self, _source: &SourceUrl) -> bool {
        true
    }

    async fn attempt(&self, source: &SourceUrl) -> StrategyOutcome;
}
