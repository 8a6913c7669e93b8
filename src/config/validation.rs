use super::models::Config;
use crate::locator::DomainTable;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("transcode.target_size must be positive")]
    EmptyTargetSize,

    #[error("transcode.audio_headroom ({headroom}) leaves no room in target_size ({target})")]
    HeadroomExceedsTarget { headroom: u64, target: u64 },

    #[error("{field} must be positive")]
    ZeroDuration { field: &'static str },

    #[error("fetch.chunk_size must be positive")]
    ZeroChunkSize,

    #[error("locator.strategies must list at least one strategy")]
    NoStrategies,

    #[error("{list} contains an invalid domain '{domain}'")]
    InvalidDomain { list: &'static str, domain: String },

    #[error("{field} must not be empty")]
    EmptyValue { field: &'static str },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_durations(config)?;
    validate_locator(config)?;
    validate_fetch(config)?;
    validate_transcode(config)?;
    Ok(())
}

fn validate_durations(config: &Config) -> Result<(), ValidationError> {
    if config.server.request_deadline_secs == 0 {
        return Err(ValidationError::ZeroDuration {
            field: "server.request_deadline_secs",
        });
    }
    if config.locator.render_timeout_secs == 0 {
        return Err(ValidationError::ZeroDuration {
            field: "locator.render_timeout_secs",
        });
    }
    if config.fetch.connect_timeout_secs == 0 {
        return Err(ValidationError::ZeroDuration {
            field: "fetch.connect_timeout_secs",
        });
    }
    Ok(())
}

fn validate_locator(config: &Config) -> Result<(), ValidationError> {
    let locator = &config.locator;

    if locator.strategies.is_empty() {
        return Err(ValidationError::NoStrategies);
    }

    for (list, domains) in [
        ("locator.browser_domains", &locator.browser_domains),
        ("locator.blocked_domains", &locator.blocked_domains),
    ] {
        if let Some(domain) = domains.iter().find(|d| !DomainTable::is_valid_entry(d)) {
            return Err(ValidationError::InvalidDomain {
                list,
                domain: domain.clone(),
            });
        }
    }

    require_non_empty("locator.browser_bin", &locator.browser_bin)?;
    require_non_empty("locator.extractor_bin", &locator.extractor_bin)?;
    require_non_empty("locator.extractor_format", &locator.extractor_format)
}

fn validate_fetch(config: &Config) -> Result<(), ValidationError> {
    if config.fetch.chunk_size.is_zero() {
        return Err(ValidationError::ZeroChunkSize);
    }
    require_non_empty("fetch.user_agent", &config.fetch.user_agent)
}

fn validate_transcode(config: &Config) -> Result<(), ValidationError> {
    let transcode = &config.transcode;
    let target = transcode.target_size.as_u64();
    let headroom = transcode.audio_headroom.as_u64();

    if target == 0 {
        return Err(ValidationError::EmptyTargetSize);
    }
    if headroom >= target {
        return Err(ValidationError::HeadroomExceedsTarget { headroom, target });
    }

    require_non_empty("transcode.video_codec", &transcode.video_codec)?;
    require_non_empty("transcode.audio_codec", &transcode.audio_codec)?;
    require_non_empty("transcode.ffmpeg_bin", &transcode.ffmpeg_bin)?;
    require_non_empty("transcode.ffprobe_bin", &transcode.ffprobe_bin)
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyValue { field });
    }
    Ok(())
}
