use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceUrlError {
    #[error("No URL provided")]
    Missing,
    #[error("invalid URL '{0}'")]
    Malformed(String),
    #[error("unsupported URL scheme '{0}', expected http or https")]
    UnsupportedScheme(String),
    #[error("URL '{0}' has no host")]
    MissingHost(String),
}

/// A validated page URL submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrl {
    url: Url,
    host: String,
}

impl SourceUrl {
    pub fn parse(raw: &str) -> Result<Self, SourceUrlError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SourceUrlError::Missing);
        }

        let url = Url::parse(trimmed).map_err(|_| SourceUrlError::Malformed(trimmed.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(SourceUrlError::UnsupportedScheme(other.to_string())),
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .map(|h| h.trim_end_matches('.').to_ascii_lowercase())
            .ok_or_else(|| SourceUrlError::MissingHost(trimmed.to_string()))?;

        Ok(Self { url, host })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Lowercased host without a trailing dot
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// How a media location was obtained. Also names the entries of the
/// configurable strategy list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Extractor resolves a stream URI that the fetcher streams itself
    DirectExtractor,
    /// Headless browser renders the page and reads the `<video>` source
    BrowserScrape,
    /// Extractor resolves and later downloads the page URL on its own
    GenericFallback,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::DirectExtractor => "direct_extractor",
            StrategyKind::BrowserScrape => "browser_scrape",
            StrategyKind::GenericFallback => "generic_fallback",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful locate. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLocation {
    source: SourceUrl,
    resolved_uri: String,
    strategy: StrategyKind,
}

impl MediaLocation {
    pub fn new(source: SourceUrl, resolved_uri: impl Into<String>, strategy: StrategyKind) -> Self {
        Self {
            source,
            resolved_uri: resolved_uri.into(),
            strategy,
        }
    }

    /// The page URL the client submitted
    pub fn source(&self) -> &SourceUrl {
        &self.source
    }

    pub fn resolved_uri(&self) -> &str {
        &self.resolved_uri
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_http_urls() {
        let source = SourceUrl::parse("  https://WWW.TikTok.com./@user/video/1  ").unwrap();
        assert_eq!(source.host(), "www.tiktok.com");
        assert_eq!(source.url().scheme(), "https");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(SourceUrl::parse(""), Err(SourceUrlError::Missing));
        assert_eq!(SourceUrl::parse("   "), Err(SourceUrlError::Missing));
        assert!(matches!(
            SourceUrl::parse("not a url"),
            Err(SourceUrlError::Malformed(_))
        ));
        assert!(matches!(
            SourceUrl::parse("ftp://example.com/video.mp4"),
            Err(SourceUrlError::UnsupportedScheme(s)) if s == "ftp"
        ));
        assert!(matches!(
            SourceUrl::parse("file:///etc/passwd"),
            Err(SourceUrlError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn strategy_kind_names_match_config_spelling() {
        let parsed: Vec<StrategyKind> =
            serde_json::from_str(r#"["direct_extractor","browser_scrape","generic_fallback"]"#)
                .unwrap();
        let names: Vec<&str> = parsed.iter().map(StrategyKind::as_str).collect();
        assert_eq!(names, ["direct_extractor", "browser_scrape", "generic_fallback"]);
    }
}
