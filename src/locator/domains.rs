use super::types::SourceUrl;

/// Host lists that steer the locator. Entries match the host itself and any
/// subdomain of it, so `tiktok.com` covers `www.tiktok.com` and `vm.tiktok.com`.
#[derive(Debug, Clone, Default)]
pub struct DomainTable {
    browser_required: Vec<String>,
    blocked: Vec<String>,
}

impl DomainTable {
    pub fn new<B, K>(browser_required: B, blocked: K) -> Self
    where
        B: IntoIterator,
        B::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        Self {
            browser_required: normalize(browser_required),
            blocked: normalize(blocked),
        }
    }

    /// A bare hostname: no scheme, path, port or whitespace.
    pub fn is_valid_entry(entry: &str) -> bool {
        let entry = entry.trim();
        !entry.is_empty()
            && !entry.starts_with('.')
            && entry
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    }

    pub fn requires_browser(&self, source: &SourceUrl) -> bool {
        matching_entry(&self.browser_required, source.host()).is_some()
    }

    /// The blocked entry the source falls under, if any
    pub fn blocked_entry(&self, source: &SourceUrl) -> Option<&str> {
        matching_entry(&self.blocked, source.host())
    }
}

fn normalize<I>(entries: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    entries
        .into_iter()
        .map(|e| e.as_ref().trim().trim_end_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn matching_entry<'a>(entries: &'a [String], host: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|entry| {
            host == entry.as_str()
                || host
                    .strip_suffix(entry.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
        .map(String::as_str)
}
