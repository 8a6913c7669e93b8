pub mod api;
pub mod config;
pub mod fetch;
pub mod humanize;
pub mod locator;
pub mod observability;
pub mod pipeline;
pub mod transcode;

#[cfg(test)]
pub(crate) mod test_support;
