//! Request and response bodies for the HTTP API.
//!
//! `POST /compress` takes a form-encoded body:
//!
//! ```text
//! url=https%3A%2F%2Fwww.tiktok.com%2F%40user%2Fvideo%2F123
//! ```
//!
//! Success is the MP4 itself as an attachment. Failures are JSON:
//!
//! ```json
//! { "error": "No URL provided" }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::observability::MetricsSnapshot;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CompressForm {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, String>,
    pub version: String,
    pub metrics: MetricsSnapshot,
}
