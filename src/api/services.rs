use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::{
    models::{CompressForm, HealthResponse},
    state::AppState,
    utils,
};
use crate::api::error::ApiError;

const NO_URL: &str = "No URL provided";

/// Compress the video behind a page URL (POST /compress)
///
/// Runs the whole pipeline inside the request and answers with the MP4 as an
/// attachment. A body that is not a form, or a form without a non-blank
/// `url` field, is answered the same way: 400 "No URL provided".
pub async fn compress(
    State(state): State<AppState>,
    form: Result<Form<CompressForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let url = match form {
        Ok(Form(form)) => form.url,
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "Unreadable compress form");
            None
        }
    };

    let url = url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(NO_URL.to_string()))?;

    info!(%url, "Compress request received");
    let video = state.pipeline.run(&url).await?;

    utils::video_response(video)
}

/// Liveness plus a check that the output directory is usable (GET /health)
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = BTreeMap::new();
    let mut healthy = true;

    let output_dir = state.pipeline.output_dir();
    let workspace_status = match tokio::fs::create_dir_all(output_dir).await {
        Ok(()) => "healthy".to_string(),
        Err(e) => {
            healthy = false;
            format!("unhealthy: {e}")
        }
    };
    components.insert("workspace".to_string(), workspace_status);

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        metrics: state.metrics.snapshot(),
    };

    (status, Json(response))
}
