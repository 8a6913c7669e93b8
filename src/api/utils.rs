//! Response helpers shared by the handlers.

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::Response,
};

use tracing::error;

use crate::api::error::{ApiError, INTERNAL_ERROR_MESSAGE};
use crate::pipeline::CompressedVideo;

pub const VIDEO_MP4: &str = "video/mp4";

/// `Content-Disposition` value offering `file_name` as a download.
///
/// Quotes and backslashes are dropped so the value always parses.
pub fn attachment_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

/// 200 response carrying the compressed MP4 as an attachment
pub fn video_response(video: CompressedVideo) -> Result<Response, ApiError> {
    let disposition = HeaderValue::from_str(&attachment_disposition(&video.file_name))
        .map_err(|e| internal("invalid attachment name", e))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, VIDEO_MP4)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, video.bytes.len())
        .body(Body::from(video.bytes))
        .map_err(|e| internal("failed to build response", e))
}

fn internal(context: &str, err: impl std::fmt::Display) -> ApiError {
    error!(error = %err, "{context}");
    ApiError::Internal(INTERNAL_ERROR_MESSAGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcode::TranscodeReport;
    use bytes::Bytes;

    #[test]
    fn disposition_quotes_the_name() {
        assert_eq!(
            attachment_disposition("0b6c_smol.mp4"),
            "attachment; filename=\"0b6c_smol.mp4\""
        );
        assert_eq!(
            attachment_disposition("a\"b\\c.mp4"),
            "attachment; filename=\"abc.mp4\""
        );
    }

    #[test]
    fn video_response_sets_headers() {
        let video = CompressedVideo {
            file_name: "id_smol.mp4".into(),
            bytes: Bytes::from_static(b"mp4"),
            report: TranscodeReport {
                duration_seconds: 1.0,
                bitrate_kbps: 100,
                output_bytes: 3,
            },
        };

        let response = video_response(video).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], VIDEO_MP4);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"id_smol.mp4\""
        );
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "3");
    }

    #[test]
    fn response_failures_hide_detail() {
        let err = internal("failed to build response", "invalid header value: \\x7f");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), INTERNAL_ERROR_MESSAGE);
    }
}
