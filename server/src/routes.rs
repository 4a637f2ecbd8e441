use axum::{
    body::{Bytes, StreamBody},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use shared::{normalize, ErrorResponse};

/// Relays one chat message to the inference service as an incremental
/// plain-text response.
///
/// Validation and stream-open failures happen before any body bytes are
/// produced, so they come back as status-coded JSON errors. Once streaming
/// has begun the headers are committed and later failures can only appear
/// as text inside the stream.
pub(crate) async fn chat(body: Bytes) -> Response {
    let message = match normalize(&body) {
        Ok(message) => message,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
    };

    match raindux::stream_response(&message).await {
        Ok(stream) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            StreamBody::new(stream.into_byte_stream()),
        )
            .into_response(),
        Err(report) => {
            tracing::error!("failed to open inference stream: {report}");
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                format!(
                    "Server stream failed. Check if LLM service is running. \
                     Error details: {report}"
                ),
            )
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}
