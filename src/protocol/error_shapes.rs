use crate::error::ErrorCategory;

fn openai_error_type(cat: ErrorCategory) -> &'static str {
    match cat {
        ErrorCategory::InvalidRequest => "invalid_request_error",
        ErrorCategory::Unauthorized => "unauthorized",
        ErrorCategory::Server => "server_error",
        ErrorCategory::Api => "api_error",
        ErrorCategory::Connection => "connection_error",
    }
}

#[must_use]
pub(crate) fn openai_error_payload(cat: ErrorCategory, message: &str) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "message": message,
            "type": openai_error_type(cat),
        }
    })
}

/// Error frame written into an already-open event stream.
#[must_use]
pub(crate) fn openai_stream_error_frame(cat: ErrorCategory, message: &str) -> String {
    let payload = openai_error_payload(cat, message);
    crate::stream::sse::openai_sse_frame(&payload.to_string())
}
