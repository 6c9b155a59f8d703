use crate::protocol::error_shapes::openai_error_payload;

/// Error type shared by every request path.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Server configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    Auth(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Error connecting to Notion API: {0}")]
    UpstreamConnection(String),
    #[error("Notion API error: status={status}, message={message}")]
    UpstreamApi { status: u16, message: String },
    #[error("Error reading Notion API response: {0}")]
    UpstreamStream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad error category used for status code and error type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidRequest,
    Unauthorized,
    Server,
    Api,
    Connection,
}

impl ProxyError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProxyError::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            ProxyError::Auth(_) => ErrorCategory::Unauthorized,
            ProxyError::Config(_) | ProxyError::UpstreamStream(_) | ProxyError::Internal(_) => {
                ErrorCategory::Server
            }
            ProxyError::UpstreamApi { .. } => ErrorCategory::Api,
            ProxyError::UpstreamConnection(_) => ErrorCategory::Connection,
        }
    }

    /// HTTP status for this error. Upstream API errors mirror the backend status.
    #[must_use]
    pub fn status(&self) -> http::StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => http::StatusCode::BAD_REQUEST,
            ProxyError::Auth(_) => http::StatusCode::UNAUTHORIZED,
            ProxyError::UpstreamApi { status, .. } => http::StatusCode::from_u16(*status)
                .unwrap_or(http::StatusCode::BAD_GATEWAY),
            ProxyError::Config(_)
            | ProxyError::UpstreamConnection(_)
            | ProxyError::UpstreamStream(_)
            | ProxyError::Internal(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Format an error as `(status_code, JSON body)`.
#[must_use]
pub fn format_error(err: &ProxyError) -> (http::StatusCode, serde_json::Value) {
    let body = openai_error_payload(err.category(), &err.to_string());
    (err.status(), body)
}

/// Convert a `ProxyError` into an axum response.
#[must_use]
pub fn into_axum_response(err: &ProxyError) -> axum::response::Response {
    use axum::response::IntoResponse;
    let (status, body) = format_error(err);
    (status, axum::Json(body)).into_response()
}

impl axum::response::IntoResponse for ProxyError {
    fn into_response(self) -> axum::response::Response {
        into_axum_response(&self)
    }
}
