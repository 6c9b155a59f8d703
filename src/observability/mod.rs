use std::time::Instant;

use http::{Method, StatusCode};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use crate::error::ProxyError;
use crate::stream::EmitStats;

/// Initialize the tracing subscriber with the configured log level.
///
/// Maps config log levels to tracing levels:
/// - "DISABLED" -> no subscriber installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (TRACE, DEBUG, INFO, WARN, ERROR)
///
/// `RUST_LOG`, when set, takes precedence over the configured level.
pub fn init_tracing(log_level: &str) {
    let Some(directive) = tracing_directive(log_level) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new("INFO"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn tracing_directive(log_level: &str) -> Option<String> {
    let level = log_level.to_uppercase();
    match level.as_str() {
        "DISABLED" => None,
        "WARNING" => Some("WARN".to_string()),
        "CRITICAL" => Some("ERROR".to_string()),
        _ => Some(level),
    }
}

/// Log a finished chat completion.
pub fn log_request_complete(mode: &'static str, stats: EmitStats, started: Instant) {
    info!(
        mode,
        fragments = stats.fragments,
        chars = stats.chars,
        duration_ms = elapsed_ms(started),
        "chat completion finished"
    );
}

/// Log a chat completion that failed after the upstream call was made.
pub fn log_request_failed(mode: &'static str, err: &ProxyError, started: Instant) {
    warn!(
        mode,
        error = %err,
        duration_ms = elapsed_ms(started),
        "chat completion failed"
    );
}

/// Requests slower than this are flagged in the access log.
pub const SLOW_REQUEST_MS: u64 = 1000;

fn access_level(status: StatusCode) -> Level {
    if status.is_client_error() || status.is_server_error() {
        Level::WARN
    } else {
        Level::INFO
    }
}

fn is_slow(duration_ms: u64) -> bool {
    duration_ms > SLOW_REQUEST_MS
}

/// One access log line per request, written once the response head is ready.
pub fn log_access(method: &Method, path: &str, status: StatusCode, started: Instant) {
    let duration_ms = elapsed_ms(started);
    let slow = is_slow(duration_ms);
    let level = access_level(status);
    let status = status.as_u16();
    if level == Level::WARN {
        warn!(%method, path, status, duration_ms, slow, "request");
    } else {
        info!(%method, path, status, duration_ms, slow, "request");
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(tracing_directive("DISABLED"), None);
        assert_eq!(tracing_directive("warning").as_deref(), Some("WARN"));
        assert_eq!(tracing_directive("CRITICAL").as_deref(), Some("ERROR"));
        assert_eq!(tracing_directive("debug").as_deref(), Some("DEBUG"));
    }

    #[test]
    fn test_access_level_by_status() {
        assert_eq!(access_level(StatusCode::OK), Level::INFO);
        assert_eq!(access_level(StatusCode::NOT_MODIFIED), Level::INFO);
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::NOT_FOUND,
            StatusCode::METHOD_NOT_ALLOWED,
            StatusCode::PAYLOAD_TOO_LARGE,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            assert_eq!(access_level(status), Level::WARN, "{status}");
        }
    }

    #[test]
    fn test_slow_threshold() {
        assert!(!is_slow(0));
        assert!(!is_slow(SLOW_REQUEST_MS));
        assert!(is_slow(SLOW_REQUEST_MS + 1));
    }

    #[test]
    fn test_log_access_without_subscriber() {
        let started = Instant::now();
        log_access(&Method::GET, "/v1/models", StatusCode::OK, started);
        log_access(&Method::POST, "/v1/chat/completions", StatusCode::UNAUTHORIZED, started);
    }
}
