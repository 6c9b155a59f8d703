use http::header::AUTHORIZATION;

use crate::config::AppConfig;
use crate::error::ProxyError;

const MISSING_CREDENTIALS: &str = "Missing authentication credentials";
const INVALID_CREDENTIALS: &str = "Invalid authentication credentials";

/// The single client token the proxy accepts.
pub struct ExpectedToken {
    token: Box<[u8]>,
}

impl ExpectedToken {
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self {
            token: token.as_bytes().into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.client_authentication.token)
    }

    #[must_use]
    pub fn matches(&self, presented: &[u8]) -> bool {
        constant_time_eq(&self.token, presented)
    }
}

/// Bytes following `Bearer ` in the `Authorization` header, if present.
#[must_use]
pub fn extract_bearer(headers: &http::HeaderMap) -> Option<&[u8]> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.as_bytes().strip_prefix(b"Bearer "))
}

/// Compare two byte slices without short-circuiting on the first difference.
///
/// Length mismatch returns early; the token length is not treated as secret.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Check the bearer token of an incoming request.
///
/// # Errors
///
/// Returns [`ProxyError::Auth`] when the header is missing, not a bearer token, or the token
/// does not match.
pub fn authenticate(headers: &http::HeaderMap, expected: &ExpectedToken) -> Result<(), ProxyError> {
    let presented = extract_bearer(headers)
        .ok_or_else(|| ProxyError::Auth(MISSING_CREDENTIALS.to_string()))?;
    if expected.matches(presented) {
        Ok(())
    } else {
        Err(ProxyError::Auth(INVALID_CREDENTIALS.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> http::HeaderMap {
        let mut headers = http::HeaderMap::new();
        headers.insert("authorization", value.parse().unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer() {
        let headers = headers_with("Bearer sk-test123");
        assert_eq!(extract_bearer(&headers), Some(b"sk-test123".as_slice()));
    }

    #[test]
    fn test_extract_bearer_requires_scheme() {
        assert!(extract_bearer(&headers_with("sk-test123")).is_none());
        assert!(extract_bearer(&headers_with("Basic abc")).is_none());
        assert!(extract_bearer(&http::HeaderMap::new()).is_none());
    }

    #[test]
    fn test_authenticate_valid_token() {
        let expected = ExpectedToken::new("secret");
        assert!(authenticate(&headers_with("Bearer secret"), &expected).is_ok());
    }

    #[test]
    fn test_authenticate_missing_header() {
        let expected = ExpectedToken::new("secret");
        let err = authenticate(&http::HeaderMap::new(), &expected).unwrap_err();
        assert!(matches!(err, ProxyError::Auth(msg) if msg == MISSING_CREDENTIALS));
    }

    #[test]
    fn test_authenticate_one_char_off() {
        let expected = ExpectedToken::new("secret");
        for token in ["Bearer secreT", "Bearer secre", "Bearer secrets", "Bearer "] {
            let err = authenticate(&headers_with(token), &expected).unwrap_err();
            assert!(matches!(err, ProxyError::Auth(msg) if msg == INVALID_CREDENTIALS));
        }
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_from_config_uses_client_token() {
        let mut config = AppConfig::default();
        config.client_authentication.token = "from-config".to_string();
        let expected = ExpectedToken::from_config(&config);
        assert!(expected.matches(b"from-config"));
        assert!(!expected.matches(b"default_token"));
    }
}
