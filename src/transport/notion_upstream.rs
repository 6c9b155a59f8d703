use http::header::{HeaderName, HeaderValue};

use crate::config::NotionConfig;
use crate::error::ProxyError;

const NOTION_ORIGIN: &str = "https://www.notion.so";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/136.0.0.0 Safari/537.36";

const FIXED_HEADERS: &[(&str, &str)] = &[
    ("accept", "application/x-ndjson"),
    (
        "accept-language",
        "en-US,en;q=0.9,zh-CN;q=0.8,zh;q=0.7,zh-TW;q=0.6,ja;q=0.5",
    ),
    ("content-type", "application/json"),
    ("notion-audit-log-platform", "web"),
    ("origin", NOTION_ORIGIN),
    ("priority", "u=1, i"),
    ("referer", NOTION_ORIGIN),
    (
        "sec-ch-ua",
        "\"Chromium\";v=\"136\", \"Google Chrome\";v=\"136\", \"Not.A/Brand\";v=\"99\"",
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Windows\""),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "same-origin"),
    ("user-agent", BROWSER_USER_AGENT),
];

/// Parsed endpoint and precomputed headers for the inference endpoint.
#[derive(Debug, Clone)]
pub struct PreparedNotionUpstream {
    url: url::Url,
    headers: http::HeaderMap,
}

impl PreparedNotionUpstream {
    /// # Errors
    ///
    /// Returns [`ProxyError::Config`] when the URL or a credential cannot be used as-is.
    pub fn new(config: &NotionConfig) -> Result<Self, ProxyError> {
        let url = url::Url::parse(&config.api_url)
            .map_err(|e| ProxyError::Config(format!("invalid notion.api_url: {e}")))?;

        let mut headers = http::HeaderMap::with_capacity(FIXED_HEADERS.len() + 4);
        for (name, value) in FIXED_HEADERS {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        headers.insert(
            HeaderName::from_static("notion-client-version"),
            header_value("notion.client_version", &config.client_version, false)?,
        );
        if !config.cookie.is_empty() {
            headers.insert(
                http::header::COOKIE,
                header_value("notion.cookie", &config.cookie, true)?,
            );
        }
        headers.insert(
            HeaderName::from_static("x-notion-space-id"),
            header_value("notion.space_id", &config.space_id, false)?,
        );
        if let Some(active_user) = config.active_user_header.as_deref() {
            headers.insert(
                HeaderName::from_static("x-notion-active-user-header"),
                header_value("notion.active_user_header", active_user, false)?,
            );
        }

        Ok(Self { url, headers })
    }

    #[inline]
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    #[inline]
    #[must_use]
    pub fn headers(&self) -> &http::HeaderMap {
        &self.headers
    }
}

fn header_value(field: &str, value: &str, sensitive: bool) -> Result<HeaderValue, ProxyError> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| ProxyError::Config(format!("{field} is not a valid header value")))?;
    value.set_sensitive(sensitive);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NotionConfig {
        NotionConfig {
            cookie: "token_v2=abc".to_string(),
            space_id: "space-1".to_string(),
            ..NotionConfig::default()
        }
    }

    #[test]
    fn test_fixed_and_credential_headers() {
        let prepared = PreparedNotionUpstream::new(&config()).unwrap();
        let headers = prepared.headers();
        assert_eq!(headers["accept"], "application/x-ndjson");
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers["notion-audit-log-platform"], "web");
        assert_eq!(headers["notion-client-version"], "23.13.0.3604");
        assert_eq!(headers["origin"], "https://www.notion.so");
        assert_eq!(headers["referer"], "https://www.notion.so");
        assert!(headers["user-agent"].to_str().unwrap().contains("Chrome/136"));
        assert_eq!(headers["cookie"], "token_v2=abc");
        assert!(headers["cookie"].is_sensitive());
        assert_eq!(headers["x-notion-space-id"], "space-1");
        assert!(headers.get("x-notion-active-user-header").is_none());
        assert_eq!(
            prepared.url().as_str(),
            "https://www.notion.so/api/v3/runInferenceTranscript"
        );
    }

    #[test]
    fn test_active_user_header_when_configured() {
        let mut config = config();
        config.active_user_header = Some("user-42".to_string());
        let prepared = PreparedNotionUpstream::new(&config).unwrap();
        assert_eq!(prepared.headers()["x-notion-active-user-header"], "user-42");
    }

    #[test]
    fn test_missing_cookie_omits_header() {
        let mut config = config();
        config.cookie.clear();
        let prepared = PreparedNotionUpstream::new(&config).unwrap();
        assert!(prepared.headers().get("cookie").is_none());
    }

    #[test]
    fn test_invalid_cookie_is_config_error() {
        let mut config = config();
        config.cookie = "bad\ncookie".to_string();
        assert!(matches!(
            PreparedNotionUpstream::new(&config),
            Err(ProxyError::Config(_))
        ));
    }
}
