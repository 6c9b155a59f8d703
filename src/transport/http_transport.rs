use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::ProxyError;

/// Longest upstream error body echoed back to the client.
const UPSTREAM_ERROR_BODY_MAX_CHARS: usize = 1024;

fn build_reqwest_client(config: &ServerConfig) -> Result<reqwest::Client, ProxyError> {
    let pool_idle_timeout = if config.http_pool_idle_timeout_secs == 0 {
        None
    } else {
        Some(Duration::from_secs(config.http_pool_idle_timeout_secs))
    };

    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(config.http_pool_max_idle_per_host.max(1))
        .pool_idle_timeout(pool_idle_timeout)
        .tcp_nodelay(true)
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .redirect(reqwest::redirect::Policy::none())
        .read_timeout(Duration::from_secs(config.timeout));

    if !config.http_use_env_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|err| ProxyError::Config(format!("Failed to build HTTP client: {err}")))
}

/// HTTP client for the single upstream call each request makes.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with connection pooling and timeouts from the server config.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Config`] when the HTTP client cannot be built.
    pub fn new(config: &ServerConfig) -> Result<Self, ProxyError> {
        Ok(Self {
            client: build_reqwest_client(config)?,
        })
    }

    /// POST `body` and return the response once a 2xx status arrives.
    ///
    /// Exactly one attempt is made. The body is left unread so the caller can stream it.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::UpstreamConnection`] when no response arrives, or
    /// [`ProxyError::UpstreamApi`] carrying the upstream status and body for non-2xx replies.
    pub async fn send_stream(
        &self,
        url: &url::Url,
        headers: &http::HeaderMap,
        body: bytes::Bytes,
    ) -> Result<reqwest::Response, ProxyError> {
        let mut request = reqwest::Request::new(http::Method::POST, url.clone());
        *request.headers_mut() = headers.clone();
        *request.body_mut() = Some(reqwest::Body::from(body));

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|err| ProxyError::UpstreamConnection(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %text, "upstream returned error status");
        Err(ProxyError::UpstreamApi {
            status: status.as_u16(),
            message: truncate_chars(text, UPSTREAM_ERROR_BODY_MAX_CHARS),
        })
    }
}

fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((byte_idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(byte_idx);
    }
    text
}
