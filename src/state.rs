mod completion_id;

use crate::auth::{authenticate, ExpectedToken};
use crate::config::AppConfig;
use crate::error::ProxyError;
use crate::protocol::openai_chat::RequestDefaults;
use crate::transport::{HttpTransport, PreparedNotionUpstream};

use completion_id::CompletionIdGenerator;

/// Shared application state accessible to all handlers. Read-only after startup.
pub struct AppState {
    pub config: AppConfig,
    pub transport: HttpTransport,
    pub upstream: PreparedNotionUpstream,
    expected_token: ExpectedToken,
    completion_ids: CompletionIdGenerator,
}

impl AppState {
    /// Build state from a validated config.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Config`] when the HTTP client or upstream headers cannot be built.
    pub fn new(config: AppConfig) -> Result<Self, ProxyError> {
        let transport = HttpTransport::new(&config.server)?;
        let upstream = PreparedNotionUpstream::new(&config.notion)?;
        let expected_token = ExpectedToken::from_config(&config);
        Ok(Self {
            config,
            transport,
            upstream,
            expected_token,
            completion_ids: CompletionIdGenerator::new(),
        })
    }

    /// Check the request's bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Auth`] when the token is missing or invalid.
    pub fn authenticate(&self, headers: &http::HeaderMap) -> Result<(), ProxyError> {
        authenticate(headers, &self.expected_token)
    }

    #[must_use]
    pub fn next_completion_id(&self) -> String {
        self.completion_ids.next_completion_id()
    }

    #[must_use]
    pub fn request_defaults(&self) -> RequestDefaults<'_> {
        RequestDefaults {
            model: &self.config.features.default_model,
            notion_model: &self.config.features.default_notion_model,
        }
    }
}
