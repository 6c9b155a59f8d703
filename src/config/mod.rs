pub mod validation;

use serde::{Deserialize, Serialize};
use std::path::Path;

use self::validation::validate_config;

pub const DEFAULT_AUTH_TOKEN: &str = "default_token";

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for environment variable {name}: {message}")]
    Env { name: &'static str, message: String },
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Longest wait in seconds for the next upstream read, response head included.
    /// A long answer that keeps streaming is never cut off.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    #[serde(default = "default_http_pool_max_idle_per_host")]
    pub http_pool_max_idle_per_host: usize,
    #[serde(default = "default_http_pool_idle_timeout_secs")]
    pub http_pool_idle_timeout_secs: u64,
    #[serde(default)]
    pub runtime_worker_threads: Option<usize>,
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub http_use_env_proxy: bool,
}

fn default_port() -> u16 {
    7860
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_timeout() -> u64 {
    180
}
fn default_connect_timeout() -> u64 {
    5
}
fn default_http_pool_max_idle_per_host() -> usize {
    16
}
fn default_http_pool_idle_timeout_secs() -> u64 {
    15
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            http_pool_max_idle_per_host: default_http_pool_max_idle_per_host(),
            http_pool_idle_timeout_secs: default_http_pool_idle_timeout_secs(),
            runtime_worker_threads: None,
            base_path: String::new(),
            http_use_env_proxy: false,
        }
    }
}

/// Notion backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Session cookie sent verbatim in the `cookie` header.
    #[serde(default)]
    pub cookie: String,
    #[serde(default)]
    pub space_id: String,
    #[serde(default)]
    pub active_user_header: Option<String>,
    #[serde(default = "default_client_version")]
    pub client_version: String,
}

fn default_api_url() -> String {
    "https://www.notion.so/api/v3/runInferenceTranscript".to_string()
}
fn default_client_version() -> String {
    "23.13.0.3604".to_string()
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            cookie: String::new(),
            space_id: String::new(),
            active_user_header: None,
            client_version: default_client_version(),
        }
    }
}

/// Client authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientAuthConfig {
    #[serde(default = "default_token")]
    pub token: String,
}

fn default_token() -> String {
    DEFAULT_AUTH_TOKEN.to_string()
}

impl Default for ClientAuthConfig {
    fn default() -> Self {
        Self {
            token: default_token(),
        }
    }
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Model name reported back to clients when the request omits `model`.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Backend model used when the request omits `notion_model`.
    #[serde(default = "default_notion_model")]
    pub default_notion_model: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}
fn default_model() -> String {
    "notion-proxy".to_string()
}
fn default_notion_model() -> String {
    "anthropic-opus-4".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            default_model: default_model(),
            default_notion_model: default_notion_model(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub notion: NotionConfig,
    #[serde(default)]
    pub client_authentication: ClientAuthConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

impl AppConfig {
    #[must_use]
    pub fn has_notion_cookie(&self) -> bool {
        !self.notion.cookie.trim().is_empty()
    }

    #[must_use]
    pub fn uses_default_token(&self) -> bool {
        self.client_authentication.token == DEFAULT_AUTH_TOKEN
    }
}

/// Load configuration from an optional YAML file, apply environment overrides and validate.
///
/// A missing file is not an error: every field has a default and the Notion credentials
/// normally come from the environment.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading an existing file fails, [`ConfigError::Yaml`]
/// when parsing fails, [`ConfigError::Env`] for malformed overrides, or
/// [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    let mut config: AppConfig = if path.exists() {
        let contents = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&contents)?
    } else {
        AppConfig::default()
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Overlay environment variables onto a parsed config.
///
/// `lookup` abstracts the environment so tests don't mutate process state.
///
/// # Errors
///
/// Returns [`ConfigError::Env`] when `PORT` is not a valid port number.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(cookie) = lookup("NOTION_COOKIE") {
        config.notion.cookie = cookie;
    }
    if let Some(space_id) = lookup("NOTION_SPACE_ID") {
        config.notion.space_id = space_id;
    }
    if let Some(active_user) = lookup("NOTION_ACTIVE_USER_HEADER") {
        config.notion.active_user_header = Some(active_user).filter(|v| !v.is_empty());
    }
    if let Some(token) = lookup("PROXY_AUTH_TOKEN").filter(|v| !v.is_empty()) {
        config.client_authentication.token = token;
    }
    if let Some(level) = lookup("LOG_LEVEL").filter(|v| !v.is_empty()) {
        config.features.log_level = level;
    }
    if let Some(port) = lookup("PORT").filter(|v| !v.is_empty()) {
        config.server.port = port.trim().parse().map_err(|e| ConfigError::Env {
            name: "PORT",
            message: format!("{e}"),
        })?;
    }
    Ok(())
}
