use super::{AppConfig, ConfigError};

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_server_config(config)?;
    validate_client_token(config)?;
    validate_notion_config(config)?;
    validate_log_level(config)?;
    validate_defaults(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_server_config(config: &AppConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.timeout == 0 {
        return Err(validation_err("server.timeout must be greater than 0"));
    }
    if server.connect_timeout == 0 {
        return Err(validation_err(
            "server.connect_timeout must be greater than 0",
        ));
    }
    if server.http_pool_max_idle_per_host == 0 {
        return Err(validation_err(
            "server.http_pool_max_idle_per_host must be greater than 0",
        ));
    }
    if let Some(worker_threads) = server.runtime_worker_threads {
        if worker_threads == 0 {
            return Err(validation_err(
                "server.runtime_worker_threads must be greater than 0 when set",
            ));
        }
    }
    Ok(())
}

fn validate_client_token(config: &AppConfig) -> Result<(), ConfigError> {
    if config.client_authentication.token.trim().is_empty() {
        return Err(validation_err("client_authentication.token cannot be empty"));
    }
    Ok(())
}

fn validate_notion_config(config: &AppConfig) -> Result<(), ConfigError> {
    let notion = &config.notion;
    let parsed = url::Url::parse(&notion.api_url)
        .map_err(|e| validation_err(format!("notion.api_url is not a valid URL: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(validation_err(
            "notion.api_url must start with http:// or https://",
        ));
    }
    if notion.client_version.trim().is_empty() {
        return Err(validation_err("notion.client_version cannot be empty"));
    }

    // These end up in request headers; reject values that could never be sent.
    validate_header_value("notion.cookie", &notion.cookie)?;
    validate_header_value("notion.space_id", &notion.space_id)?;
    validate_header_value("notion.client_version", &notion.client_version)?;
    if let Some(active_user) = notion.active_user_header.as_deref() {
        validate_header_value("notion.active_user_header", active_user)?;
    }
    Ok(())
}

fn validate_header_value(field: &str, value: &str) -> Result<(), ConfigError> {
    http::HeaderValue::from_str(value)
        .map(|_| ())
        .map_err(|_| validation_err(format!("{field} contains characters not allowed in an HTTP header")))
}

const VALID_LOG_LEVELS: &[&str] = &[
    "DEBUG", "INFO", "WARNING", "WARN", "ERROR", "CRITICAL", "TRACE", "DISABLED",
];

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let level = config.features.log_level.to_uppercase();
    if !VALID_LOG_LEVELS.contains(&level.as_str()) {
        return Err(validation_err(format!(
            "features.log_level '{}' is invalid. Must be one of: {}",
            config.features.log_level,
            VALID_LOG_LEVELS.join(", ")
        )));
    }
    Ok(())
}

fn validate_defaults(config: &AppConfig) -> Result<(), ConfigError> {
    if config.features.default_model.trim().is_empty() {
        return Err(validation_err("features.default_model cannot be empty"));
    }
    if config.features.default_notion_model.trim().is_empty() {
        return Err(validation_err(
            "features.default_notion_model cannot be empty",
        ));
    }
    Ok(())
}
