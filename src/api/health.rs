use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// Health check handler. No authentication; reports whether credentials are configured,
/// never their values.
pub fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "status": "notion-proxy is running",
        "config": {
            "notion_cookie_configured": config.has_notion_cookie(),
            "notion_space_id_configured": !config.notion.space_id.is_empty(),
            "default_token_in_use": config.uses_default_token(),
            "features": {
                "log_level": config.features.log_level,
                "default_model": config.features.default_model,
                "default_notion_model": config.features.default_notion_model,
            }
        }
    }))
}
