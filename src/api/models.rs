use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::into_axum_response;
use crate::protocol::openai_chat::{ModelCard, ModelList};
use crate::state::AppState;
use crate::util::unix_now_secs;

/// Backend models selectable through `notion_model`.
pub const NOTION_MODELS: [&str; 3] = ["openai-gpt-4.1", "anthropic-opus-4", "anthropic-sonnet-4"];

#[must_use]
pub fn model_list() -> ModelList {
    let created = unix_now_secs();
    ModelList {
        object: "list".to_string(),
        data: NOTION_MODELS
            .iter()
            .map(|id| ModelCard {
                id: (*id).to_string(),
                object: "model".to_string(),
                created,
                owned_by: "notion".to_string(),
            })
            .collect(),
    }
}

/// `GET /v1/models`.
pub async fn handler(State(state): State<Arc<AppState>>, headers: &HeaderMap) -> Response {
    if let Err(err) = state.authenticate(headers) {
        return into_axum_response(&err);
    }
    Json(model_list()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_model_list_contents() {
        let list = model_list();
        assert_eq!(list.object, "list");
        let ids: Vec<&str> = list.data.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, NOTION_MODELS);
        for card in &list.data {
            assert_eq!(card.object, "model");
            assert_eq!(card.owned_by, "notion");
            assert!(card.created > 0);
        }
    }

    #[tokio::test]
    async fn test_handler_requires_auth() {
        let state = Arc::new(AppState::new(AppConfig::default()).unwrap());
        let response = handler(State(state), &HeaderMap::new()).await;
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
    }
}
