//! Settings API endpoint
//!
//! POST /api/settings/openai_api_key stores the key in the database (the
//! highest-priority source) and swaps in a new completion client.

use super::json_body;
use crate::config::{is_valid_key, API_KEY_SETTING};
use crate::{ApiError, ApiResult, AppState};
use axum::extract::rejection::JsonRejection;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use survey_common::db::set_setting;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct SetApiKeyResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/settings/openai_api_key
///
/// **Request:** `{"api_key": "sk-..."}`
/// **Errors:** 400 for an empty or whitespace-only key
pub async fn set_openai_api_key(
    State(state): State<AppState>,
    payload: Result<Json<SetApiKeyRequest>, JsonRejection>,
) -> ApiResult<Json<SetApiKeyResponse>> {
    let request = json_body(payload)?;
    if !is_valid_key(&request.api_key) {
        return Err(ApiError::BadRequest(
            "API key cannot be empty or whitespace-only".to_string(),
        ));
    }
    let key = request.api_key.trim().to_string();

    set_setting(&state.db, API_KEY_SETTING, &key)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to save API key to database: {}", e)))?;

    state.update_api_key(key).await;
    info!("OpenAI API key configured via API");

    Ok(Json(SetApiKeyResponse {
        success: true,
        message: "OpenAI API key configured successfully".to_string(),
    }))
}

pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/api/settings/openai_api_key", post(set_openai_api_key))
}
