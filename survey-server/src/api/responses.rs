//! Response submission endpoint

use super::json_body;
use crate::db::responses::{self, CreatedResponse, SubmitResponse};
use crate::{ApiResult, AppState};
use axum::extract::rejection::JsonRejection;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};

/// POST /api/surveys/:public_id/respond/
///
/// **Request:**
/// `{"respondent_name": "..", "respondent_email": "..",
///   "answers": [{"question": 1, "text_answer": "..", "selected_options": [3]}]}`
///
/// **Errors:** 404 unknown survey, 400 when an answer breaks the survey's rules
pub async fn submit_response(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
    payload: Result<Json<SubmitResponse>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let submission = json_body(payload)?;
    let created = responses::create(&state.db, &public_id, submission).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub fn response_routes() -> Router<AppState> {
    Router::new().route("/api/surveys/:public_id/respond/", post(submit_response))
}
