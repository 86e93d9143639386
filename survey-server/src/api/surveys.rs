//! Survey list, save, detail and delete endpoints

use super::json_body;
use crate::db::surveys::{self, CreatedSurvey, SurveyDetail, SurveyListItem};
use crate::{ApiResult, AppState};
use axum::extract::rejection::JsonRejection;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use survey_common::SurveySchema;
use tracing::info;

/// Body of POST /api/surveys/
#[derive(Debug, Deserialize)]
pub struct SaveSurveyRequest {
    pub survey: SurveySchema,
    /// Prompt the survey was generated from
    #[serde(default)]
    pub prompt: String,
}

/// GET /api/surveys/
pub async fn list_surveys(State(state): State<AppState>) -> ApiResult<Json<Vec<SurveyListItem>>> {
    Ok(Json(surveys::list(&state.db).await?))
}

/// POST /api/surveys/
///
/// Saves a (usually generated) survey schema. Returns 201 with a summary.
pub async fn save_survey(
    State(state): State<AppState>,
    payload: Result<Json<SaveSurveyRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedSurvey>)> {
    let request = json_body(payload)?;
    let created = surveys::create_from_schema(&state.db, &request.survey, &request.prompt).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/surveys/:public_id/details/
pub async fn survey_details(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> ApiResult<Json<SurveyDetail>> {
    Ok(Json(surveys::get_detail(&state.db, &public_id).await?))
}

/// DELETE /api/surveys/:public_id/
pub async fn delete_survey(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> ApiResult<StatusCode> {
    if surveys::delete(&state.db, &public_id).await? {
        info!("Survey {} deleted via API", public_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(survey_common::Error::survey_not_found(&public_id).into())
    }
}

pub fn survey_routes() -> Router<AppState> {
    Router::new()
        .route("/api/surveys/", get(list_surveys).post(save_survey))
        .route("/api/surveys/:public_id/", axum::routing::delete(delete_survey))
        .route("/api/surveys/:public_id/details/", get(survey_details))
}
