//! Survey generation endpoints

use super::json_body;
use crate::generation::{
    FreeTextGeneration, GenerationError, SurveyGenerationRequest, SurveyGenerationResponse,
};
use crate::{ApiError, ApiResult, AppState};
use axum::extract::rejection::JsonRejection;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use survey_common::db::get_setting;
use survey_common::SurveySchema;
use tracing::{debug, error};

/// Body of POST /api/generate/; omitted fields use stored defaults
#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub prompt: String,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub num_questions: Option<u32>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FreeTextBody {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct RegenerateBody {
    pub survey: SurveySchema,
    pub question_index: usize,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegenerateResponse {
    pub survey: SurveySchema,
    pub regenerated_index: usize,
}

/// Record upstream failures for the health endpoint before returning them
async fn track(state: &AppState, err: GenerationError) -> ApiError {
    if !matches!(err, GenerationError::InvalidIndex { .. }) {
        error!("Survey generation failed: {}", err);
        state.record_error(err.to_string()).await;
    }
    err.into()
}

async fn build_request(state: &AppState, body: GenerateBody) -> ApiResult<SurveyGenerationRequest> {
    let mut request = SurveyGenerationRequest::new(body.prompt);
    if let Some(template) = body.template {
        request.template = template;
    }

    request.num_questions = match body.num_questions {
        Some(n) => n,
        None => get_setting(&state.db, "generation_default_questions")
            .await?
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(request.num_questions),
    };

    request.language = match body.language {
        Some(language) => language,
        None => get_setting(&state.db, "generation_default_language")
            .await?
            .unwrap_or(request.language),
    };

    Ok(request.normalized())
}

/// POST /api/generate/
pub async fn generate_survey(
    State(state): State<AppState>,
    payload: Result<Json<GenerateBody>, JsonRejection>,
) -> ApiResult<Json<SurveyGenerationResponse>> {
    let body = json_body(payload)?;
    if body.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("Prompt cannot be empty".to_string()));
    }

    let generator = state.generator().await?;
    let request = build_request(&state, body).await?;
    debug!(?request, "Generation request");

    match generator.generate(request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => Err(track(&state, e).await),
    }
}

/// POST /api/generate/free-text/
pub async fn generate_from_free_text(
    State(state): State<AppState>,
    payload: Result<Json<FreeTextBody>, JsonRejection>,
) -> ApiResult<Json<FreeTextGeneration>> {
    let body = json_body(payload)?;
    if body.text.trim().is_empty() {
        return Err(ApiError::BadRequest("Text cannot be empty".to_string()));
    }

    let generator = state.generator().await?;
    match generator.generate_from_free_text(&body.text).await {
        Ok(generated) => Ok(Json(generated)),
        Err(e) => Err(track(&state, e).await),
    }
}

/// POST /api/generate/regenerate-question/
pub async fn regenerate_question(
    State(state): State<AppState>,
    payload: Result<Json<RegenerateBody>, JsonRejection>,
) -> ApiResult<Json<RegenerateResponse>> {
    let body = json_body(payload)?;
    let generator = state.generator().await?;

    match generator
        .regenerate_question(&body.survey, body.question_index, body.feedback.as_deref())
        .await
    {
        Ok(survey) => Ok(Json(RegenerateResponse {
            survey,
            regenerated_index: body.question_index,
        })),
        Err(e) => Err(track(&state, e).await),
    }
}

pub fn generation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/generate/", post(generate_survey))
        .route("/api/generate/free-text/", post(generate_from_free_text))
        .route("/api/generate/regenerate-question/", post(regenerate_question))
}
