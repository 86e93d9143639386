//! HTTP API handlers

pub mod generation;
pub mod health;
pub mod reports;
pub mod responses;
pub mod settings;
pub mod surveys;

pub use generation::generation_routes;
pub use health::health_routes;
pub use reports::report_routes;
pub use responses::response_routes;
pub use settings::settings_routes;
pub use surveys::survey_routes;

use crate::{ApiError, ApiResult};
use axum::extract::rejection::JsonRejection;
use axum::Json;

/// Unwrap a JSON body, reporting malformed input as 400
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}
