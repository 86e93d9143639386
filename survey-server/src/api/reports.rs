//! Report download endpoint

use crate::db::DbReportSource;
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use survey_analytics::{ReportFormat, ReportGenerator};
use survey_common::db::get_setting;
use tracing::{error, info};

const INCLUDE_CHARTS_SETTING: &str = "report_include_charts";

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// `pdf` (default), `json` or `xlsx`
    pub format: Option<String>,
    /// Render charts; defaults to the `report_include_charts` setting
    pub charts: Option<bool>,
}

async fn default_include_charts(state: &AppState) -> ApiResult<bool> {
    let value = get_setting(&state.db, INCLUDE_CHARTS_SETTING).await?;
    Ok(value
        .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no"))
        .unwrap_or(true))
}

/// GET /api/surveys/:public_id/report/
///
/// PDF and Excel responses are sent as an attachment named
/// `survey_<public_id>_report.<ext>`; JSON responses carry the analysis.
pub async fn survey_report(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Response> {
    let format = match query.format.as_deref() {
        Some(name) => name
            .parse::<ReportFormat>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        None => ReportFormat::Pdf,
    };
    let include_charts = match query.charts {
        Some(charts) => charts,
        None => default_include_charts(&state).await?,
    };

    let source = DbReportSource::new(state.db.clone());
    let mut generator = ReportGenerator::from_source(&source, &public_id).await?;

    // Chart rasterization and document layout are CPU bound
    let result = tokio::task::spawn_blocking(move || {
        generator.generate_report(format, include_charts)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Report task failed: {}", e)))?;

    let bytes = match result {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Report for survey {} failed: {}", public_id, e);
            state.record_error(e.to_string()).await;
            return Err(e.into());
        }
    };

    info!(
        "Generated {} report for survey {} ({} bytes)",
        format,
        public_id,
        bytes.len()
    );

    let exporter = format.exporter();
    let response = match format {
        ReportFormat::Pdf | ReportFormat::Excel => {
            let disposition = format!(
                "attachment; filename=\"survey_{}_report.{}\"",
                public_id,
                exporter.file_extension()
            );
            (
                [
                    (header::CONTENT_TYPE, exporter.content_type().to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response()
        }
        ReportFormat::Json => (
            [(header::CONTENT_TYPE, exporter.content_type().to_string())],
            bytes,
        )
            .into_response(),
    };

    Ok(response)
}

pub fn report_routes() -> Router<AppState> {
    Router::new().route("/api/surveys/:public_id/report/", get(survey_report))
}
