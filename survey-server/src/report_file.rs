//! Writing analytics reports to disk
//!
//! Used by the `survey-report` binary. Files are named
//! `survey_<public_id>_<YYYYmmdd_HHMMSS>.<ext>` inside the output directory,
//! which is created when missing.

use crate::db::{surveys, DbReportSource};
use chrono::{DateTime, Local};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use survey_analytics::{AnalyticsError, ReportFormat, ReportGenerator};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ReportFileError {
    #[error("No survey with responses found; pass a public id")]
    NoSurveyWithResponses,

    #[error(transparent)]
    Store(#[from] survey_common::Error),

    #[error(transparent)]
    Report(#[from] AnalyticsError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type ReportFileResult<T> = Result<T, ReportFileError>;

/// Use the given public id, or fall back to the latest survey with responses
pub async fn resolve_public_id(
    pool: &SqlitePool,
    public_id: Option<String>,
) -> ReportFileResult<String> {
    if let Some(id) = public_id {
        return Ok(id);
    }
    match surveys::latest_with_responses(pool).await? {
        Some(id) => {
            info!("No survey given; using latest survey with responses: {}", id);
            Ok(id)
        }
        None => Err(ReportFileError::NoSurveyWithResponses),
    }
}

pub fn report_file_name(public_id: &str, format: ReportFormat, at: DateTime<Local>) -> String {
    format!(
        "survey_{}_{}.{}",
        public_id,
        at.format("%Y%m%d_%H%M%S"),
        format.exporter().file_extension()
    )
}

/// Generate a report and write it under `output_dir`; returns the file path
pub async fn write_report(
    pool: &SqlitePool,
    public_id: &str,
    output_dir: &Path,
    format: ReportFormat,
    include_charts: bool,
) -> ReportFileResult<PathBuf> {
    let source = DbReportSource::new(pool.clone());
    let mut generator = ReportGenerator::from_source(&source, public_id).await?;

    if generator.generate_analysis()?.total_responses == 0 {
        warn!("Survey {} has no responses; the report will be mostly empty", public_id);
    }

    let bytes = generator.generate_report(format, include_charts)?;

    std::fs::create_dir_all(output_dir).map_err(|source| ReportFileError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;
    let path = output_dir.join(report_file_name(public_id, format, Local::now()));
    std::fs::write(&path, &bytes).map_err(|source| ReportFileError::Io {
        path: path.clone(),
        source,
    })?;

    info!("Report written to {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}
