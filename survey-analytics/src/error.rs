//! Error types for the analytics pipeline

use thiserror::Error;

/// Errors raised by each pipeline stage
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Failure while aggregating response data
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Failure while rendering a chart
    #[error("Visualization error: {0}")]
    Visualization(String),

    /// Failure while producing the output document
    #[error("Export error: {0}")]
    Export(String),

    /// Any stage failure surfaced by the one-step report pipeline
    #[error("Failed to generate report: {0}")]
    Report(String),
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
