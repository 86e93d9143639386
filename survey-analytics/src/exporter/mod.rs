//! Report exporters

mod excel;
mod pdf;

pub use excel::ExcelExporter;
pub use pdf::PdfExporter;

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::schemas::SurveyAnalysisResult;

/// Serializes an analysis result into a downloadable document
pub trait Exporter: Send + Sync {
    fn export(&self, analysis: &SurveyAnalysisResult) -> AnalyticsResult<Vec<u8>>;

    /// MIME type of the exported bytes
    fn content_type(&self) -> &'static str;

    /// File extension without the leading dot
    fn file_extension(&self) -> &'static str;
}

/// Pretty-printed JSON export
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

impl Exporter for JsonExporter {
    fn export(&self, analysis: &SurveyAnalysisResult) -> AnalyticsResult<Vec<u8>> {
        serde_json::to_vec_pretty(analysis)
            .map_err(|e| AnalyticsError::Export(format!("JSON serialization failed: {}", e)))
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }
}
