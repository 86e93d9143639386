//! # Survey Analytics
//!
//! Report pipeline over in-memory survey records:
//! - [`SurveyAnalyzer`]: per-question summaries, counts, percentages, insights
//! - [`SurveyVisualizer`]: PNG charts (bar, pie, word frequency)
//! - [`exporter`]: PDF, Excel and JSON renderings of the analysis
//! - [`ReportGenerator`]: orchestrates analyze → visualize → export

pub mod analyzer;
pub mod error;
pub mod exporter;
pub mod report;
pub mod schemas;
pub mod visualizer;

pub use analyzer::SurveyAnalyzer;
pub use error::{AnalyticsError, AnalyticsResult};
pub use exporter::{ExcelExporter, Exporter, JsonExporter, PdfExporter};
pub use report::{ReportFormat, ReportGenerator, ReportSource};
pub use schemas::{QuestionAnalysis, SurveyAnalysisResult};
pub use visualizer::{ChartStyle, SurveyVisualizer};
