//! Report pipeline orchestration

use crate::analyzer::SurveyAnalyzer;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::exporter::{ExcelExporter, Exporter, JsonExporter, PdfExporter};
use crate::schemas::{ResponseRecord, SurveyAnalysisResult, SurveyData};
use crate::visualizer::SurveyVisualizer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Output document format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Pdf,
    Json,
    #[serde(rename = "xlsx", alias = "excel")]
    Excel,
}

impl ReportFormat {
    pub fn exporter(&self) -> Box<dyn Exporter> {
        match self {
            ReportFormat::Pdf => Box::new(PdfExporter::new()),
            ReportFormat::Json => Box::new(JsonExporter),
            ReportFormat::Excel => Box::new(ExcelExporter::new()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Json => "json",
            ReportFormat::Excel => "xlsx",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> AnalyticsResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ReportFormat::Pdf),
            "json" => Ok(ReportFormat::Json),
            "xlsx" | "excel" => Ok(ReportFormat::Excel),
            other => Err(AnalyticsError::Export(format!("Unsupported format: {}", other))),
        }
    }
}

/// Store able to supply a survey and its responses by public id
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn load_report_input(
        &self,
        public_id: &str,
    ) -> survey_common::Result<(SurveyData, Vec<ResponseRecord>)>;
}

/// Runs analysis, chart rendering and export for one survey
///
/// The analysis is computed once and reused by later stages.
pub struct ReportGenerator {
    analyzer: SurveyAnalyzer,
    visualizer: SurveyVisualizer,
    analysis: Option<SurveyAnalysisResult>,
    visualized: bool,
}

impl ReportGenerator {
    pub fn new(survey: SurveyData, responses: Vec<ResponseRecord>) -> Self {
        Self {
            analyzer: SurveyAnalyzer::new(survey, responses),
            visualizer: SurveyVisualizer::new(),
            analysis: None,
            visualized: false,
        }
    }

    /// Load survey and responses from a store
    pub async fn from_source(
        source: &dyn ReportSource,
        public_id: &str,
    ) -> survey_common::Result<Self> {
        let (survey, responses) = source.load_report_input(public_id).await?;
        debug!(
            public_id,
            responses = responses.len(),
            "Loaded report input"
        );
        Ok(Self::new(survey, responses))
    }

    /// Cached analysis, if already computed
    pub fn analysis(&self) -> Option<&SurveyAnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn generate_analysis(&mut self) -> AnalyticsResult<&SurveyAnalysisResult> {
        if self.analysis.is_none() {
            let analysis = self.analyzer.analyze()?;
            info!(
                survey_id = analysis.survey_id,
                responses = analysis.total_responses,
                "Survey analysis complete"
            );
            self.analysis = Some(analysis);
        }
        self.cached()
    }

    /// Render a chart image for every question
    pub fn add_visualizations(&mut self) -> AnalyticsResult<&SurveyAnalysisResult> {
        self.generate_analysis()?;

        if !self.visualized {
            if let Some(analysis) = self.analysis.as_mut() {
                for question in &mut analysis.questions {
                    let image = self.visualizer.create_chart(&question.chart_data)?;
                    question.chart_image = Some(image);
                }
            }
            self.visualized = true;
        }
        self.cached()
    }

    pub fn export_report(
        &mut self,
        format: ReportFormat,
        include_visualizations: bool,
    ) -> AnalyticsResult<Vec<u8>> {
        let exporter = format.exporter();

        if include_visualizations {
            let analysis = self.add_visualizations()?;
            return exporter.export(analysis);
        }

        let analysis = self.generate_analysis()?;
        if analysis.questions.iter().any(|q| q.chart_image.is_some()) {
            let mut stripped = analysis.clone();
            for question in &mut stripped.questions {
                question.chart_image = None;
            }
            return exporter.export(&stripped);
        }
        exporter.export(analysis)
    }

    /// Full pipeline in one call
    pub fn generate_report(
        &mut self,
        format: ReportFormat,
        include_visualizations: bool,
    ) -> AnalyticsResult<Vec<u8>> {
        self.export_report(format, include_visualizations)
            .map_err(|e| match e {
                AnalyticsError::Report(_) => e,
                other => AnalyticsError::Report(other.to_string()),
            })
    }

    fn cached(&self) -> AnalyticsResult<&SurveyAnalysisResult> {
        self.analysis
            .as_ref()
            .ok_or_else(|| AnalyticsError::Analysis("Analysis not available".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{AnswerRecord, OptionData, QuestionData};
    use chrono::Utc;
    use survey_common::QuestionType;

    fn input() -> (SurveyData, Vec<ResponseRecord>) {
        let survey = SurveyData {
            id: 3,
            public_id: "QwErTy12".to_string(),
            title: "Office".to_string(),
            description: None,
            questions: vec![QuestionData {
                id: 30,
                text: "Desk or home?".to_string(),
                question_type: QuestionType::Dropdown,
                required: true,
                options: vec![
                    OptionData { id: 300, text: "Desk".to_string(), order: 0 },
                    OptionData { id: 301, text: "Home".to_string(), order: 1 },
                ],
            }],
        };
        let responses = vec![ResponseRecord {
            id: 1,
            created_at: Utc::now(),
            respondent_name: None,
            respondent_email: None,
            answers: vec![AnswerRecord {
                question_id: 30,
                text_answer: None,
                selected_options: vec![301],
            }],
        }];
        (survey, responses)
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("PDF".parse::<ReportFormat>().unwrap(), ReportFormat::Pdf);
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!("excel".parse::<ReportFormat>().unwrap(), ReportFormat::Excel);
        assert!("docx".parse::<ReportFormat>().is_err());
        assert_eq!(ReportFormat::Json.exporter().file_extension(), "json");
        assert_eq!(ReportFormat::Excel.exporter().file_extension(), "xlsx");
        assert_eq!(ReportFormat::Excel.to_string(), "xlsx");
    }

    #[test]
    fn test_analysis_is_cached() {
        let (survey, responses) = input();
        let mut generator = ReportGenerator::new(survey, responses);
        assert!(generator.analysis().is_none());

        let first = generator.generate_analysis().unwrap().created_at;
        let second = generator.generate_analysis().unwrap().created_at;
        assert_eq!(first, second);
    }

    #[test]
    fn test_visualizations_fill_chart_images() {
        let (survey, responses) = input();
        let mut generator = ReportGenerator::new(survey, responses);
        let analysis = generator.add_visualizations().unwrap();
        assert!(analysis.questions.iter().all(|q| q.chart_image.is_some()));
    }

    #[test]
    fn test_json_export_without_charts_strips_images() {
        let (survey, responses) = input();
        let mut generator = ReportGenerator::new(survey, responses);
        generator.add_visualizations().unwrap();

        let bytes = generator.export_report(ReportFormat::Json, false).unwrap();
        let parsed: SurveyAnalysisResult = serde_json::from_slice(&bytes).unwrap();
        assert!(parsed.questions[0].chart_image.is_none());
        assert_eq!(parsed.total_responses, 1);
    }

    #[test]
    fn test_generate_report_wraps_stage_errors() {
        let (mut survey, responses) = input();
        survey.questions.push(survey.questions[0].clone());
        let err = ReportGenerator::new(survey, responses)
            .generate_report(ReportFormat::Pdf, true)
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::Report(_)));
        assert!(err.to_string().starts_with("Failed to generate report:"));
    }
}
