//! Input records and analysis result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use survey_common::QuestionType;

// ========================================
// Input records
// ========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionData {
    pub id: i64,
    pub text: String,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionData {
    pub id: i64,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub required: bool,
    #[serde(default)]
    pub options: Vec<OptionData>,
}

/// Survey metadata and questions, in question order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyData {
    pub id: i64,
    pub public_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub questions: Vec<QuestionData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: i64,
    #[serde(default)]
    pub text_answer: Option<String>,
    #[serde(default)]
    pub selected_options: Vec<i64>,
}

/// One submitted response with its answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub respondent_name: Option<String>,
    #[serde(default)]
    pub respondent_email: Option<String>,
    #[serde(default)]
    pub answers: Vec<AnswerRecord>,
}

// ========================================
// Flattened response view
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondentInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub responded_at: DateTime<Utc>,
}

/// One answer joined with its question metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerData {
    pub question_id: i64,
    pub question_text: String,
    pub question_type: QuestionType,
    pub text_answer: Option<String>,
    pub selected_options: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseData {
    pub response_id: i64,
    pub respondent: RespondentInfo,
    pub answers: Vec<AnswerData>,
}

// ========================================
// Analysis results
// ========================================

/// Tally of one option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionCount {
    pub label: String,
    pub count: u64,
    /// Share of the question's answers, 0-100
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSummary {
    pub question_id: i64,
    pub question_text: String,
    pub question_type: QuestionType,
    pub response_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_responses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_counts: Option<Vec<OptionCount>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
    #[serde(alias = "word_cloud")]
    WordCloud,
    /// Anything else; rendered as a bar chart
    #[serde(other)]
    Unknown,
}

/// Data needed to draw one chart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub title: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub values: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ChartData {
    pub fn new(kind: ChartKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            labels: Vec::new(),
            values: Vec::new(),
            text: None,
        }
    }
}

/// Colour key for one chart series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub label: String,
    pub value: u64,
    pub color: [u8; 3],
}

/// Rendered chart, PNG encoded as base64
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartImage {
    pub png_base64: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub legend: Vec<LegendEntry>,
    /// Message shown instead of data (placeholder charts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnalysis {
    pub summary: QuestionSummary,
    pub chart_data: ChartData,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_image: Option<ChartImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyAnalysisResult {
    pub survey_id: i64,
    pub survey_title: String,
    pub total_responses: u64,
    /// Fraction 0.0-1.0
    pub completion_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_time_to_complete: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionAnalysis>,
    pub created_at: DateTime<Utc>,
}
