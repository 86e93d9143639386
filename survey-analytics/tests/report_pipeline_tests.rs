//! End-to-end report pipeline tests over an in-memory report source

use async_trait::async_trait;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::io::Cursor;
use survey_analytics::schemas::{AnswerRecord, OptionData, QuestionData, ResponseRecord, SurveyData};
use survey_analytics::{
    AnalyticsError, ReportFormat, ReportGenerator, ReportSource, SurveyAnalysisResult,
};
use survey_common::QuestionType;

struct MemorySource {
    surveys: HashMap<String, (SurveyData, Vec<ResponseRecord>)>,
}

#[async_trait]
impl ReportSource for MemorySource {
    async fn load_report_input(
        &self,
        public_id: &str,
    ) -> survey_common::Result<(SurveyData, Vec<ResponseRecord>)> {
        self.surveys
            .get(public_id)
            .cloned()
            .ok_or_else(|| survey_common::Error::NotFound(format!("Survey {}", public_id)))
    }
}

fn options(base: i64, texts: &[&str]) -> Vec<OptionData> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| OptionData {
            id: base + i as i64,
            text: t.to_string(),
            order: i as i64,
        })
        .collect()
}

fn feedback_survey() -> SurveyData {
    SurveyData {
        id: 1,
        public_id: "Fb2025aa".to_string(),
        title: "Conference feedback".to_string(),
        description: Some("Post-event survey".to_string()),
        questions: vec![
            QuestionData {
                id: 1,
                text: "Overall rating".to_string(),
                question_type: QuestionType::Radio,
                required: true,
                options: options(100, &["Excellent", "Good", "Poor"]),
            },
            QuestionData {
                id: 2,
                text: "Sessions attended".to_string(),
                question_type: QuestionType::Checkbox,
                required: false,
                options: options(200, &["Keynote", "Workshops", "Panels"]),
            },
            QuestionData {
                id: 3,
                text: "What should we improve?".to_string(),
                question_type: QuestionType::Text,
                required: false,
                options: vec![],
            },
        ],
    }
}

fn answer(question_id: i64, text: Option<&str>, selected: &[i64]) -> AnswerRecord {
    AnswerRecord {
        question_id,
        text_answer: text.map(str::to_string),
        selected_options: selected.to_vec(),
    }
}

fn feedback_responses() -> Vec<ResponseRecord> {
    let rows = vec![
        vec![answer(1, None, &[100]), answer(2, None, &[200, 201]), answer(3, Some("More coffee breaks"), &[])],
        vec![answer(1, None, &[101]), answer(2, None, &[201]), answer(3, Some("more workshops please"), &[])],
        vec![answer(1, None, &[100]), answer(2, None, &[202])],
    ];
    rows.into_iter()
        .enumerate()
        .map(|(i, answers)| ResponseRecord {
            id: i as i64 + 1,
            created_at: Utc.with_ymd_and_hms(2025, 5, 20, 9, i as u32, 0).unwrap(),
            respondent_name: Some(format!("Attendee {}", i + 1)),
            respondent_email: None,
            answers,
        })
        .collect()
}

fn source() -> MemorySource {
    let mut surveys = HashMap::new();
    surveys.insert(
        "Fb2025aa".to_string(),
        (feedback_survey(), feedback_responses()),
    );
    MemorySource { surveys }
}

#[tokio::test]
async fn test_pdf_report_from_source() {
    let source = source();
    let mut generator = ReportGenerator::from_source(&source, "Fb2025aa").await.unwrap();

    let pdf = generator.generate_report(ReportFormat::Pdf, true).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
    assert!(pdf.windows(19).any(|w| w == b"Conference feedback"));

    let analysis = generator.analysis().unwrap();
    assert_eq!(analysis.total_responses, 3);
    assert!(analysis.questions.iter().all(|q| q.chart_image.is_some()));
}

#[tokio::test]
async fn test_unknown_survey_is_not_found() {
    let source = source();
    let result = ReportGenerator::from_source(&source, "missing1").await;
    assert!(matches!(result, Err(survey_common::Error::NotFound(_))));
}

#[test]
fn test_json_report_matches_analysis() {
    let mut generator = ReportGenerator::new(feedback_survey(), feedback_responses());
    let bytes = generator.generate_report(ReportFormat::Json, false).unwrap();
    let parsed: SurveyAnalysisResult = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(parsed.survey_title, "Conference feedback");
    assert!((parsed.completion_rate - 1.0).abs() < f64::EPSILON);

    let rating = &parsed.questions[0];
    assert_eq!(rating.insights[0], "Most popular response: 'Excellent' (2 responses, 66.7%)");

    let sessions = parsed.questions[1].summary.option_counts.as_ref().unwrap();
    let counts: Vec<u64> = sessions.iter().map(|c| c.count).collect();
    assert_eq!(counts, vec![1, 2, 1]);

    let text = &parsed.questions[2];
    assert_eq!(text.summary.text_responses.as_ref().unwrap().len(), 2);
    assert!(text.insights[0].starts_with("Received 2 text responses. Most common words: more"));
    assert!(text.chart_image.is_none());
}

#[test]
fn test_excel_report_lists_every_question() {
    let mut generator = ReportGenerator::new(feedback_survey(), feedback_responses());
    let bytes = generator.generate_report(ReportFormat::Excel, true).unwrap();
    assert!(bytes.starts_with(b"PK"));

    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["Summary", "Q1", "Q2", "Q3"]);

    let summary = workbook.worksheet_range("Summary").unwrap();
    assert_eq!(
        summary.get_value((1, 1)),
        Some(&Data::String("Conference feedback".to_string()))
    );
    assert_eq!(summary.get_value((1, 2)), Some(&Data::Float(3.0)));

    let sessions = workbook.worksheet_range("Q2").unwrap();
    assert_eq!(
        sessions.get_value((5, 0)),
        Some(&Data::String("Workshops".to_string()))
    );
}

#[test]
fn test_empty_survey_still_exports() {
    let mut survey = feedback_survey();
    survey.questions.clear();
    let mut generator = ReportGenerator::new(survey, vec![]);

    let pdf = generator.generate_report(ReportFormat::Pdf, true).unwrap();
    assert!(pdf.windows(28).any(|w| w == b"No questions found in survey"));
}

#[test]
fn test_unsupported_format_rejected() {
    let err = "docx".parse::<ReportFormat>().unwrap_err();
    assert!(matches!(err, AnalyticsError::Export(_)));
}
