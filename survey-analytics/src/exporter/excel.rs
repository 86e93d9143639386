//! Excel workbook export
//!
//! One `Summary` sheet with survey totals and a question index, then one
//! sheet per question (`Q1`, `Q2`, ...) with its tallies or text answers.

use super::Exporter;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::schemas::{QuestionAnalysis, SurveyAnalysisResult};
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};
use survey_common::QuestionType;

/// Row of the question index on the summary sheet
const QUESTION_INDEX_ROW: u32 = 8;
/// Row where per-question data starts, below the property table
const DATA_ROW: u32 = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExcelExporter;

impl ExcelExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for ExcelExporter {
    fn export(&self, analysis: &SurveyAnalysisResult) -> AnalyticsResult<Vec<u8>> {
        build_workbook(analysis)
            .map_err(|e| AnalyticsError::Export(format!("Failed to export Excel file: {}", e)))
    }

    fn content_type(&self) -> &'static str {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    }

    fn file_extension(&self) -> &'static str {
        "xlsx"
    }
}

fn build_workbook(analysis: &SurveyAnalysisResult) -> Result<Vec<u8>, XlsxError> {
    let header = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xD7E4BC))
        .set_border(FormatBorder::Thin);

    let mut workbook = Workbook::new();
    write_summary(workbook.add_worksheet(), analysis, &header)?;

    for (index, question) in analysis.questions.iter().enumerate() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(index))?;
        write_question(sheet, question, &header)?;
    }

    workbook.save_to_buffer()
}

fn sheet_name(index: usize) -> String {
    format!("Q{}", index + 1)
}

fn write_headers(
    sheet: &mut Worksheet,
    row: u32,
    headers: &[&str],
    format: &Format,
) -> Result<(), XlsxError> {
    for (col, text) in headers.iter().enumerate() {
        sheet.write_string_with_format(row, col as u16, *text, format)?;
    }
    Ok(())
}

fn write_summary(
    sheet: &mut Worksheet,
    analysis: &SurveyAnalysisResult,
    header: &Format,
) -> Result<(), XlsxError> {
    sheet.set_name("Summary")?;
    write_headers(
        sheet,
        0,
        &[
            "Survey ID",
            "Survey Title",
            "Total Responses",
            "Completion Rate",
            "Average Time",
            "Report Generated",
        ],
        header,
    )?;
    sheet.write_number(1, 0, analysis.survey_id as f64)?;
    sheet.write_string(1, 1, &analysis.survey_title)?;
    sheet.write_number(1, 2, analysis.total_responses as f64)?;
    sheet.write_string(1, 3, format!("{:.1}%", analysis.completion_rate * 100.0))?;
    sheet.write_string(
        1,
        4,
        analysis.average_time_to_complete.as_deref().unwrap_or("N/A"),
    )?;
    sheet.write_string(
        1,
        5,
        analysis.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    )?;

    write_headers(
        sheet,
        QUESTION_INDEX_ROW,
        &["Question #", "Question Text", "Type", "Responses", "Sheet Name"],
        header,
    )?;
    for (index, question) in analysis.questions.iter().enumerate() {
        let row = QUESTION_INDEX_ROW + 1 + index as u32;
        let summary = &question.summary;
        sheet.write_number(row, 0, (index + 1) as f64)?;
        sheet.write_string(row, 1, &summary.question_text)?;
        sheet.write_string(row, 2, summary.question_type.as_str())?;
        sheet.write_number(row, 3, summary.response_count as f64)?;
        sheet.write_string(row, 4, sheet_name(index))?;
    }
    sheet.set_column_width(1, 40)?;
    Ok(())
}

fn write_question(
    sheet: &mut Worksheet,
    question: &QuestionAnalysis,
    header: &Format,
) -> Result<(), XlsxError> {
    let summary = &question.summary;

    write_headers(sheet, 0, &["Property", "Value"], header)?;
    sheet.write_string(1, 0, "Question Text")?;
    sheet.write_string(1, 1, &summary.question_text)?;
    sheet.write_string(2, 0, "Question Type")?;
    sheet.write_string(2, 1, summary.question_type.as_str())?;
    sheet.write_string(3, 0, "Total Responses")?;
    sheet.write_number(3, 1, summary.response_count as f64)?;
    sheet.set_column_width(0, 18)?;
    sheet.set_column_width(1, 40)?;

    match summary.question_type {
        QuestionType::Radio | QuestionType::Dropdown | QuestionType::Checkbox => {
            let Some(counts) = summary.option_counts.as_ref().filter(|c| !c.is_empty()) else {
                return Ok(());
            };
            let mut rows: Vec<_> = counts.iter().collect();
            let share_header = if summary.question_type == QuestionType::Checkbox {
                // Stable sort keeps option order among ties
                rows.sort_by(|a, b| b.count.cmp(&a.count));
                "Percentage of Respondents"
            } else {
                "Percentage"
            };

            write_headers(sheet, DATA_ROW, &["Option", "Count", share_header], header)?;
            for (i, count) in rows.into_iter().enumerate() {
                let row = DATA_ROW + 1 + i as u32;
                sheet.write_string(row, 0, &count.label)?;
                sheet.write_number(row, 1, count.count as f64)?;
                sheet.write_string(
                    row,
                    2,
                    format!("{:.1}%", share(count.count, summary.response_count)),
                )?;
            }
        }
        QuestionType::Text => {
            let texts = summary.text_responses.as_deref().unwrap_or_default();
            if texts.is_empty() {
                write_headers(sheet, DATA_ROW, &["No text responses received"], header)?;
                return Ok(());
            }
            write_headers(sheet, DATA_ROW, &["Response #", "Text Response"], header)?;
            for (i, text) in texts.iter().enumerate() {
                let row = DATA_ROW + 1 + i as u32;
                sheet.write_number(row, 0, (i + 1) as f64)?;
                sheet.write_string(row, 1, text)?;
            }
        }
    }
    Ok(())
}

/// Percentage of respondents who picked an option
fn share(count: u64, respondents: u64) -> f64 {
    if respondents == 0 {
        0.0
    } else {
        count as f64 / respondents as f64 * 100.0
    }
}
