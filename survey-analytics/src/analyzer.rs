//! Survey response aggregation
//!
//! Groups answers by question and computes, per question type:
//! - text: sample answers and word frequencies
//! - radio/dropdown: counts of the first selected option (pie chart)
//! - checkbox: counts of every selected option (bar chart)

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::schemas::{
    AnswerData, ChartData, ChartKind, OptionCount, QuestionAnalysis, QuestionData,
    QuestionSummary, RespondentInfo, ResponseData, ResponseRecord, SurveyAnalysisResult,
    SurveyData,
};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use survey_common::QuestionType;
use tracing::debug;

/// Sample text answers kept in a summary
pub const MAX_TEXT_SAMPLES: usize = 10;

/// Words kept in the text frequency table
pub const MAX_COMMON_WORDS: usize = 10;

/// Words quoted in a text insight
const INSIGHT_WORDS: usize = 5;

const NO_RESPONSES_INSIGHT: &str = "No responses received for this question.";

/// Analyzer for survey response data
pub struct SurveyAnalyzer {
    survey: SurveyData,
    responses: Vec<ResponseData>,
}

impl SurveyAnalyzer {
    /// Flatten responses against the survey's questions
    ///
    /// Answers referring to questions outside the survey are dropped.
    pub fn new(survey: SurveyData, responses: Vec<ResponseRecord>) -> Self {
        let questions: HashMap<i64, &QuestionData> =
            survey.questions.iter().map(|q| (q.id, q)).collect();

        let flattened = responses
            .into_iter()
            .map(|response| {
                let answers = response
                    .answers
                    .into_iter()
                    .filter_map(|answer| {
                        let Some(question) = questions.get(&answer.question_id) else {
                            debug!(
                                response_id = response.id,
                                question_id = answer.question_id,
                                "Skipping answer for unknown question"
                            );
                            return None;
                        };
                        Some(AnswerData {
                            question_id: question.id,
                            question_text: question.text.clone(),
                            question_type: question.question_type,
                            text_answer: answer.text_answer,
                            selected_options: answer.selected_options,
                        })
                    })
                    .collect();

                ResponseData {
                    response_id: response.id,
                    respondent: RespondentInfo {
                        name: response.respondent_name,
                        email: response.respondent_email,
                        responded_at: response.created_at,
                    },
                    answers,
                }
            })
            .collect();

        Self {
            survey,
            responses: flattened,
        }
    }

    /// Flattened responses
    pub fn responses(&self) -> &[ResponseData] {
        &self.responses
    }

    /// Perform complete analysis of survey responses
    pub fn analyze(&self) -> AnalyticsResult<SurveyAnalysisResult> {
        let mut seen = HashSet::new();
        for question in &self.survey.questions {
            if !seen.insert(question.id) {
                return Err(AnalyticsError::Analysis(format!(
                    "Duplicate question id {} in survey {}",
                    question.id, self.survey.id
                )));
            }
        }

        let questions = self
            .survey
            .questions
            .iter()
            .map(|q| self.analyze_question(q))
            .collect();

        let total_responses = self.responses.len() as u64;

        Ok(SurveyAnalysisResult {
            survey_id: self.survey.id,
            survey_title: self.survey.title.clone(),
            total_responses,
            completion_rate: self.completion_rate(),
            // Responses record submission time only, so duration is unknown
            average_time_to_complete: (total_responses > 0).then(|| "N/A".to_string()),
            questions,
            created_at: Utc::now(),
        })
    }

    /// Share of responses answering every required question
    pub fn completion_rate(&self) -> f64 {
        if self.responses.is_empty() {
            return 0.0;
        }

        let required: Vec<i64> = self
            .survey
            .questions
            .iter()
            .filter(|q| q.required)
            .map(|q| q.id)
            .collect();

        if required.is_empty() {
            return 1.0;
        }

        let complete = self
            .responses
            .iter()
            .filter(|response| {
                required.iter().all(|qid| {
                    response
                        .answers
                        .iter()
                        .any(|a| a.question_id == *qid && is_answered(a))
                })
            })
            .count();

        complete as f64 / self.responses.len() as f64
    }

    fn answers_for(&self, question_id: i64) -> Vec<&AnswerData> {
        self.responses
            .iter()
            .flat_map(|r| r.answers.iter())
            .filter(|a| a.question_id == question_id)
            .collect()
    }

    fn analyze_question(&self, question: &QuestionData) -> QuestionAnalysis {
        let answers = self.answers_for(question.id);

        match question.question_type {
            QuestionType::Text => analyze_text_question(question, &answers),
            QuestionType::Radio | QuestionType::Dropdown => {
                analyze_single_choice_question(question, &answers)
            }
            QuestionType::Checkbox => analyze_multiple_choice_question(question, &answers),
        }
    }
}

fn is_answered(answer: &AnswerData) -> bool {
    let has_text = answer
        .text_answer
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    has_text || !answer.selected_options.is_empty()
}

/// Lowercased whitespace-separated word counts, most frequent first
///
/// Ties keep the order in which words first appear.
pub fn word_frequencies(text: &str) -> Vec<(String, u64)> {
    let mut counts: HashMap<String, (u64, usize)> = HashMap::new();
    for (position, word) in text.to_lowercase().split_whitespace().enumerate() {
        let entry = counts.entry(word.to_string()).or_insert((0, position));
        entry.0 += 1;
    }

    let mut words: Vec<(String, u64, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    words.into_iter().map(|(w, c, _)| (w, c)).collect()
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// First entry with the highest count
fn most_popular(counts: &[OptionCount]) -> Option<&OptionCount> {
    counts.iter().fold(None, |best: Option<&OptionCount>, c| match best {
        Some(b) if b.count >= c.count => Some(b),
        _ => Some(c),
    })
}

fn option_label(question: &QuestionData, option_id: i64) -> String {
    question
        .options
        .iter()
        .find(|o| o.id == option_id)
        .map(|o| o.text.clone())
        .unwrap_or_else(|| format!("Option {}", option_id))
}

/// Options sorted by their stored order
fn ordered_options(question: &QuestionData) -> Vec<&crate::schemas::OptionData> {
    let mut options: Vec<_> = question.options.iter().collect();
    options.sort_by_key(|o| (o.order, o.id));
    options
}

/// Build counts in option order, followed by ids not among the options
fn tally(
    question: &QuestionData,
    selections: impl Iterator<Item = i64>,
    include_zero: bool,
    answer_total: u64,
) -> Vec<OptionCount> {
    let mut counts: HashMap<i64, u64> = HashMap::new();
    let mut unknown_order: Vec<i64> = Vec::new();
    let known: HashSet<i64> = question.options.iter().map(|o| o.id).collect();

    for option_id in selections {
        *counts.entry(option_id).or_insert(0) += 1;
        if !known.contains(&option_id) && !unknown_order.contains(&option_id) {
            unknown_order.push(option_id);
        }
    }

    let known_counts = ordered_options(question).into_iter().filter_map(|o| {
        let count = counts.get(&o.id).copied().unwrap_or(0);
        (include_zero || count > 0).then(|| (o.text.clone(), count))
    });
    let unknown_counts = unknown_order
        .iter()
        .map(|id| (option_label(question, *id), counts[id]));

    known_counts
        .chain(unknown_counts)
        .map(|(label, count)| OptionCount {
            label,
            count,
            percentage: percentage(count, answer_total),
        })
        .collect()
}

fn chart_from_counts(kind: ChartKind, title: &str, counts: &[OptionCount]) -> ChartData {
    ChartData {
        kind,
        title: title.to_string(),
        labels: counts.iter().map(|c| c.label.clone()).collect(),
        values: counts.iter().map(|c| c.count).collect(),
        text: None,
    }
}

fn analyze_text_question(question: &QuestionData, answers: &[&AnswerData]) -> QuestionAnalysis {
    let text_responses: Vec<String> = answers
        .iter()
        .filter_map(|a| a.text_answer.as_deref())
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .collect();

    let all_text = text_responses.join(" ");
    let common_words: Vec<(String, u64)> = word_frequencies(&all_text)
        .into_iter()
        .take(MAX_COMMON_WORDS)
        .collect();

    let insight = if text_responses.is_empty() {
        NO_RESPONSES_INSIGHT.to_string()
    } else {
        let words: Vec<&str> = common_words
            .iter()
            .take(INSIGHT_WORDS)
            .map(|(w, _)| w.as_str())
            .collect();
        format!(
            "Received {} text responses. Most common words: {}",
            text_responses.len(),
            words.join(", ")
        )
    };

    let mut chart_data = ChartData::new(ChartKind::WordCloud, question.text.clone());
    chart_data.text = Some(all_text);

    QuestionAnalysis {
        summary: QuestionSummary {
            question_id: question.id,
            question_text: question.text.clone(),
            question_type: question.question_type,
            response_count: answers.len() as u64,
            text_responses: Some(text_responses.into_iter().take(MAX_TEXT_SAMPLES).collect()),
            option_counts: None,
        },
        chart_data,
        insights: vec![insight],
        chart_image: None,
    }
}

fn analyze_single_choice_question(
    question: &QuestionData,
    answers: &[&AnswerData],
) -> QuestionAnalysis {
    let answer_total = answers.len() as u64;
    let counts = tally(
        question,
        answers.iter().filter_map(|a| a.selected_options.first().copied()),
        false,
        answer_total,
    );

    let insight = match most_popular(&counts) {
        Some(top) => format!(
            "Most popular response: '{}' ({} responses, {:.1}%)",
            top.label, top.count, top.percentage
        ),
        None => NO_RESPONSES_INSIGHT.to_string(),
    };

    QuestionAnalysis {
        summary: QuestionSummary {
            question_id: question.id,
            question_text: question.text.clone(),
            question_type: question.question_type,
            response_count: answer_total,
            text_responses: None,
            option_counts: Some(counts.clone()),
        },
        chart_data: chart_from_counts(ChartKind::Pie, &question.text, &counts),
        insights: vec![insight],
        chart_image: None,
    }
}

fn analyze_multiple_choice_question(
    question: &QuestionData,
    answers: &[&AnswerData],
) -> QuestionAnalysis {
    let answer_total = answers.len() as u64;
    let counts = tally(
        question,
        answers.iter().flat_map(|a| a.selected_options.iter().copied()),
        true,
        answer_total,
    );

    let insight = match most_popular(&counts) {
        Some(top) if answer_total > 0 => format!(
            "Most selected option: '{}' (selected {} times)",
            top.label, top.count
        ),
        _ => NO_RESPONSES_INSIGHT.to_string(),
    };

    QuestionAnalysis {
        summary: QuestionSummary {
            question_id: question.id,
            question_text: question.text.clone(),
            question_type: question.question_type,
            response_count: answer_total,
            text_responses: None,
            option_counts: Some(counts.clone()),
        },
        chart_data: chart_from_counts(ChartKind::Bar, &question.text, &counts),
        insights: vec![insight],
        chart_image: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{AnswerRecord, OptionData};
    use chrono::TimeZone;

    fn option(id: i64, text: &str, order: i64) -> OptionData {
        OptionData {
            id,
            text: text.to_string(),
            order,
        }
    }

    fn survey() -> SurveyData {
        SurveyData {
            id: 7,
            public_id: "AbCdEf12".to_string(),
            title: "Lunch".to_string(),
            description: None,
            questions: vec![
                QuestionData {
                    id: 1,
                    text: "Favourite dish?".to_string(),
                    question_type: QuestionType::Radio,
                    required: true,
                    options: vec![option(10, "Soup", 0), option(11, "Salad", 1), option(12, "Pasta", 2)],
                },
                QuestionData {
                    id: 2,
                    text: "Extras?".to_string(),
                    question_type: QuestionType::Checkbox,
                    required: false,
                    options: vec![option(20, "Bread", 0), option(21, "Dessert", 1), option(22, "Coffee", 2)],
                },
                QuestionData {
                    id: 3,
                    text: "Comments".to_string(),
                    question_type: QuestionType::Text,
                    required: false,
                    options: vec![],
                },
            ],
        }
    }

    fn response(id: i64, answers: Vec<AnswerRecord>) -> ResponseRecord {
        ResponseRecord {
            id,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, id as u32).unwrap(),
            respondent_name: None,
            respondent_email: None,
            answers,
        }
    }

    fn choice(question_id: i64, selected: &[i64]) -> AnswerRecord {
        AnswerRecord {
            question_id,
            text_answer: None,
            selected_options: selected.to_vec(),
        }
    }

    fn text(question_id: i64, value: &str) -> AnswerRecord {
        AnswerRecord {
            question_id,
            text_answer: Some(value.to_string()),
            selected_options: vec![],
        }
    }

    fn sample_responses() -> Vec<ResponseRecord> {
        vec![
            response(1, vec![choice(1, &[11]), choice(2, &[20, 22]), text(3, "Great soup great bread")]),
            response(2, vec![choice(1, &[11]), choice(2, &[22]), text(3, "   ")]),
            response(3, vec![choice(1, &[10]), choice(2, &[]), text(3, "Great")]),
            response(4, vec![choice(2, &[21])]),
        ]
    }

    #[test]
    fn test_single_choice_counts_in_option_order() {
        let result = SurveyAnalyzer::new(survey(), sample_responses()).analyze().unwrap();
        let q = &result.questions[0];

        assert_eq!(q.summary.response_count, 3);
        let counts = q.summary.option_counts.as_ref().unwrap();
        let labels: Vec<&str> = counts.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Soup", "Salad"], "unselected options omitted, order kept");
        assert_eq!(counts[1].count, 2);
        assert!((counts[1].percentage - 66.666).abs() < 0.01);
        assert_eq!(q.chart_data.kind, ChartKind::Pie);
        assert_eq!(q.chart_data.values, vec![1, 2]);
        assert_eq!(q.insights[0], "Most popular response: 'Salad' (2 responses, 66.7%)");
    }

    #[test]
    fn test_multiple_choice_includes_zero_counts() {
        let result = SurveyAnalyzer::new(survey(), sample_responses()).analyze().unwrap();
        let q = &result.questions[1];

        let counts = q.summary.option_counts.as_ref().unwrap();
        let pairs: Vec<(&str, u64)> = counts.iter().map(|c| (c.label.as_str(), c.count)).collect();
        assert_eq!(pairs, vec![("Bread", 1), ("Dessert", 1), ("Coffee", 2)]);
        assert_eq!(q.summary.response_count, 4);
        assert_eq!(q.chart_data.kind, ChartKind::Bar);
        assert_eq!(q.insights[0], "Most selected option: 'Coffee' (selected 2 times)");
    }

    #[test]
    fn test_text_question_skips_blank_answers() {
        let result = SurveyAnalyzer::new(survey(), sample_responses()).analyze().unwrap();
        let q = &result.questions[2];

        let samples = q.summary.text_responses.as_ref().unwrap();
        assert_eq!(samples, &vec!["Great soup great bread".to_string(), "Great".to_string()]);
        assert_eq!(q.summary.response_count, 3);
        assert_eq!(q.chart_data.kind, ChartKind::WordCloud);
        assert_eq!(
            q.insights[0],
            "Received 2 text responses. Most common words: great, soup, bread"
        );
    }

    #[test]
    fn test_unknown_option_and_question_ids() {
        let responses = vec![response(1, vec![choice(1, &[99]), choice(42, &[1])])];
        let analyzer = SurveyAnalyzer::new(survey(), responses);
        assert_eq!(analyzer.responses()[0].answers.len(), 1, "answer to question 42 dropped");

        let result = analyzer.analyze().unwrap();
        let counts = result.questions[0].summary.option_counts.as_ref().unwrap();
        assert_eq!(counts[0].label, "Option 99");
        assert_eq!(counts[0].count, 1);
    }

    #[test]
    fn test_ties_resolve_to_first_option() {
        let responses = vec![
            response(1, vec![choice(1, &[12])]),
            response(2, vec![choice(1, &[10])]),
        ];
        let result = SurveyAnalyzer::new(survey(), responses).analyze().unwrap();
        assert!(result.questions[0].insights[0].contains("'Soup'"));
    }

    #[test]
    fn test_completion_rate_and_totals() {
        let result = SurveyAnalyzer::new(survey(), sample_responses()).analyze().unwrap();
        assert_eq!(result.total_responses, 4);
        // Response 4 skipped the only required question
        assert!((result.completion_rate - 0.75).abs() < f64::EPSILON);
        assert_eq!(result.average_time_to_complete.as_deref(), Some("N/A"));
        assert_eq!(result.survey_title, "Lunch");
    }

    #[test]
    fn test_no_responses() {
        let result = SurveyAnalyzer::new(survey(), vec![]).analyze().unwrap();
        assert_eq!(result.total_responses, 0);
        assert_eq!(result.completion_rate, 0.0);
        assert!(result.average_time_to_complete.is_none());
        for q in &result.questions {
            assert_eq!(q.insights[0], NO_RESPONSES_INSIGHT);
            assert_eq!(q.summary.response_count, 0);
        }
        // Checkbox still lists every option
        assert_eq!(result.questions[1].chart_data.labels.len(), 3);
        assert!(result.questions[0].chart_data.labels.is_empty());
    }

    #[test]
    fn test_duplicate_question_ids_rejected() {
        let mut data = survey();
        data.questions[1].id = 1;
        let err = SurveyAnalyzer::new(data, vec![]).analyze().unwrap_err();
        assert!(matches!(err, AnalyticsError::Analysis(_)));
    }

    #[test]
    fn test_word_frequencies_tie_order() {
        let words = word_frequencies("b a B c a");
        assert_eq!(
            words,
            vec![("b".to_string(), 2), ("a".to_string(), 2), ("c".to_string(), 1)]
        );
    }
}
