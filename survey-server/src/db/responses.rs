//! Response persistence and report input loading

use super::surveys::{find_by_public_id, load_options, load_questions};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use survey_analytics::schemas::{
    AnswerRecord, OptionData, QuestionData, ResponseRecord, SurveyData,
};
use survey_analytics::ReportSource;
use survey_common::db::{AnswerOptionRow, AnswerRow, ResponseRow};
use survey_common::{Error, QuestionType, Result};
use tracing::{debug, info};

/// One submitted answer
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnswer {
    /// Question id
    pub question: i64,
    #[serde(default)]
    pub text_answer: Option<String>,
    #[serde(default)]
    pub selected_options: Vec<i64>,
}

/// Body of a response submission
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub respondent_name: Option<String>,
    #[serde(default)]
    pub respondent_email: Option<String>,
    #[serde(default)]
    pub answers: Vec<SubmitAnswer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
    pub survey: String,
    pub created_at: DateTime<Utc>,
    pub answer_count: usize,
}

/// Answer after validation, ready to insert
struct ValidAnswer {
    question_id: i64,
    text_answer: Option<String>,
    option_ids: Vec<i64>,
}

struct QuestionRules {
    number: usize,
    question_type: QuestionType,
    required: bool,
    options: HashSet<i64>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_answers(
    rules: &HashMap<i64, QuestionRules>,
    answers: Vec<SubmitAnswer>,
) -> Result<Vec<ValidAnswer>> {
    let mut seen = HashSet::new();
    let mut valid = Vec::with_capacity(answers.len());

    for answer in answers {
        let rule = rules.get(&answer.question).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Question {} does not belong to this survey",
                answer.question
            ))
        })?;

        if !seen.insert(answer.question) {
            return Err(Error::InvalidInput(format!(
                "Duplicate answer for question {}",
                rule.number
            )));
        }

        let mut option_ids = Vec::new();
        for option_id in answer.selected_options {
            if !rule.options.contains(&option_id) {
                return Err(Error::InvalidInput(format!(
                    "Option {} does not belong to question {}",
                    option_id, rule.number
                )));
            }
            if !option_ids.contains(&option_id) {
                option_ids.push(option_id);
            }
        }

        let text_answer = match rule.question_type {
            QuestionType::Text => {
                if !option_ids.is_empty() {
                    return Err(Error::InvalidInput(format!(
                        "Question {} is a text question and takes no options",
                        rule.number
                    )));
                }
                answer.text_answer
            }
            _ => {
                if rule.question_type.is_single_choice() && option_ids.len() > 1 {
                    return Err(Error::InvalidInput(format!(
                        "Question {} accepts a single option",
                        rule.number
                    )));
                }
                None
            }
        };

        valid.push(ValidAnswer {
            question_id: answer.question,
            text_answer,
            option_ids,
        });
    }

    for (question_id, rule) in rules {
        if !rule.required {
            continue;
        }
        let answered = valid.iter().any(|a| {
            a.question_id == *question_id
                && (a.text_answer.as_deref().is_some_and(|t| !t.trim().is_empty())
                    || !a.option_ids.is_empty())
        });
        if !answered {
            return Err(Error::InvalidInput(format!(
                "Question {} is required",
                rule.number
            )));
        }
    }

    Ok(valid)
}

/// Validate and store a response with its answers
pub async fn create(
    pool: &SqlitePool,
    public_id: &str,
    submission: SubmitResponse,
) -> Result<CreatedResponse> {
    let survey = find_by_public_id(pool, public_id).await?;
    let questions = load_questions(pool, survey.id).await?;
    let options = load_options(pool, survey.id).await?;

    let mut rules = HashMap::new();
    for (i, question) in questions.iter().enumerate() {
        rules.insert(
            question.id,
            QuestionRules {
                number: i + 1,
                question_type: question.question_type.parse()?,
                required: question.required,
                options: options
                    .get(&question.id)
                    .map(|opts| opts.iter().map(|o| o.id).collect())
                    .unwrap_or_default(),
            },
        );
    }

    let respondent_name = blank_to_none(submission.respondent_name);
    let respondent_email = blank_to_none(submission.respondent_email);
    if let Some(email) = &respondent_email {
        if !email.contains('@') {
            return Err(Error::InvalidInput(format!(
                "Invalid respondent email: {}",
                email
            )));
        }
    }

    let answers = validate_answers(&rules, submission.answers)?;
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let response_id = sqlx::query(
        r#"
        INSERT INTO responses (survey_id, created_at, respondent_name, respondent_email)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(survey.id)
    .bind(now)
    .bind(&respondent_name)
    .bind(&respondent_email)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for answer in &answers {
        let answer_id = sqlx::query(
            "INSERT INTO answers (response_id, question_id, text_answer) VALUES (?, ?, ?)",
        )
        .bind(response_id)
        .bind(answer.question_id)
        .bind(&answer.text_answer)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for option_id in &answer.option_ids {
            sqlx::query("INSERT INTO answer_options (answer_id, option_id) VALUES (?, ?)")
                .bind(answer_id)
                .bind(option_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    sqlx::query("UPDATE surveys SET response_count = response_count + 1 WHERE id = ?")
        .bind(survey.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(
        "Stored response {} for survey {} ({} answers)",
        response_id,
        public_id,
        answers.len()
    );

    Ok(CreatedResponse {
        id: response_id,
        survey: survey.public_id,
        created_at: now,
        answer_count: answers.len(),
    })
}

/// Survey structure and all responses, shaped for the analytics pipeline
pub async fn load_report_input(
    pool: &SqlitePool,
    public_id: &str,
) -> Result<(SurveyData, Vec<ResponseRecord>)> {
    let survey = find_by_public_id(pool, public_id).await?;
    let questions = load_questions(pool, survey.id).await?;
    let mut options = load_options(pool, survey.id).await?;

    let questions = questions
        .into_iter()
        .map(|q| {
            Ok(QuestionData {
                id: q.id,
                question_type: q.question_type.parse()?,
                text: q.text,
                required: q.required,
                options: options
                    .remove(&q.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|o| OptionData {
                        id: o.id,
                        text: o.text,
                        order: o.position,
                    })
                    .collect(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let responses = sqlx::query_as::<_, ResponseRow>(
        "SELECT * FROM responses WHERE survey_id = ? ORDER BY created_at, id",
    )
    .bind(survey.id)
    .fetch_all(pool)
    .await?;

    let answers = sqlx::query_as::<_, AnswerRow>(
        r#"
        SELECT a.id, a.response_id, a.question_id, a.text_answer
        FROM answers a
        JOIN responses r ON a.response_id = r.id
        WHERE r.survey_id = ?
        ORDER BY a.id
        "#,
    )
    .bind(survey.id)
    .fetch_all(pool)
    .await?;

    // Selected options in option order, so "first selected" is stable
    let selections = sqlx::query_as::<_, AnswerOptionRow>(
        r#"
        SELECT ao.answer_id, ao.option_id
        FROM answer_options ao
        JOIN answers a ON ao.answer_id = a.id
        JOIN responses r ON a.response_id = r.id
        JOIN options o ON ao.option_id = o.id
        WHERE r.survey_id = ?
        ORDER BY ao.answer_id, o.position, o.id
        "#,
    )
    .bind(survey.id)
    .fetch_all(pool)
    .await?;

    let mut selected: HashMap<i64, Vec<i64>> = HashMap::new();
    for row in selections {
        selected.entry(row.answer_id).or_default().push(row.option_id);
    }

    let mut by_response: HashMap<i64, Vec<AnswerRecord>> = HashMap::new();
    for answer in answers {
        by_response
            .entry(answer.response_id)
            .or_default()
            .push(AnswerRecord {
                question_id: answer.question_id,
                text_answer: answer.text_answer,
                selected_options: selected.remove(&answer.id).unwrap_or_default(),
            });
    }

    let records: Vec<ResponseRecord> = responses
        .into_iter()
        .map(|r| ResponseRecord {
            answers: by_response.remove(&r.id).unwrap_or_default(),
            id: r.id,
            created_at: r.created_at,
            respondent_name: r.respondent_name,
            respondent_email: r.respondent_email,
        })
        .collect();

    debug!(
        public_id,
        questions = questions.len(),
        responses = records.len(),
        "Report input loaded"
    );

    Ok((
        SurveyData {
            id: survey.id,
            public_id: survey.public_id,
            title: survey.title,
            description: survey.description,
            questions,
        },
        records,
    ))
}

/// Report source backed by the survey database
#[derive(Debug, Clone)]
pub struct DbReportSource {
    pool: SqlitePool,
}

impl DbReportSource {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportSource for DbReportSource {
    async fn load_report_input(
        &self,
        public_id: &str,
    ) -> Result<(SurveyData, Vec<ResponseRecord>)> {
        load_report_input(&self.pool, public_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::surveys::{create_from_schema, get_detail};
    use survey_common::db::init_memory_database;
    use survey_common::{OptionSchema, QuestionSchema, SurveySchema};

    fn schema() -> SurveySchema {
        let options = |texts: &[&str]| {
            Some(
                texts
                    .iter()
                    .map(|t| OptionSchema { text: t.to_string() })
                    .collect(),
            )
        };
        SurveySchema {
            title: "Commute".to_string(),
            description: None,
            questions: vec![
                QuestionSchema {
                    text: "How do you get to work?".to_string(),
                    question_type: QuestionType::Radio,
                    required: true,
                    options: options(&["Car", "Bike", "Train"]),
                },
                QuestionSchema {
                    text: "What would help?".to_string(),
                    question_type: QuestionType::Checkbox,
                    required: false,
                    options: options(&["Showers", "Parking", "Later start"]),
                },
                QuestionSchema {
                    text: "Comments".to_string(),
                    question_type: QuestionType::Text,
                    required: false,
                    options: None,
                },
            ],
        }
    }

    async fn seeded() -> (SqlitePool, String, Vec<(i64, Vec<i64>)>) {
        let pool = init_memory_database().await.unwrap();
        let created = create_from_schema(&pool, &schema(), "").await.unwrap();
        let detail = get_detail(&pool, &created.public_id).await.unwrap();
        let ids = detail
            .schema
            .questions
            .iter()
            .map(|q| (q.id, q.options.iter().map(|o| o.id).collect()))
            .collect();
        (pool, created.public_id, ids)
    }

    fn answer(question: i64, text: Option<&str>, options: &[i64]) -> SubmitAnswer {
        SubmitAnswer {
            question,
            text_answer: text.map(str::to_string),
            selected_options: options.to_vec(),
        }
    }

    fn submission(answers: Vec<SubmitAnswer>) -> SubmitResponse {
        SubmitResponse {
            respondent_name: Some("Ola".to_string()),
            respondent_email: Some("ola@example.com".to_string()),
            answers,
        }
    }

    #[tokio::test]
    async fn test_create_and_load_report_input() {
        let (pool, public_id, ids) = seeded().await;
        let (radio, radio_opts) = &ids[0];
        let (checkbox, checkbox_opts) = &ids[1];
        let (text, _) = &ids[2];

        let created = create(
            &pool,
            &public_id,
            submission(vec![
                answer(*radio, None, &[radio_opts[1]]),
                answer(*checkbox, None, &[checkbox_opts[2], checkbox_opts[0]]),
                answer(*text, Some("Bike lanes"), &[]),
            ]),
        )
        .await
        .unwrap();
        assert_eq!(created.answer_count, 3);

        let detail = get_detail(&pool, &public_id).await.unwrap();
        assert_eq!(detail.response_count, 1);

        let (survey, responses) = load_report_input(&pool, &public_id).await.unwrap();
        assert_eq!(survey.questions.len(), 3);
        assert_eq!(survey.questions[1].options[2].text, "Later start");
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].respondent_name.as_deref(), Some("Ola"));

        let answers = &responses[0].answers;
        assert_eq!(answers[0].selected_options, vec![radio_opts[1]]);
        assert_eq!(
            answers[1].selected_options,
            vec![checkbox_opts[0], checkbox_opts[2]],
            "selections come back in option order"
        );
        assert_eq!(answers[2].text_answer.as_deref(), Some("Bike lanes"));
    }

    #[tokio::test]
    async fn test_validation_rules() {
        let (pool, public_id, ids) = seeded().await;
        let (radio, radio_opts) = &ids[0];
        let (checkbox, checkbox_opts) = &ids[1];
        let (text, _) = &ids[2];

        let cases = vec![
            ("missing required", vec![answer(*text, Some("hi"), &[])]),
            ("foreign question", vec![answer(*radio, None, &[radio_opts[0]]), answer(9999, None, &[])]),
            ("foreign option", vec![answer(*radio, None, &[checkbox_opts[0]])]),
            ("two radio options", vec![answer(*radio, None, &[radio_opts[0], radio_opts[1]])]),
            ("options on text", vec![answer(*radio, None, &[radio_opts[0]]), answer(*text, None, &[radio_opts[0]])]),
            ("duplicate", vec![answer(*radio, None, &[radio_opts[0]]), answer(*radio, None, &[radio_opts[1]])]),
            ("empty choice", vec![answer(*radio, None, &[]), answer(*checkbox, None, &[])]),
        ];

        for (name, answers) in cases {
            let result = create(&pool, &public_id, submission(answers)).await;
            assert!(
                matches!(result, Err(Error::InvalidInput(_))),
                "case '{}' should be rejected",
                name
            );
        }

        let mut bad_email = submission(vec![answer(*radio, None, &[radio_opts[0]])]);
        bad_email.respondent_email = Some("not-an-email".to_string());
        assert!(matches!(
            create(&pool, &public_id, bad_email).await,
            Err(Error::InvalidInput(_))
        ));

        let (_, responses) = load_report_input(&pool, &public_id).await.unwrap();
        assert!(responses.is_empty(), "rejected submissions store nothing");
    }

    #[tokio::test]
    async fn test_blank_respondent_fields_stored_as_null() {
        let (pool, public_id, ids) = seeded().await;
        let (radio, radio_opts) = &ids[0];
        let mut body = submission(vec![answer(*radio, None, &[radio_opts[2]])]);
        body.respondent_name = Some("  ".to_string());
        body.respondent_email = Some(String::new());

        create(&pool, &public_id, body).await.unwrap();
        let (_, responses) = load_report_input(&pool, &public_id).await.unwrap();
        assert!(responses[0].respondent_name.is_none());
        assert!(responses[0].respondent_email.is_none());
    }

    #[tokio::test]
    async fn test_unknown_survey() {
        let pool = init_memory_database().await.unwrap();
        let result = create(&pool, "nope1234", submission(vec![])).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
