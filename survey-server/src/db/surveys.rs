//! Survey persistence

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use survey_common::db::{OptionRow, QuestionRow, SurveyRow};
use survey_common::model::generate_public_id;
use survey_common::{Error, QuestionType, Result, SurveySchema};
use tracing::{debug, info};

/// Attempts at drawing an unused public id
const PUBLIC_ID_ATTEMPTS: usize = 8;

/// Summary returned after saving a survey
#[derive(Debug, Clone, Serialize)]
pub struct CreatedSurvey {
    pub id: i64,
    pub public_id: String,
    pub title: String,
    pub description: Option<String>,
    pub question_count: i64,
}

/// Survey list entry
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SurveyListItem {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub public_id: String,
    pub response_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionDetail {
    pub id: i64,
    pub text: String,
    pub order: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionDetail {
    pub id: i64,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub required: bool,
    pub order: i64,
    pub options: Vec<OptionDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveyStructure {
    pub questions: Vec<QuestionDetail>,
}

/// Survey with its ordered questions and options
#[derive(Debug, Clone, Serialize)]
pub struct SurveyDetail {
    pub id: i64,
    pub public_id: String,
    pub title: String,
    pub description: Option<String>,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub response_count: i64,
    pub schema: SurveyStructure,
}

/// Persist a validated survey with its questions and options
pub async fn create_from_schema(
    pool: &SqlitePool,
    schema: &SurveySchema,
    prompt: &str,
) -> Result<CreatedSurvey> {
    schema.validate()?;
    let schema = schema.normalized();
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let mut public_id = None;
    for _ in 0..PUBLIC_ID_ATTEMPTS {
        let candidate = generate_public_id();
        let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM surveys WHERE public_id = ?")
            .bind(&candidate)
            .fetch_one(&mut *tx)
            .await?;
        if taken == 0 {
            public_id = Some(candidate);
            break;
        }
        debug!("Public id collision on {}, retrying", candidate);
    }
    let public_id = public_id
        .ok_or_else(|| Error::Internal("Could not allocate a unique public id".to_string()))?;

    let survey_id = sqlx::query(
        r#"
        INSERT INTO surveys (public_id, title, description, prompt, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(&schema.title)
    .bind(&schema.description)
    .bind(prompt)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for (position, question) in schema.questions.iter().enumerate() {
        let question_id = sqlx::query(
            r#"
            INSERT INTO questions (survey_id, text, question_type, required, position)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(survey_id)
        .bind(&question.text)
        .bind(question.question_type.as_str())
        .bind(question.required)
        .bind(position as i64)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for (option_position, option) in question.option_texts().into_iter().enumerate() {
            sqlx::query("INSERT INTO options (question_id, text, position) VALUES (?, ?, ?)")
                .bind(question_id)
                .bind(option)
                .bind(option_position as i64)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;

    info!(
        "Created survey '{}' ({}) with {} questions",
        schema.title,
        public_id,
        schema.questions.len()
    );

    Ok(CreatedSurvey {
        id: survey_id,
        public_id,
        title: schema.title,
        description: schema.description,
        question_count: schema.questions.len() as i64,
    })
}

/// All surveys, newest first
pub async fn list(pool: &SqlitePool) -> Result<Vec<SurveyListItem>> {
    let surveys = sqlx::query_as::<_, SurveyListItem>(
        r#"
        SELECT id, title, description, created_at, public_id, response_count
        FROM surveys
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(surveys)
}

/// Survey row by public id
pub async fn find_by_public_id(pool: &SqlitePool, public_id: &str) -> Result<SurveyRow> {
    sqlx::query_as::<_, SurveyRow>("SELECT * FROM surveys WHERE public_id = ?")
        .bind(public_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::survey_not_found(public_id))
}

/// Questions of a survey in display order
pub async fn load_questions(pool: &SqlitePool, survey_id: i64) -> Result<Vec<QuestionRow>> {
    let questions = sqlx::query_as::<_, QuestionRow>(
        "SELECT * FROM questions WHERE survey_id = ? ORDER BY position, id",
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

/// Options of every question in a survey, grouped by question id
pub async fn load_options(pool: &SqlitePool, survey_id: i64) -> Result<HashMap<i64, Vec<OptionRow>>> {
    let rows = sqlx::query_as::<_, OptionRow>(
        r#"
        SELECT o.id, o.question_id, o.text, o.position
        FROM options o
        JOIN questions q ON o.question_id = q.id
        WHERE q.survey_id = ?
        ORDER BY o.question_id, o.position, o.id
        "#,
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<i64, Vec<OptionRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.question_id).or_default().push(row);
    }
    Ok(grouped)
}

pub async fn get_detail(pool: &SqlitePool, public_id: &str) -> Result<SurveyDetail> {
    let survey = find_by_public_id(pool, public_id).await?;
    let questions = load_questions(pool, survey.id).await?;
    let mut options = load_options(pool, survey.id).await?;

    let questions = questions
        .into_iter()
        .map(|q| {
            let question_type: QuestionType = q.question_type.parse()?;
            let options = options
                .remove(&q.id)
                .unwrap_or_default()
                .into_iter()
                .map(|o| OptionDetail {
                    id: o.id,
                    text: o.text,
                    order: o.position,
                })
                .collect();
            Ok(QuestionDetail {
                id: q.id,
                text: q.text,
                question_type,
                required: q.required,
                order: q.position,
                options,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SurveyDetail {
        id: survey.id,
        public_id: survey.public_id,
        title: survey.title,
        description: survey.description,
        prompt: survey.prompt,
        created_at: survey.created_at,
        updated_at: survey.updated_at,
        response_count: survey.response_count,
        schema: SurveyStructure { questions },
    })
}

/// Delete a survey and everything attached to it; `false` if unknown
pub async fn delete(pool: &SqlitePool, public_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM surveys WHERE public_id = ?")
        .bind(public_id)
        .execute(pool)
        .await?;

    let deleted = result.rows_affected() > 0;
    if deleted {
        info!("Deleted survey {}", public_id);
    }
    Ok(deleted)
}

/// Public id of the most recent survey that has responses
pub async fn latest_with_responses(pool: &SqlitePool) -> Result<Option<String>> {
    let public_id = sqlx::query_scalar(
        "SELECT public_id FROM surveys WHERE response_count > 0 ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(public_id)
}
