//! Database row models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SurveyRow {
    pub id: i64,
    pub public_id: String,
    pub title: String,
    pub description: Option<String>,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub response_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub survey_id: i64,
    pub text: String,
    /// One of `text`, `radio`, `checkbox`, `dropdown` (CHECK constraint)
    pub question_type: String,
    pub required: bool,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OptionRow {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ResponseRow {
    pub id: i64,
    pub survey_id: i64,
    pub created_at: DateTime<Utc>,
    pub respondent_name: Option<String>,
    pub respondent_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnswerRow {
    pub id: i64,
    pub response_id: i64,
    pub question_id: i64,
    pub text_answer: Option<String>,
}

/// Link between an answer and one selected option
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnswerOptionRow {
    pub answer_id: i64,
    pub option_id: i64,
}
