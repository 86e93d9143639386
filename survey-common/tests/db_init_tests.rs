//! Integration tests for database initialization
//!
//! Tests cover:
//! - Automatic database file creation
//! - Idempotent schema creation on reopen
//! - Default settings seeding and NULL reset
//! - Cascading deletes from surveys

use survey_common::db::{self, get_setting, set_setting};
use tempfile::TempDir;

async fn table_names(pool: &sqlx::SqlitePool) -> Vec<String> {
    sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_init_creates_database_file_and_tables() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("surveys.db");

    let pool = db::init_database(&db_path).await.unwrap();
    assert!(db_path.exists());

    let tables = table_names(&pool).await;
    for expected in [
        "answer_options",
        "answers",
        "options",
        "questions",
        "responses",
        "settings",
        "surveys",
    ] {
        assert!(tables.contains(&expected.to_string()), "missing table {}", expected);
    }
}

#[tokio::test]
async fn test_reopen_is_idempotent_and_keeps_settings() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("surveys.db");

    let pool = db::init_database(&db_path).await.unwrap();
    set_setting(&pool, "openai_model", "gpt-4o-mini").await.unwrap();
    pool.close().await;

    let pool = db::init_database(&db_path).await.unwrap();
    assert_eq!(
        get_setting(&pool, "openai_model").await.unwrap().as_deref(),
        Some("gpt-4o-mini")
    );
}

#[tokio::test]
async fn test_default_settings_seeded() {
    let pool = db::init_memory_database().await.unwrap();

    assert_eq!(
        get_setting(&pool, "report_include_charts").await.unwrap().as_deref(),
        Some("true")
    );
    assert_eq!(
        get_setting(&pool, "generation_default_questions").await.unwrap().as_deref(),
        Some("5")
    );
    assert_eq!(get_setting(&pool, "missing_key").await.unwrap(), None);
}

#[tokio::test]
async fn test_null_setting_reset_to_default() {
    let pool = db::init_memory_database().await.unwrap();
    sqlx::query("UPDATE settings SET value = NULL WHERE key = 'report_include_charts'")
        .execute(&pool)
        .await
        .unwrap();
    assert_eq!(get_setting(&pool, "report_include_charts").await.unwrap(), None);

    db::settings::ensure_setting(&pool, "report_include_charts", "true")
        .await
        .unwrap();

    assert_eq!(
        get_setting(&pool, "report_include_charts").await.unwrap().as_deref(),
        Some("true")
    );
}

#[tokio::test]
async fn test_survey_delete_cascades() {
    let pool = db::init_memory_database().await.unwrap();
    let now = chrono::Utc::now();

    let survey_id = sqlx::query(
        "INSERT INTO surveys (public_id, title, prompt, created_at, updated_at) VALUES ('abcdEFGH', 'T', '', ?, ?)",
    )
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await
    .unwrap()
    .last_insert_rowid();

    let question_id = sqlx::query(
        "INSERT INTO questions (survey_id, text, question_type, position) VALUES (?, 'Q', 'radio', 0)",
    )
    .bind(survey_id)
    .execute(&pool)
    .await
    .unwrap()
    .last_insert_rowid();

    sqlx::query("INSERT INTO options (question_id, text, position) VALUES (?, 'A', 0)")
        .bind(question_id)
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("DELETE FROM surveys WHERE id = ?")
        .bind(survey_id)
        .execute(&pool)
        .await
        .unwrap();

    let questions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(&pool)
        .await
        .unwrap();
    let options: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM options")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(questions, 0);
    assert_eq!(options, 0);
}

#[tokio::test]
async fn test_question_type_check_constraint() {
    let pool = db::init_memory_database().await.unwrap();
    let now = chrono::Utc::now();
    let survey_id = sqlx::query(
        "INSERT INTO surveys (public_id, title, prompt, created_at, updated_at) VALUES ('zzzzzzzz', 'T', '', ?, ?)",
    )
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await
    .unwrap()
    .last_insert_rowid();

    let result = sqlx::query(
        "INSERT INTO questions (survey_id, text, question_type, position) VALUES (?, 'Q', 'slider', 0)",
    )
    .bind(survey_id)
    .execute(&pool)
    .await;

    assert!(result.is_err(), "unknown question types must be rejected");
}
