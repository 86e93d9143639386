//! Tests for OpenAI settings resolution
//!
//! Key priority is database, then environment, then TOML. Tests touching
//! the OPENAI_* environment variables run under #[serial].

use serial_test::serial;
use survey_common::config::{OpenAiConfig, TomlConfig};
use survey_common::db::{init_memory_database, set_setting};
use survey_server::config::{
    is_valid_key, resolve_openai_settings, API_KEY_ENV, API_KEY_SETTING, BASE_URL_ENV,
    DEFAULT_BASE_URL, DEFAULT_MODEL, MODEL_ENV, MODEL_SETTING,
};

fn clear_env() {
    std::env::remove_var(API_KEY_ENV);
    std::env::remove_var(MODEL_ENV);
    std::env::remove_var(BASE_URL_ENV);
}

fn toml_with(api_key: Option<&str>, model: Option<&str>, base_url: Option<&str>) -> TomlConfig {
    TomlConfig {
        openai: OpenAiConfig {
            api_key: api_key.map(str::to_string),
            model: model.map(str::to_string),
            base_url: base_url.map(str::to_string),
        },
        ..TomlConfig::default()
    }
}

#[tokio::test]
#[serial]
async fn test_database_key_overrides_env_and_toml() {
    clear_env();
    let pool = init_memory_database().await.unwrap();
    set_setting(&pool, API_KEY_SETTING, "db-key").await.unwrap();
    std::env::set_var(API_KEY_ENV, "env-key");

    let settings = resolve_openai_settings(&pool, &toml_with(Some("toml-key"), None, None))
        .await
        .unwrap();
    assert_eq!(settings.api_key.as_deref(), Some("db-key"));

    clear_env();
}

#[tokio::test]
#[serial]
async fn test_env_key_used_when_database_empty() {
    clear_env();
    let pool = init_memory_database().await.unwrap();
    std::env::set_var(API_KEY_ENV, "env-key");

    let settings = resolve_openai_settings(&pool, &toml_with(Some("toml-key"), None, None))
        .await
        .unwrap();
    assert_eq!(settings.api_key.as_deref(), Some("env-key"));

    clear_env();
}

#[tokio::test]
#[serial]
async fn test_toml_key_is_last_resort() {
    clear_env();
    let pool = init_memory_database().await.unwrap();
    // Whitespace-only values are ignored
    set_setting(&pool, API_KEY_SETTING, "   ").await.unwrap();

    let settings = resolve_openai_settings(&pool, &toml_with(Some(" toml-key "), None, None))
        .await
        .unwrap();
    assert_eq!(settings.api_key.as_deref(), Some("toml-key"));
}

#[tokio::test]
#[serial]
async fn test_no_key_anywhere() {
    clear_env();
    let pool = init_memory_database().await.unwrap();

    let settings = resolve_openai_settings(&pool, &TomlConfig::default())
        .await
        .unwrap();
    assert!(settings.api_key.is_none());
    assert_eq!(settings.model, DEFAULT_MODEL);
    assert_eq!(settings.base_url, DEFAULT_BASE_URL);
}

#[tokio::test]
#[serial]
async fn test_model_priority() {
    clear_env();
    let pool = init_memory_database().await.unwrap();
    let toml = toml_with(None, Some("toml-model"), Some("http://localhost:9999/v1"));

    let settings = resolve_openai_settings(&pool, &toml).await.unwrap();
    assert_eq!(settings.model, "toml-model");
    assert_eq!(settings.base_url, "http://localhost:9999/v1");

    set_setting(&pool, MODEL_SETTING, "db-model").await.unwrap();
    let settings = resolve_openai_settings(&pool, &toml).await.unwrap();
    assert_eq!(settings.model, "db-model");

    std::env::set_var(MODEL_ENV, "env-model");
    let settings = resolve_openai_settings(&pool, &toml).await.unwrap();
    assert_eq!(settings.model, "env-model");

    clear_env();
}

#[test]
fn test_key_validation() {
    assert!(is_valid_key("sk-abc"));
    assert!(!is_valid_key(""));
    assert!(!is_valid_key(" \t\n"));
}
