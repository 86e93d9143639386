//! Language-model configuration resolution
//!
//! API key priority: database setting → `OPENAI_API_KEY` → TOML `[openai]`.
//! Model priority: `OPENAI_DEFAULT_MODEL` → database setting → TOML → default.
//! Base URL priority: `OPENAI_BASE_URL` → TOML → default.

use sqlx::SqlitePool;
use survey_common::config::TomlConfig;
use survey_common::db::get_setting;
use survey_common::Result;
use tracing::{info, warn};

pub const API_KEY_SETTING: &str = "openai_api_key";
pub const MODEL_SETTING: &str = "openai_model";

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const MODEL_ENV: &str = "OPENAI_DEFAULT_MODEL";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

pub const DEFAULT_MODEL: &str = "gpt-4-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Resolved connection settings for the completion API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiSettings {
    /// `None` disables generation until a key is configured
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Non-empty after trimming
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn valid(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| is_valid_key(v))
}

fn env_value(name: &str) -> Option<String> {
    valid(std::env::var(name).ok())
}

/// Resolve API key, model and base URL from database, environment and TOML
pub async fn resolve_openai_settings(db: &SqlitePool, toml: &TomlConfig) -> Result<OpenAiSettings> {
    let db_key = valid(get_setting(db, API_KEY_SETTING).await?);
    let env_key = env_value(API_KEY_ENV);
    let toml_key = valid(toml.openai.api_key.clone());

    let sources: Vec<&str> = [
        (db_key.is_some(), "database"),
        (env_key.is_some(), "environment"),
        (toml_key.is_some(), "TOML"),
    ]
    .iter()
    .filter(|(present, _)| *present)
    .map(|(_, name)| *name)
    .collect();

    if sources.len() > 1 {
        warn!(
            "OpenAI API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    let api_key = db_key.or(env_key).or(toml_key);
    match sources.first() {
        Some(source) => info!("OpenAI API key loaded from {}", source),
        None => warn!(
            "OpenAI API key not configured; survey generation is disabled. \
             Set {} or POST /api/settings/{}",
            API_KEY_ENV, API_KEY_SETTING
        ),
    }

    let model = match env_value(MODEL_ENV) {
        Some(model) => model,
        None => valid(get_setting(db, MODEL_SETTING).await?)
            .or_else(|| valid(toml.openai.model.clone()))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
    };

    let base_url = env_value(BASE_URL_ENV)
        .or_else(|| valid(toml.openai.base_url.clone()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    info!("OpenAI model: {}, endpoint: {}", model, base_url);

    Ok(OpenAiSettings {
        api_key,
        model,
        base_url,
    })
}
