//! survey-server library interface
//!
//! Exposes the router, state and repositories for the binaries and for
//! integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod generation;
pub mod report_file;

pub use crate::error::{ApiError, ApiResult};

use crate::config::OpenAiSettings;
use crate::generation::{CompletionClient, OpenAiClient, SurveyGenerator};
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Completion API settings; the key may be replaced at runtime
    pub openai: Arc<RwLock<OpenAiSettings>>,
    /// Client used for generation, absent until an API key is known
    pub completion: Arc<RwLock<Option<Arc<dyn CompletionClient>>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    /// Build state, creating an OpenAI client when the settings carry a key
    pub fn new(db: SqlitePool, openai: OpenAiSettings) -> Self {
        let completion = build_client(&openai);
        Self {
            db,
            openai: Arc::new(RwLock::new(openai)),
            completion: Arc::new(RwLock::new(completion)),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Replace the completion client (used by tests and tooling)
    pub fn with_completion_client(self, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            completion: Arc::new(RwLock::new(Some(client))),
            ..self
        }
    }

    /// Generator over the current client; 503 when no key is configured
    pub async fn generator(&self) -> ApiResult<SurveyGenerator> {
        self.completion
            .read()
            .await
            .clone()
            .map(SurveyGenerator::new)
            .ok_or_else(|| {
                ApiError::ServiceUnavailable(
                    "OpenAI API key not configured; survey generation is unavailable".to_string(),
                )
            })
    }

    /// Store a new API key and rebuild the client
    pub async fn update_api_key(&self, api_key: String) {
        let mut settings = self.openai.write().await;
        settings.api_key = Some(api_key);
        *self.completion.write().await = build_client(&settings);
    }

    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

fn build_client(settings: &OpenAiSettings) -> Option<Arc<dyn CompletionClient>> {
    settings.api_key.as_ref()?;
    match OpenAiClient::from_settings(settings) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!("Could not create OpenAI client: {}", e);
            None
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::survey_routes())
        .merge(api::response_routes())
        .merge(api::report_routes())
        .merge(api::generation_routes())
        .merge(api::settings_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
