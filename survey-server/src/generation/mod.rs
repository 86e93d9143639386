//! Survey generation through a chat-completion language model
//!
//! - [`client`]: the completion seam and its OpenAI-compatible implementation
//! - [`prompts`]: system prompts for generation, regeneration, free-text analysis
//! - [`generator`]: request/response types and the generation workflows

pub mod client;
pub mod generator;
pub mod prompts;

pub use client::{CompletionClient, OpenAiClient};
pub use generator::{
    FreeTextGeneration, SurveyGenerationRequest, SurveyGenerationResponse, SurveyGenerator,
};

use thiserror::Error;

/// Errors raised while talking to the model or interpreting its output
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("OpenAI API key not configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the completion API
    #[error("OpenAI API error ({0}): {1}")]
    Api(u16, String),

    #[error("Model returned no content")]
    EmptyResponse,

    /// Model output is not valid JSON or not a valid survey
    #[error("Schema validation error: {0}")]
    SchemaValidation(String),

    #[error("Invalid question index: {index}. Survey has {len} questions.")]
    InvalidIndex { index: usize, len: usize },
}
