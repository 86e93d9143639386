//! # Survey Studio Common Library
//!
//! Shared code for the survey service crates:
//! - Error type used across crates
//! - Configuration loading and root folder resolution
//! - Database initialization, schema and row models
//! - Survey domain model (question types, generated survey schema)

pub mod config;
pub mod db;
pub mod error;
pub mod model;

pub use error::{Error, Result};
pub use model::{OptionSchema, QuestionSchema, QuestionType, SurveySchema};
