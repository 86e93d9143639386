//! Shared error type for the survey crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of storage, configuration and survey validation
///
/// `NotFound` and `InvalidInput` are caller errors and map to 404/400 at
/// the HTTP layer; the rest are server-side.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Survey schema or submitted answers break a survey rule
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// No survey with this public id
    pub fn survey_not_found(public_id: &str) -> Self {
        Error::NotFound(format!("Survey {}", public_id))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_survey_not_found_message() {
        let err = Error::survey_not_found("AbCd1234");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: Survey AbCd1234");
    }
}
