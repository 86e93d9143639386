//! Survey domain model
//!
//! `SurveySchema` is the shape exchanged with the language model and with
//! clients saving a generated survey. It carries no database ids.

use crate::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of survey titles and option texts
pub const MAX_TITLE_LEN: usize = 200;

/// Length of the shareable survey identifier
pub const PUBLIC_ID_LEN: usize = 8;

const PUBLIC_ID_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Kind of survey question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// Free text answer
    Text,
    /// Single choice, rendered as radio buttons
    Radio,
    /// Multiple choice
    Checkbox,
    /// Single choice, rendered as a drop-down list
    Dropdown,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Radio => "radio",
            QuestionType::Checkbox => "checkbox",
            QuestionType::Dropdown => "dropdown",
        }
    }

    /// Choice questions must carry options
    pub fn is_choice(&self) -> bool {
        !matches!(self, QuestionType::Text)
    }

    /// Radio and dropdown accept at most one selected option
    pub fn is_single_choice(&self) -> bool {
        matches!(self, QuestionType::Radio | QuestionType::Dropdown)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(QuestionType::Text),
            "radio" => Ok(QuestionType::Radio),
            "checkbox" => Ok(QuestionType::Checkbox),
            "dropdown" => Ok(QuestionType::Dropdown),
            other => Err(Error::InvalidInput(format!("Unknown question type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSchema {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSchema {
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionSchema>>,
}

fn default_required() -> bool {
    true
}

impl QuestionSchema {
    /// Options in order; empty when none were given
    pub fn option_texts(&self) -> Vec<&str> {
        self.options
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|o| o.text.as_str())
            .collect()
    }
}

/// A survey as produced by the language model or submitted for saving
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveySchema {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub questions: Vec<QuestionSchema>,
}

impl SurveySchema {
    /// Check structural invariants before persisting
    pub fn validate(&self) -> Result<()> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("Survey title cannot be empty".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(Error::InvalidInput(format!(
                "Survey title exceeds {} characters",
                MAX_TITLE_LEN
            )));
        }
        if self.questions.is_empty() {
            return Err(Error::InvalidInput(
                "Survey must contain at least one question".to_string(),
            ));
        }

        for (index, question) in self.questions.iter().enumerate() {
            let number = index + 1;
            if question.text.trim().is_empty() {
                return Err(Error::InvalidInput(format!(
                    "Question {} has empty text",
                    number
                )));
            }

            if !question.question_type.is_choice() {
                continue;
            }

            let options = question.options.as_deref().unwrap_or_default();
            if options.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "Question {} ({}) requires options",
                    number, question.question_type
                )));
            }
            for option in options {
                if option.text.trim().is_empty() {
                    return Err(Error::InvalidInput(format!(
                        "Question {} has an empty option",
                        number
                    )));
                }
                if option.text.trim().chars().count() > MAX_TITLE_LEN {
                    return Err(Error::InvalidInput(format!(
                        "Question {} has an option longer than {} characters",
                        number, MAX_TITLE_LEN
                    )));
                }
            }
        }

        Ok(())
    }

    /// Copy with trimmed texts and options removed from text questions
    pub fn normalized(&self) -> SurveySchema {
        SurveySchema {
            title: self.title.trim().to_string(),
            description: self
                .description
                .as_ref()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            questions: self
                .questions
                .iter()
                .map(|q| QuestionSchema {
                    text: q.text.trim().to_string(),
                    question_type: q.question_type,
                    required: q.required,
                    options: if q.question_type.is_choice() {
                        q.options.as_ref().map(|opts| {
                            opts.iter()
                                .map(|o| OptionSchema {
                                    text: o.text.trim().to_string(),
                                })
                                .collect()
                        })
                    } else {
                        None
                    },
                })
                .collect(),
        }
    }
}

/// Random 8-character identifier from the URL-safe base64 alphabet
pub fn generate_public_id() -> String {
    let mut rng = rand::thread_rng();
    (0..PUBLIC_ID_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..PUBLIC_ID_ALPHABET.len());
            PUBLIC_ID_ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice(text: &str, kind: QuestionType, options: &[&str]) -> QuestionSchema {
        QuestionSchema {
            text: text.to_string(),
            question_type: kind,
            required: true,
            options: Some(
                options
                    .iter()
                    .map(|o| OptionSchema { text: o.to_string() })
                    .collect(),
            ),
        }
    }

    fn sample() -> SurveySchema {
        SurveySchema {
            title: "Coffee habits".to_string(),
            description: Some("How we drink coffee".to_string()),
            questions: vec![
                QuestionSchema {
                    text: "What do you like about it?".to_string(),
                    question_type: QuestionType::Text,
                    required: false,
                    options: None,
                },
                choice("Cups per day?", QuestionType::Radio, &["0", "1-2", "3+"]),
            ],
        }
    }

    #[test]
    fn test_question_type_parse_and_display() {
        assert_eq!("Checkbox".parse::<QuestionType>().unwrap(), QuestionType::Checkbox);
        assert_eq!(QuestionType::Dropdown.to_string(), "dropdown");
        assert!("slider".parse::<QuestionType>().is_err());
        assert!(QuestionType::Radio.is_single_choice());
        assert!(!QuestionType::Checkbox.is_single_choice());
        assert!(!QuestionType::Text.is_choice());
    }

    #[test]
    fn test_schema_deserializes_model_output() {
        let json = r#"{
            "title": "Team survey",
            "description": "Quarterly check-in",
            "questions": [
                {"text": "Mood?", "type": "dropdown", "options": [{"text": "Good"}, {"text": "Bad"}]},
                {"text": "Comments", "type": "text", "required": false}
            ]
        }"#;
        let schema: SurveySchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.questions.len(), 2);
        assert!(schema.questions[0].required, "required defaults to true");
        assert_eq!(schema.questions[0].option_texts(), vec!["Good", "Bad"]);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_choice_without_options() {
        let mut schema = sample();
        schema.questions[1].options = Some(vec![]);
        let err = schema.validate().unwrap_err();
        assert!(err.to_string().contains("requires options"));
    }

    #[test]
    fn test_validate_rejects_empty_title_and_no_questions() {
        let mut schema = sample();
        schema.title = "   ".to_string();
        assert!(schema.validate().is_err());

        let mut schema = sample();
        schema.questions.clear();
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_option_length_ignores_padding() {
        let mut schema = sample();
        let padded = format!("   {}   ", "a".repeat(MAX_TITLE_LEN));
        schema.questions[1].options = Some(vec![OptionSchema { text: padded }]);
        assert!(schema.validate().is_ok());

        let long = "a".repeat(MAX_TITLE_LEN + 1);
        schema.questions[1].options = Some(vec![OptionSchema { text: long }]);
        let err = schema.validate().unwrap_err();
        assert!(err.to_string().contains("longer than"));
    }

    #[test]
    fn test_normalized_drops_text_question_options() {
        let mut schema = sample();
        schema.questions[0].options = Some(vec![OptionSchema { text: "stray".to_string() }]);
        schema.description = Some("  ".to_string());
        let normalized = schema.normalized();
        assert!(normalized.questions[0].options.is_none());
        assert!(normalized.description.is_none());
        assert_eq!(normalized.questions[1].option_texts(), vec!["0", "1-2", "3+"]);
    }

    #[test]
    fn test_public_id_shape() {
        let id = generate_public_id();
        assert_eq!(id.len(), PUBLIC_ID_LEN);
        assert!(id.bytes().all(|b| PUBLIC_ID_ALPHABET.contains(&b)));
    }
}
