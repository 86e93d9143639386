//! Survey generation workflows

use super::client::CompletionClient;
use super::prompts::{
    question_regeneration_prompt, survey_system_prompt, survey_user_prompt, SurveyTemplate,
    FREE_TEXT_ANALYSIS_PROMPT,
};
use super::GenerationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use survey_common::{OptionSchema, QuestionSchema, QuestionType, SurveySchema};
use tracing::{debug, info, warn};

pub const MIN_QUESTIONS: u32 = 1;
pub const MAX_QUESTIONS: u32 = 50;
pub const DEFAULT_QUESTIONS: u32 = 5;
pub const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_TOPIC: &str = "Survey";

/// Parameters for generating a survey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyGenerationRequest {
    pub prompt: String,
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default = "default_num_questions")]
    pub num_questions: u32,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_template() -> String {
    SurveyTemplate::General.name().to_string()
}

fn default_num_questions() -> u32 {
    DEFAULT_QUESTIONS
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl SurveyGenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            template: default_template(),
            num_questions: DEFAULT_QUESTIONS,
            language: default_language(),
        }
    }

    /// Known template name, question count in range, non-empty language
    pub fn normalized(mut self) -> Self {
        self.template = SurveyTemplate::from_name(&self.template).name().to_string();
        self.num_questions = self.num_questions.clamp(MIN_QUESTIONS, MAX_QUESTIONS);
        if self.language.trim().is_empty() {
            self.language = default_language();
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyGenerationResponse {
    pub survey: SurveySchema,
    pub prompt: String,
    pub model: String,
}

/// Result of free-text generation: the extracted parameters and the survey
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeTextGeneration {
    pub params: SurveyGenerationRequest,
    pub survey: SurveySchema,
    pub model: String,
}

/// Question shape returned by the regeneration prompt
#[derive(Debug, Deserialize)]
struct RegeneratedQuestion {
    text: String,
    #[serde(rename = "type", default)]
    question_type: Option<QuestionType>,
    #[serde(default)]
    required: Option<bool>,
    #[serde(default)]
    options: Option<Vec<OptionSchema>>,
}

/// Generates and edits surveys through a completion client
#[derive(Clone)]
pub struct SurveyGenerator {
    client: Arc<dyn CompletionClient>,
}

impl SurveyGenerator {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Generate a survey from a topic and parameters
    pub async fn generate(
        &self,
        request: SurveyGenerationRequest,
    ) -> Result<SurveyGenerationResponse, GenerationError> {
        let request = request.normalized();
        info!(
            template = %request.template,
            questions = request.num_questions,
            language = %request.language,
            "Generating survey"
        );

        let system = survey_system_prompt(&request.template, request.num_questions, &request.language);
        let user = survey_user_prompt(&request.prompt);
        let content = self.client.complete_json(&system, Some(&user)).await?;

        let survey = parse_survey(&content)?;
        if survey.questions.len() != request.num_questions as usize {
            debug!(
                requested = request.num_questions,
                received = survey.questions.len(),
                "Model returned a different number of questions"
            );
        }

        Ok(SurveyGenerationResponse {
            survey,
            prompt: request.prompt,
            model: self.client.model().to_string(),
        })
    }

    /// Extract parameters from a free-form description, then generate
    pub async fn generate_from_free_text(
        &self,
        text: &str,
    ) -> Result<FreeTextGeneration, GenerationError> {
        let content = self
            .client
            .complete_json(FREE_TEXT_ANALYSIS_PROMPT, Some(text))
            .await?;
        let params = parse_free_text_params(&content)?;
        debug!(?params, "Free-text parameters extracted");

        let generated = self.generate(params.clone()).await?;
        Ok(FreeTextGeneration {
            params: params.normalized(),
            survey: generated.survey,
            model: generated.model,
        })
    }

    /// Replace one question, leaving the rest of the survey untouched
    pub async fn regenerate_question(
        &self,
        survey: &SurveySchema,
        index: usize,
        feedback: Option<&str>,
    ) -> Result<SurveySchema, GenerationError> {
        if index >= survey.questions.len() {
            return Err(GenerationError::InvalidIndex {
                index,
                len: survey.questions.len(),
            });
        }

        let system = question_regeneration_prompt(survey, index, feedback);
        let content = self.client.complete_json(&system, None).await?;

        let regenerated: RegeneratedQuestion = serde_json::from_str(&content).map_err(|e| {
            GenerationError::SchemaValidation(format!("Invalid JSON response: {}", e))
        })?;

        let original = &survey.questions[index];
        let question_type = regenerated.question_type.unwrap_or(original.question_type);
        if question_type != original.question_type {
            warn!(
                "Regenerated question changed type from {} to {}",
                original.question_type, question_type
            );
        }

        let mut updated = survey.clone();
        updated.questions[index] = QuestionSchema {
            text: regenerated.text,
            question_type,
            required: regenerated.required.unwrap_or(original.required),
            options: regenerated.options,
        };

        updated
            .validate()
            .map_err(|e| GenerationError::SchemaValidation(e.to_string()))?;
        info!(index, "Question regenerated");

        Ok(updated.normalized())
    }
}

/// Parse and validate a survey returned by the model
pub fn parse_survey(content: &str) -> Result<SurveySchema, GenerationError> {
    let survey: SurveySchema = serde_json::from_str(content)
        .map_err(|e| GenerationError::SchemaValidation(format!("Invalid JSON response: {}", e)))?;
    survey
        .validate()
        .map_err(|e| GenerationError::SchemaValidation(e.to_string()))?;
    Ok(survey.normalized())
}

/// Read analysis output leniently; missing or malformed fields use defaults
fn parse_free_text_params(content: &str) -> Result<SurveyGenerationRequest, GenerationError> {
    let value: Value = serde_json::from_str(content).map_err(|e| {
        GenerationError::SchemaValidation(format!("Parameter analysis error: {}", e))
    })?;

    let text_field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let num_questions = match value.get("num_questions") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .map(|n| n.min(u64::from(MAX_QUESTIONS)) as u32)
    .unwrap_or(DEFAULT_QUESTIONS);

    Ok(SurveyGenerationRequest {
        prompt: text_field("prompt").unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
        template: text_field("template").unwrap_or_else(default_template),
        num_questions,
        language: text_field("language").unwrap_or_else(default_language),
    }
    .normalized())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_and_clamp() {
        let request: SurveyGenerationRequest =
            serde_json::from_str(r#"{"prompt": "Coffee", "num_questions": 500}"#).unwrap();
        assert_eq!(request.template, "general");
        assert_eq!(request.language, "en");

        let normalized = request.normalized();
        assert_eq!(normalized.num_questions, MAX_QUESTIONS);

        let zero = SurveyGenerationRequest {
            num_questions: 0,
            template: "unknown".to_string(),
            ..SurveyGenerationRequest::new("x")
        }
        .normalized();
        assert_eq!(zero.num_questions, MIN_QUESTIONS);
        assert_eq!(zero.template, "general");
    }

    #[test]
    fn test_free_text_params_defaults() {
        let params = parse_free_text_params("{}").unwrap();
        assert_eq!(params, SurveyGenerationRequest::new("Survey"));

        let params = parse_free_text_params(
            r#"{"prompt": "Remote work", "num_questions": "8", "template": "market_research", "language": "pl"}"#,
        )
        .unwrap();
        assert_eq!(params.prompt, "Remote work");
        assert_eq!(params.num_questions, 8);
        assert_eq!(params.template, "market_research");
        assert_eq!(params.language, "pl");

        assert!(matches!(
            parse_free_text_params("not json"),
            Err(GenerationError::SchemaValidation(_))
        ));
    }

    #[test]
    fn test_parse_survey_rejects_invalid_structure() {
        let missing_options = r#"{"title": "T", "questions": [{"text": "Q", "type": "radio"}]}"#;
        assert!(matches!(
            parse_survey(missing_options),
            Err(GenerationError::SchemaValidation(_))
        ));

        let bad_type = r#"{"title": "T", "questions": [{"text": "Q", "type": "slider"}]}"#;
        assert!(matches!(
            parse_survey(bad_type),
            Err(GenerationError::SchemaValidation(_))
        ));
    }
}
