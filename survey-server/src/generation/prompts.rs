//! Prompt construction

use survey_common::SurveySchema;

/// Survey flavour guiding question selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyTemplate {
    General,
    CustomerSatisfaction,
    MarketResearch,
    EmployeeEvaluation,
}

impl SurveyTemplate {
    /// Look up a template by name; unknown names fall back to `General`
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "customer_satisfaction" => SurveyTemplate::CustomerSatisfaction,
            "market_research" => SurveyTemplate::MarketResearch,
            "employee_evaluation" => SurveyTemplate::EmployeeEvaluation,
            _ => SurveyTemplate::General,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SurveyTemplate::General => "general",
            SurveyTemplate::CustomerSatisfaction => "customer_satisfaction",
            SurveyTemplate::MarketResearch => "market_research",
            SurveyTemplate::EmployeeEvaluation => "employee_evaluation",
        }
    }

    pub fn instructions(&self) -> &'static str {
        match self {
            SurveyTemplate::General => {
                "Create a survey on the given topic.\n\
                 Mix question types (text, single choice, multiple choice, dropdown).\n\
                 Keep every question clear and specific."
            }
            SurveyTemplate::CustomerSatisfaction => {
                "Create a customer satisfaction survey covering:\n\
                 - overall satisfaction with the product or service\n\
                 - the customer service experience\n\
                 - value for money\n\
                 - likelihood to recommend\n\
                 - areas for improvement\n\
                 Use a 1-5 scale for rating questions."
            }
            SurveyTemplate::MarketResearch => {
                "Create a market research survey on the given topic covering:\n\
                 - respondent demographics\n\
                 - purchasing habits\n\
                 - product or service preferences\n\
                 - factors driving purchase decisions\n\
                 - awareness of competing brands"
            }
            SurveyTemplate::EmployeeEvaluation => {
                "Create an employee evaluation survey covering:\n\
                 - professional skills\n\
                 - teamwork\n\
                 - communication\n\
                 - timeliness\n\
                 - initiative and creativity\n\
                 - areas for development"
            }
        }
    }
}

/// System prompt for generating a whole survey
pub fn survey_system_prompt(template: &str, num_questions: u32, language: &str) -> String {
    let template = SurveyTemplate::from_name(template);
    format!(
        r#"You are an assistant that designs surveys.

{instructions}

Generate exactly {num_questions} questions suited to the survey topic.
Give choice questions (radio, checkbox, dropdown) between 3 and 7 sensible options.
Write the survey in the language with code "{language}".

Reply with a JSON object of this shape:
{{
    "title": "Survey title",
    "description": "Survey description",
    "questions": [
        {{
            "text": "Question text",
            "type": "text|radio|checkbox|dropdown",
            "required": true,
            "options": [{{"text": "Option 1"}}, {{"text": "Option 2"}}]
        }}
    ]
}}

Rules:
1. radio, checkbox and dropdown questions must have options
2. text questions have no options
3. every question has text, type and required"#,
        instructions = template.instructions(),
        num_questions = num_questions,
        language = language,
    )
}

/// User message for survey generation
pub fn survey_user_prompt(topic: &str) -> String {
    format!("Create a survey about: {}", topic)
}

/// System prompt asking for a replacement of one question
///
/// `index` must be in range for `survey.questions`.
pub fn question_regeneration_prompt(
    survey: &SurveySchema,
    index: usize,
    feedback: Option<&str>,
) -> String {
    let others: Vec<String> = survey
        .questions
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(i, q)| {
            let mut line = format!("Question {}: {} (Type: {})", i + 1, q.text, q.question_type);
            let options = q.option_texts();
            if !options.is_empty() {
                line.push_str("\nOptions:");
                for option in options {
                    line.push_str("\n- ");
                    line.push_str(option);
                }
            }
            line
        })
        .collect();

    let target = &survey.questions[index];
    let feedback = feedback
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or("This question needs improvement");

    format!(
        r#"You are rewriting one question of a survey titled "{title}".
Survey description: {description}

The other questions in the survey are:
{others}

Rewrite question {number}. Its current version is:
"{text}" (Type: {kind})

User feedback on this question: "{feedback}"

The new question must:
1. fit the rest of the survey
2. address the feedback
3. keep the type {kind}
4. include options when the type is a choice type

Reply with a JSON object of this shape:
{{
    "text": "New question text",
    "type": "{kind}",
    "required": {required},
    "options": [{{"text": "Option 1"}}, {{"text": "Option 2"}}]
}}"#,
        title = survey.title,
        description = survey.description.as_deref().unwrap_or("Not provided"),
        others = others.join("\n"),
        number = index + 1,
        text = target.text,
        kind = target.question_type,
        feedback = feedback,
        required = target.required,
    )
}

/// System prompt extracting generation parameters from a free-form request
pub const FREE_TEXT_ANALYSIS_PROMPT: &str = r#"Read the user's description of a survey they want and extract the parameters needed to generate it.

Reply with a JSON object with these fields:
- prompt: the main survey topic, condensed from the description
- num_questions: number of questions (integer)
- template: one of general, customer_satisfaction, market_research, employee_evaluation
- language: language code such as "en" or "pl"

Use 5 questions when no number is given.
Pick the closest template when none is named.
Use "en" when no language is given.

Example:
{
    "prompt": "Healthy diet and eating habits",
    "num_questions": 4,
    "template": "general",
    "language": "en"
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use survey_common::{OptionSchema, QuestionSchema, QuestionType};

    #[test]
    fn test_unknown_template_falls_back_to_general() {
        assert_eq!(SurveyTemplate::from_name("poll"), SurveyTemplate::General);
        assert_eq!(
            SurveyTemplate::from_name("Market_Research"),
            SurveyTemplate::MarketResearch
        );
    }

    #[test]
    fn test_system_prompt_mentions_parameters() {
        let prompt = survey_system_prompt("employee_evaluation", 7, "pl");
        assert!(prompt.contains("exactly 7 questions"));
        assert!(prompt.contains("\"pl\""));
        assert!(prompt.contains("teamwork"));
    }

    #[test]
    fn test_regeneration_prompt_lists_other_questions() {
        let survey = SurveySchema {
            title: "Gym".to_string(),
            description: None,
            questions: vec![
                QuestionSchema {
                    text: "How often do you train?".to_string(),
                    question_type: QuestionType::Radio,
                    required: true,
                    options: Some(vec![
                        OptionSchema { text: "Daily".to_string() },
                        OptionSchema { text: "Weekly".to_string() },
                    ]),
                },
                QuestionSchema {
                    text: "Anything else?".to_string(),
                    question_type: QuestionType::Text,
                    required: false,
                    options: None,
                },
            ],
        };

        let prompt = question_regeneration_prompt(&survey, 1, None);
        assert!(prompt.contains("Question 1: How often do you train? (Type: radio)\nOptions:\n- Daily\n- Weekly"));
        assert!(!prompt.contains("Question 2:"));
        assert!(prompt.contains("Rewrite question 2."));
        assert!(prompt.contains("This question needs improvement"));
        assert!(prompt.contains("\"required\": false"));
        assert!(prompt.contains("Survey description: Not provided"));
    }
}
