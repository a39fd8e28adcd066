//! Question Sequencer: the fixed, ordered baseline interview
//!
//! Baseline questions are asked regardless of content. Follow-ups are
//! inserted between them by the director but never move the baseline index.

use crate::types::ProfileField;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Text,
    Textarea,
    Buttons,
}

/// One entry of the baseline question configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineQuestion {
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub optional: bool,
    /// Profile field this question primarily feeds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_field: Option<ProfileField>,
}

impl BaselineQuestion {
    fn new(question: &str, question_type: QuestionType, profile_field: ProfileField) -> Self {
        Self {
            question: question.to_string(),
            question_type,
            placeholder: None,
            options: None,
            optional: false,
            profile_field: Some(profile_field),
        }
    }

    fn placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    fn options(mut self, options: &[&str]) -> Self {
        self.options = Some(options.iter().map(|o| o.to_string()).collect());
        self
    }

    fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// The built-in eight-question interview
pub fn default_questions() -> Vec<BaselineQuestion> {
    use ProfileField::*;
    use QuestionType::*;

    vec![
        BaselineQuestion::new("What's your name?", Text, Name).placeholder("Your name"),
        BaselineQuestion::new(
            "Tell me about the project or business you're working on.",
            Textarea,
            ProjectDescription,
        )
        .placeholder("What are you building, and for whom?"),
        BaselineQuestion::new(
            "Who is your target audience or ideal customer?",
            Textarea,
            TargetAudience,
        ),
        BaselineQuestion::new(
            "What's the core problem you're trying to solve?",
            Textarea,
            CoreProblem,
        )
        .placeholder("The pain your customers feel today"),
        BaselineQuestion::new(
            "What does success look like twelve months from now?",
            Textarea,
            SuccessVision,
        ),
        BaselineQuestion::new("What's your timeline for getting started?", Buttons, Timeline)
            .options(&["ASAP", "1-3 months", "3-6 months", "6+ months"]),
        BaselineQuestion::new("What budget range are you working with?", Buttons, Budget)
            .options(&["Under $10k", "$10k-$50k", "$50k-$150k", "$150k+", "Not sure yet"]),
        BaselineQuestion::new(
            "Is there anything else we should know?",
            Textarea,
            AdditionalContext,
        )
        .optional(),
    ]
}

/// Ordered baseline questions plus index bookkeeping
#[derive(Debug, Clone)]
pub struct QuestionSequencer {
    questions: Vec<BaselineQuestion>,
}

impl Default for QuestionSequencer {
    fn default() -> Self {
        Self {
            questions: default_questions(),
        }
    }
}

impl QuestionSequencer {
    pub fn new(questions: Vec<BaselineQuestion>) -> Result<Self> {
        if questions.is_empty() {
            bail!("baseline question list is empty");
        }
        if let Some(blank) = questions.iter().position(|q| q.question.trim().is_empty()) {
            bail!("baseline question {} has no text", blank);
        }
        Ok(Self { questions })
    }

    /// Parse a JSON array of `{question, type, placeholder?, options?, optional?}`
    pub fn from_json(json: &str) -> Result<Self> {
        let questions: Vec<BaselineQuestion> =
            serde_json::from_str(json).context("Invalid baseline question configuration")?;
        Self::new(questions)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read questions from {:?}", path))?;
        Self::from_json(&json)
    }

    pub fn questions(&self) -> &[BaselineQuestion] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current_base_question(&self, index: usize) -> Option<&BaselineQuestion> {
        self.questions.get(index)
    }

    pub fn is_last_base_question(&self, index: usize) -> bool {
        index + 1 == self.questions.len()
    }

    /// Baseline questions still to come after `index`
    pub fn remaining_questions(&self, index: usize) -> Vec<String> {
        self.questions
            .iter()
            .skip(index + 1)
            .map(|q| q.question.clone())
            .collect()
    }

    /// The only way the baseline index moves forward
    pub fn advance(&self, index: usize) -> usize {
        (index + 1).min(self.questions.len())
    }

    pub fn is_exhausted(&self, index: usize) -> bool {
        index >= self.questions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_interview_shape() {
        let seq = QuestionSequencer::default();
        assert_eq!(seq.len(), 8);
        assert_eq!(
            seq.current_base_question(3).and_then(|q| q.profile_field),
            Some(ProfileField::CoreProblem)
        );
        assert!(seq.is_last_base_question(7));
        assert!(!seq.is_last_base_question(6));
        assert!(seq.questions()[7].optional);
    }

    #[test]
    fn test_remaining_questions_excludes_current() {
        let seq = QuestionSequencer::default();
        let remaining = seq.remaining_questions(5);
        assert_eq!(remaining.len(), 2);
        assert!(remaining[0].contains("budget"));
        assert!(seq.remaining_questions(7).is_empty());
    }

    #[test]
    fn test_advance_saturates() {
        let seq = QuestionSequencer::default();
        assert_eq!(seq.advance(0), 1);
        assert_eq!(seq.advance(7), 8);
        assert_eq!(seq.advance(8), 8);
        assert!(seq.is_exhausted(8));
        assert!(seq.current_base_question(8).is_none());
    }

    #[test]
    fn test_from_json() {
        let seq = QuestionSequencer::from_json(
            r#"[
                {"question": "Company name?", "type": "text", "profileField": "name"},
                {"question": "Stage?", "type": "buttons", "options": ["Idea", "Revenue"], "optional": true}
            ]"#,
        )
        .unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.questions()[1].question_type, QuestionType::Buttons);
        assert!(seq.questions()[1].profile_field.is_none());
    }

    #[test]
    fn test_rejects_empty_configuration() {
        assert!(QuestionSequencer::from_json("[]").is_err());
        assert!(QuestionSequencer::from_json(r#"[{"question": " ", "type": "text"}]"#).is_err());
        assert!(QuestionSequencer::from_json(r#"[{"question": "x", "type": "dropdown"}]"#).is_err());
    }
}
