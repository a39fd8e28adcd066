//! Response Classifier
//!
//! Sorts one free-text answer into a fixed label set. Classification never
//! fails from the caller's point of view: an unreachable service or an
//! unrecognised reply both come back as `Generic`, so discovery can always
//! proceed.

use crate::director::summarize_history;
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::TextGateway;
use crate::types::ConversationContext;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const SYSTEM_PROMPT: &str = "You classify answers given during a strategy discovery interview. \
Reply with exactly one category label and nothing else.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseCategory {
    BasicInfo,
    TechnicalDetails,
    BusinessStrategy,
    ProblemDefinition,
    VisionGoals,
    OffTopic,
    Generic,
}

impl ResponseCategory {
    pub const ALL: [ResponseCategory; 7] = [
        ResponseCategory::BasicInfo,
        ResponseCategory::TechnicalDetails,
        ResponseCategory::BusinessStrategy,
        ResponseCategory::ProblemDefinition,
        ResponseCategory::VisionGoals,
        ResponseCategory::OffTopic,
        ResponseCategory::Generic,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ResponseCategory::BasicInfo => "basic_info",
            ResponseCategory::TechnicalDetails => "technical_details",
            ResponseCategory::BusinessStrategy => "business_strategy",
            ResponseCategory::ProblemDefinition => "problem_definition",
            ResponseCategory::VisionGoals => "vision_goals",
            ResponseCategory::OffTopic => "off_topic",
            ResponseCategory::Generic => "generic",
        }
    }

    /// Case-insensitive match of a model reply against the label set.
    ///
    /// An exact label wins; otherwise the label mentioned earliest in the
    /// reply is taken.
    pub fn from_label(reply: &str) -> Option<Self> {
        let normalized = reply
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.')
            .to_lowercase();

        if let Some(exact) = Self::ALL.iter().find(|c| c.label() == normalized) {
            return Some(*exact);
        }

        Self::ALL
            .iter()
            .filter_map(|c| normalized.find(c.label()).map(|pos| (pos, *c)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, c)| c)
    }
}

pub struct ResponseClassifier<'a> {
    gateway: &'a dyn TextGateway,
}

impl<'a> ResponseClassifier<'a> {
    pub fn new(gateway: &'a dyn TextGateway) -> Self {
        Self { gateway }
    }

    /// Classify an answer. Any failure degrades to `Generic`.
    pub async fn classify(&self, answer: &str, context: &ConversationContext) -> ResponseCategory {
        match self.try_classify(answer, context).await {
            Ok(category) => {
                debug!(category = category.label(), "classified response");
                category
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "classification failed, using generic");
                ResponseCategory::Generic
            }
        }
    }

    async fn try_classify(
        &self,
        answer: &str,
        context: &ConversationContext,
    ) -> GatewayResult<ResponseCategory> {
        let prompt = build_classification_prompt(answer, context);
        let reply = self.gateway.call(SYSTEM_PROMPT, &prompt).await?;
        ResponseCategory::from_label(&reply).ok_or(GatewayError::ClassificationAmbiguous(reply))
    }
}

fn build_classification_prompt(answer: &str, context: &ConversationContext) -> String {
    format!(
        r#"Classify the latest answer from a strategy interview.

## Recent Conversation
{history}

## Latest Answer
{answer}

## Respondent
Sophistication: {sophistication}

## Categories
- basic_info: names, company or role details
- technical_details: technology, platforms, implementation specifics
- business_strategy: business model, market, positioning, revenue
- problem_definition: the problem, pain points, what is broken today
- vision_goals: goals, ambitions, what success looks like
- off_topic: unrelated to the interview or evasive
- generic: anything that fits none of the above

Reply with ONLY the category label."#,
        history = summarize_history(&context.conversation_history, 3),
        answer = answer,
        sophistication = context.sophistication_level.name(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::ScriptedGateway;

    #[test]
    fn test_label_matching_is_case_insensitive() {
        assert_eq!(
            ResponseCategory::from_label("PROBLEM_DEFINITION"),
            Some(ResponseCategory::ProblemDefinition)
        );
        assert_eq!(
            ResponseCategory::from_label("  \"vision_goals\". "),
            Some(ResponseCategory::VisionGoals)
        );
    }

    #[test]
    fn test_label_found_in_prose() {
        assert_eq!(
            ResponseCategory::from_label("I'd say this is business_strategy, not generic."),
            Some(ResponseCategory::BusinessStrategy)
        );
        assert_eq!(ResponseCategory::from_label("no idea"), None);
    }

    #[tokio::test]
    async fn test_classify_uses_reply() {
        let gateway = ScriptedGateway::new(|_, _| Ok("off_topic".into()));
        let classifier = ResponseClassifier::new(&gateway);
        let category = classifier
            .classify("What's the weather like?", &ConversationContext::default())
            .await;
        assert_eq!(category, ResponseCategory::OffTopic);
        assert_eq!(gateway.calls_to(SYSTEM_PROMPT), 1);
    }

    #[tokio::test]
    async fn test_unmatched_reply_defaults_to_generic() {
        let gateway = ScriptedGateway::new(|_, _| Ok("marketing".into()));
        let classifier = ResponseClassifier::new(&gateway);
        let category = classifier.classify("We sell shoes", &ConversationContext::default()).await;
        assert_eq!(category, ResponseCategory::Generic);
    }

    #[tokio::test]
    async fn test_gateway_failure_defaults_to_generic() {
        let gateway = ScriptedGateway::failing();
        let classifier = ResponseClassifier::new(&gateway);
        let category = classifier.classify("We sell shoes", &ConversationContext::default()).await;
        assert_eq!(category, ResponseCategory::Generic);
    }
}
