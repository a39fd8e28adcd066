//! Conversation Director
//!
//! Decides whether a follow-up question is worth asking. It is an
//! evaluator/optimizer pair:
//! - the evaluator (`assess_conversation_completeness`) says whether the
//!   conversation still lacks something worth probing
//! - the optimizer (`generate_follow_up_question`) proposes one question
//!
//! A follow-up only fires when both agree: the evaluator wants to continue
//! AND the candidate is high priority AND no later baseline question already
//! covers it.

use crate::error::GatewayResult;
use crate::gateway::{call_json, TextGateway};
use crate::types::*;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

pub const ASSESSMENT_PROMPT: &str = "You evaluate how complete a strategy discovery conversation is. \
Respond with a single JSON object and no other text.";

pub const GAPS_PROMPT: &str = "You identify information gaps in a strategy discovery conversation. \
Respond with a single JSON object and no other text.";

pub const FOLLOW_UP_PROMPT: &str = "You write at most one sharp follow-up question for a strategy discovery interview. \
Respond with a single JSON object and no other text.";

/// Strategic areas the gap detector checks
pub const STRATEGIC_CATEGORIES: [&str; 7] = [
    "market validation",
    "competitive differentiation",
    "business model clarity",
    "financial constraints",
    "implementation readiness",
    "risk factors",
    "success metrics",
];

/// Baseline index from which the director may be consulted (the 3rd question)
pub const FIRST_FOLLOW_UP_INDEX: usize = 2;

/// Baseline responses that must exist before the director is consulted
pub const MIN_BASELINE_RESPONSES: usize = 2;

/// Word-overlap ratio at which a candidate counts as already covered
const OVERLAP_THRESHOLD: f64 = 0.5;

#[derive(Debug, Deserialize)]
struct GapsReply {
    #[serde(default)]
    gaps: Vec<String>,
}

pub struct ConversationDirector<'a> {
    gateway: &'a dyn TextGateway,
    context: ConversationContext,
}

impl<'a> ConversationDirector<'a> {
    pub fn new(gateway: &'a dyn TextGateway, context: ConversationContext) -> Self {
        Self { gateway, context }
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    /// Evaluator. Falls back to a neutral assessment that does not continue.
    pub async fn assess_conversation_completeness(&self) -> ConversationAssessment {
        match self.try_assess().await {
            Ok(assessment) => assessment,
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "assessment failed, using neutral assessment");
                ConversationAssessment::neutral()
            }
        }
    }

    async fn try_assess(&self) -> GatewayResult<ConversationAssessment> {
        let prompt = format!(
            r#"Assess this strategy discovery conversation.

## Conversation
{history}

## Current Read
Sophistication: {sophistication}
Strategic clarity: {clarity}/100
Urgency: {urgency}/100
Known gaps: {gaps}

## Instructions
Respond with:
{{
  "completenessScore": 0-100,
  "strategicReadiness": 0-100,
  "shouldContinue": true | false,
  "missingElements": ["..."],
  "recommendedQuestions": []
}}"#,
            history = summarize_history(&self.context.conversation_history, 10),
            sophistication = self.context.sophistication_level.name(),
            clarity = self.context.strategic_clarity,
            urgency = self.context.urgency_level,
            gaps = join_or_none(&self.context.information_gaps),
        );

        let mut assessment: ConversationAssessment =
            call_json(self.gateway, ASSESSMENT_PROMPT, &prompt).await?;
        assessment.completeness_score = assessment.completeness_score.clamp(0.0, 100.0);
        assessment.strategic_readiness = assessment.strategic_readiness.clamp(0.0, 100.0);
        Ok(assessment)
    }

    /// Gap labels across the fixed strategic categories. Empty on failure.
    pub async fn identify_information_gaps(&self) -> Vec<String> {
        match self.try_identify_gaps().await {
            Ok(gaps) => gaps,
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "gap detection failed");
                Vec::new()
            }
        }
    }

    async fn try_identify_gaps(&self) -> GatewayResult<Vec<String>> {
        let prompt = format!(
            r#"Review this conversation and list the strategic areas that are still unclear.

## Conversation
{history}

## Areas To Check
{categories}

Respond with: {{"gaps": ["area", ...]}}"#,
            history = summarize_history(&self.context.conversation_history, 10),
            categories = STRATEGIC_CATEGORIES
                .iter()
                .map(|c| format!("- {}", c))
                .collect::<Vec<_>>()
                .join("\n"),
        );

        let reply: GapsReply = call_json(self.gateway, GAPS_PROMPT, &prompt).await?;
        Ok(reply
            .gaps
            .into_iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect())
    }

    /// Optimizer. Only a high-priority candidate not covered by an upcoming
    /// baseline question survives.
    pub async fn generate_follow_up_question(
        &self,
        last_response: &UserResponse,
    ) -> Option<FollowUpQuestion> {
        let candidate = match self.try_generate(last_response).await {
            Ok(candidate) => candidate?,
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "follow-up generation failed");
                return None;
            }
        };

        if candidate.priority != FollowUpPriority::High {
            debug!(priority = ?candidate.priority, "discarding non-high-priority follow-up");
            return None;
        }

        let upcoming = self.context.upcoming_questions.as_deref().unwrap_or(&[]);
        if overlaps_upcoming(&candidate.question, upcoming) {
            debug!(question = %candidate.question, "follow-up already covered by a baseline question");
            return None;
        }

        Some(candidate)
    }

    async fn try_generate(
        &self,
        last_response: &UserResponse,
    ) -> GatewayResult<Option<FollowUpQuestion>> {
        let upcoming = self.context.upcoming_questions.clone().unwrap_or_default();
        let prompt = format!(
            r#"Decide whether the latest answer deserves one follow-up question.

## Latest Exchange
Q: {question}
A: {answer}

## Conversation So Far
{history}

## Information Gaps
{gaps}

## Questions We Will Ask Anyway
{upcoming}

## Instructions
Only propose a question that closes a real gap and is not covered above.
Respond with either {{"question": null}} or:
{{
  "question": "...",
  "reasoning": "...",
  "priority": "high | medium | low",
  "category": "strategic | tactical | clarification",
  "expectedInsight": "..."
}}"#,
            question = last_response.question,
            answer = last_response.answer,
            history = summarize_history(&self.context.conversation_history, 6),
            gaps = join_or_none(&self.context.information_gaps),
            upcoming = join_or_none(&upcoming),
        );

        let reply: serde_json::Value = call_json(self.gateway, FOLLOW_UP_PROMPT, &prompt).await?;
        let has_question = reply
            .get("question")
            .and_then(|q| q.as_str())
            .map(|q| !q.trim().is_empty())
            .unwrap_or(false);
        if !has_question {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(reply)?))
    }

    /// Full evaluator/optimizer pass: refresh gaps, assess, then generate.
    pub async fn recommend_follow_up(self, last_response: &UserResponse) -> Option<FollowUpQuestion> {
        let gaps = self.identify_information_gaps().await;
        let Self { gateway, context } = self;
        let director = Self {
            gateway,
            context: context.with_gaps(gaps),
        };

        let assessment = director.assess_conversation_completeness().await;
        if !assessment.should_continue {
            debug!(
                completeness = assessment.completeness_score,
                "evaluator sees no need to dig further"
            );
            return None;
        }

        let follow_up = director.generate_follow_up_question(last_response).await;
        if let Some(question) = &follow_up {
            info!(category = ?question.category, "asking follow-up question");
        }
        follow_up
    }
}

/// Gate: at least two baseline responses recorded, and the baseline question
/// just answered is the third or later.
pub fn should_consult(baseline_responses: usize, answered_base_index: usize) -> bool {
    baseline_responses >= MIN_BASELINE_RESPONSES && answered_base_index >= FIRST_FOLLOW_UP_INDEX
}

/// Whether a candidate repeats something a later baseline question will ask
pub fn overlaps_upcoming(candidate: &str, upcoming: &[String]) -> bool {
    let candidate_norm = normalize(candidate);
    let candidate_all: HashSet<&str> = candidate_norm.split_whitespace().collect();
    let candidate_words = significant_words(candidate);

    upcoming.iter().any(|question| {
        // Containment is checked on whole words, never substrings
        let question_norm = normalize(question);
        let question_all: HashSet<&str> = question_norm.split_whitespace().collect();
        if !candidate_all.is_empty()
            && !question_all.is_empty()
            && (candidate_all.is_subset(&question_all) || question_all.is_subset(&candidate_all))
        {
            return true;
        }

        let words = significant_words(question);
        let union = candidate_words.union(&words).count();
        if union == 0 {
            return false;
        }
        let intersection = candidate_words.intersection(&words).count();
        intersection as f64 / union as f64 >= OVERLAP_THRESHOLD
    })
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn significant_words(text: &str) -> HashSet<String> {
    const STOP_WORDS: [&str; 12] = [
        "what", "your", "with", "that", "this", "have", "does", "from", "about", "would", "there",
        "like",
    ];
    normalize(text)
        .split_whitespace()
        .filter(|w| w.len() > 3 && !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

/// Render the last `last_n` turns as a Q/A transcript
pub fn summarize_history(history: &[UserResponse], last_n: usize) -> String {
    if history.is_empty() {
        return "(no answers yet)".to_string();
    }
    let skip = history.len().saturating_sub(last_n);
    history[skip..]
        .iter()
        .map(|r| {
            let marker = if r.is_follow_up { " (follow-up)" } else { "" };
            format!("Q{}: {}\nA: {}", marker, r.question, r.answer)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join("; ")
    }
}
