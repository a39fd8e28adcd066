//! Response Analyzer / Profile Aggregator
//!
//! Two halves:
//! 1. Per-response extraction: one gateway call turns an answer into a
//!    `ResponseInsight` (neutral insight on any failure)
//! 2. Aggregation: exact, deterministic scoring over the full insight set

use crate::error::GatewayResult;
use crate::gateway::{call_json, TextGateway};
use crate::types::*;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

pub const SYSTEM_PROMPT: &str = "You extract structured business intelligence from interview answers. \
Respond with a single JSON object and no other text.";

/// Confidence assigned to the neutral fallback insight
pub const FALLBACK_CONFIDENCE: f64 = 50.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisReply {
    #[serde(default)]
    extracted_entities: ExtractedEntities,
    #[serde(default)]
    strategic_implications: Vec<String>,
    confidence_score: f64,
}

pub struct ResponseAnalyzer<'a> {
    gateway: &'a dyn TextGateway,
}

impl<'a> ResponseAnalyzer<'a> {
    pub fn new(gateway: &'a dyn TextGateway) -> Self {
        Self { gateway }
    }

    /// Analyze one response. Failures yield the neutral fallback insight.
    pub async fn analyze_response(
        &self,
        response: &UserResponse,
        context: &ConversationContext,
    ) -> ResponseInsight {
        match self.try_analyze(response, context).await {
            Ok(insight) => {
                debug!(
                    confidence = insight.confidence_score,
                    implications = insight.strategic_implications.len(),
                    "analyzed response"
                );
                insight
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "analysis failed, using neutral insight");
                fallback_insight(response)
            }
        }
    }

    async fn try_analyze(
        &self,
        response: &UserResponse,
        context: &ConversationContext,
    ) -> GatewayResult<ResponseInsight> {
        let prompt = build_extraction_prompt(response, context);
        let reply: AnalysisReply = call_json(self.gateway, SYSTEM_PROMPT, &prompt).await?;
        Ok(ResponseInsight {
            original_response: response.clone(),
            extracted_entities: reply.extracted_entities,
            strategic_implications: reply
                .strategic_implications
                .into_iter()
                .filter(|s| !s.trim().is_empty())
                .collect(),
            confidence_score: clamp_score(reply.confidence_score),
        })
    }
}

/// Neutral insight: no entities, no implications, confidence 50
pub fn fallback_insight(response: &UserResponse) -> ResponseInsight {
    ResponseInsight {
        original_response: response.clone(),
        extracted_entities: ExtractedEntities::default(),
        strategic_implications: Vec::new(),
        confidence_score: FALLBACK_CONFIDENCE,
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return FALLBACK_CONFIDENCE;
    }
    score.clamp(0.0, 100.0)
}

fn build_extraction_prompt(response: &UserResponse, context: &ConversationContext) -> String {
    format!(
        r#"Analyze this answer from a strategy discovery interview.

## Question
{question}

## Answer
{answer}

## What We Know So Far
Sophistication: {sophistication}
Strategic clarity: {clarity}/100
Urgency: {urgency}/100

## Instructions
Extract what the answer reveals. Respond with this JSON shape:

{{
  "extractedEntities": {{
    "companyName": "string or null",
    "industry": "string or null",
    "businessModel": "string or null",
    "targetMarket": "string or null",
    "keyPainPoints": ["..."],
    "urgencyLevel": "low | medium | high",
    "sophisticationLevel": "beginner | intermediate | advanced",
    "budgetSignals": ["..."],
    "timelineSignals": ["..."]
  }},
  "strategicImplications": ["..."],
  "confidenceScore": 0-100
}}"#,
        question = response.question,
        answer = response.answer,
        sophistication = context.sophistication_level.name(),
        clarity = context.strategic_clarity,
        urgency = context.urgency_level,
    )
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Derived profile metrics over a full insight set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileMetrics {
    pub overall_sophistication: SophisticationLevel,
    pub urgency_score: u8,
    pub strategic_clarity: u8,
    pub implementation_readiness: u8,
}

impl ProfileMetrics {
    pub fn from_insights(insights: &[ResponseInsight]) -> Self {
        Self {
            overall_sophistication: overall_sophistication(insights),
            urgency_score: urgency_score(insights),
            strategic_clarity: strategic_clarity(insights),
            implementation_readiness: implementation_readiness(insights),
        }
    }

    pub fn apply_to(&self, profile: &mut StrategicProfile) {
        profile.overall_sophistication = self.overall_sophistication;
        profile.urgency_score = self.urgency_score;
        profile.strategic_clarity = self.strategic_clarity;
        profile.implementation_readiness = self.implementation_readiness;
    }
}

/// Append an insight and recompute every derived metric
pub fn record_insight(profile: &mut StrategicProfile, insight: ResponseInsight) {
    profile.insights.push(insight);
    ProfileMetrics::from_insights(&profile.insights).apply_to(profile);
}

/// Majority vote; ties and empty sets resolve to intermediate
pub fn overall_sophistication(insights: &[ResponseInsight]) -> SophisticationLevel {
    let mut votes: HashMap<SophisticationLevel, usize> = HashMap::new();
    for level in insights
        .iter()
        .filter_map(|i| i.extracted_entities.sophistication_level)
    {
        *votes.entry(level).or_insert(0) += 1;
    }

    let Some(top) = votes.values().copied().max() else {
        return SophisticationLevel::Intermediate;
    };
    let leaders: Vec<SophisticationLevel> = votes
        .iter()
        .filter(|(_, count)| **count == top)
        .map(|(level, _)| *level)
        .collect();

    match leaders.as_slice() {
        [single] => *single,
        _ => SophisticationLevel::Intermediate,
    }
}

/// Mean of low=25, medium=50, high=85, rounded; 50 when nothing is known
pub fn urgency_score(insights: &[ResponseInsight]) -> u8 {
    let scores: Vec<f64> = insights
        .iter()
        .filter_map(|i| i.extracted_entities.urgency_level)
        .map(|u| u.score())
        .collect();

    if scores.is_empty() {
        return 50;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    to_score(mean)
}

/// min(100, implications * 10 + mean confidence * 0.5), rounded
pub fn strategic_clarity(insights: &[ResponseInsight]) -> u8 {
    let total_implications: usize = insights.iter().map(|i| i.strategic_implications.len()).sum();
    let average_confidence = if insights.is_empty() {
        0.0
    } else {
        insights.iter().map(|i| i.confidence_score).sum::<f64>() / insights.len() as f64
    };

    let clarity = (total_implications as f64 * 10.0 + average_confidence * 0.5).min(100.0);
    to_score(clarity)
}

/// Base 50, bonuses per insight for timeline, budget, sophistication, urgency
pub fn implementation_readiness(insights: &[ResponseInsight]) -> u8 {
    let mut readiness: i32 = 50;
    for insight in insights {
        let entities = &insight.extracted_entities;
        if !entities.timeline_signals.is_empty() {
            readiness += 15;
        }
        if !entities.budget_signals.is_empty() {
            readiness += 15;
        }
        if let Some(level) = entities.sophistication_level {
            readiness += level.readiness_bonus();
        }
        if let Some(level) = entities.urgency_level {
            readiness += level.readiness_bonus();
        }
    }
    readiness.clamp(0, 100) as u8
}

fn to_score(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::ScriptedGateway;

    fn insight(
        urgency: Option<UrgencyLevel>,
        sophistication: Option<SophisticationLevel>,
        implications: usize,
        confidence: f64,
    ) -> ResponseInsight {
        ResponseInsight {
            original_response: UserResponse::baseline("Q", "A", 0),
            extracted_entities: ExtractedEntities {
                urgency_level: urgency,
                sophistication_level: sophistication,
                ..Default::default()
            },
            strategic_implications: (0..implications).map(|i| format!("implication {}", i)).collect(),
            confidence_score: confidence,
        }
    }

    #[test]
    fn test_urgency_mapping() {
        use UrgencyLevel::*;
        let insights = vec![
            insight(Some(High), None, 0, 50.0),
            insight(Some(High), None, 0, 50.0),
            insight(Some(Low), None, 0, 50.0),
        ];
        // round((85 + 85 + 25) / 3) = round(65.0)
        assert_eq!(urgency_score(&insights), 65);
    }

    #[test]
    fn test_urgency_ignores_unknown_and_defaults() {
        assert_eq!(urgency_score(&[]), 50);
        let insights = vec![
            insight(None, None, 0, 50.0),
            insight(Some(UrgencyLevel::Medium), None, 0, 50.0),
            insight(Some(UrgencyLevel::High), None, 0, 50.0),
        ];
        // round(67.5)
        assert_eq!(urgency_score(&insights), 68);
    }

    #[test]
    fn test_strategic_clarity_formula() {
        let insights = vec![insight(None, None, 3, 70.0), insight(None, None, 1, 90.0)];
        // min(100, 4 * 10 + 80 * 0.5)
        assert_eq!(strategic_clarity(&insights), 80);
    }

    #[test]
    fn test_strategic_clarity_caps_at_100() {
        let insights = vec![insight(None, None, 12, 100.0)];
        assert_eq!(strategic_clarity(&insights), 100);
        assert_eq!(strategic_clarity(&[]), 0);
    }

    #[test]
    fn test_sophistication_majority_and_ties() {
        use SophisticationLevel::*;
        let majority = vec![
            insight(None, Some(Advanced), 0, 50.0),
            insight(None, Some(Advanced), 0, 50.0),
            insight(None, Some(Beginner), 0, 50.0),
            insight(None, None, 0, 50.0),
        ];
        assert_eq!(overall_sophistication(&majority), Advanced);

        let tie = vec![
            insight(None, Some(Advanced), 0, 50.0),
            insight(None, Some(Beginner), 0, 50.0),
        ];
        assert_eq!(overall_sophistication(&tie), Intermediate);
        assert_eq!(overall_sophistication(&[]), Intermediate);
    }

    #[test]
    fn test_implementation_readiness() {
        let mut ready = insight(
            Some(UrgencyLevel::High),
            Some(SophisticationLevel::Advanced),
            0,
            50.0,
        );
        ready.extracted_entities.timeline_signals = vec!["launch in Q2".into()];
        ready.extracted_entities.budget_signals = vec!["$40k set aside".into()];
        // 50 + 15 + 15 + 10 + 10
        assert_eq!(implementation_readiness(&[ready.clone()]), 100);

        let modest = insight(
            Some(UrgencyLevel::Medium),
            Some(SophisticationLevel::Intermediate),
            0,
            50.0,
        );
        assert_eq!(implementation_readiness(&[modest]), 60);
        assert_eq!(implementation_readiness(&[ready.clone(), ready]), 100);
        assert_eq!(implementation_readiness(&[]), 50);
    }

    #[test]
    fn test_record_insight_recomputes_metrics() {
        let mut profile = StrategicProfile::default();
        record_insight(
            &mut profile,
            insight(Some(UrgencyLevel::High), Some(SophisticationLevel::Beginner), 2, 60.0),
        );
        assert_eq!(profile.insights.len(), 1);
        assert_eq!(profile.urgency_score, 85);
        assert_eq!(profile.overall_sophistication, SophisticationLevel::Beginner);
        assert_eq!(profile.strategic_clarity, 50);
        assert_eq!(profile.implementation_readiness, 60);
    }

    #[tokio::test]
    async fn test_analyze_parses_and_clamps() {
        let gateway = ScriptedGateway::new(|_, _| {
            Ok(r#"```json
{"extractedEntities": {"companyName": "Acme", "urgencyLevel": "high", "budgetSignals": ["$20k"]},
 "strategicImplications": ["Needs fast validation", ""],
 "confidenceScore": 140}
```"#
                .into())
        });
        let analyzer = ResponseAnalyzer::new(&gateway);
        let response = UserResponse::baseline("Tell me about the project", "Acme, shoes", 1);
        let insight = analyzer
            .analyze_response(&response, &ConversationContext::default())
            .await;

        assert_eq!(insight.extracted_entities.company_name.as_deref(), Some("Acme"));
        assert_eq!(insight.strategic_implications, vec!["Needs fast validation".to_string()]);
        assert_eq!(insight.confidence_score, 100.0);
        assert_eq!(insight.original_response, response);
    }

    #[tokio::test]
    async fn test_analyze_keeps_entities_with_capitalised_levels() {
        let gateway = ScriptedGateway::new(|_, _| {
            Ok(r#"{"extractedEntities": {"companyName": "Acme", "urgencyLevel": "High",
                "sophisticationLevel": "Beginner", "budgetSignals": ["$20k"]},
                "strategicImplications": ["Validate demand"], "confidenceScore": 70}"#
                .into())
        });
        let analyzer = ResponseAnalyzer::new(&gateway);
        let response = UserResponse::baseline("Tell me about the project", "Acme, shoes", 1);
        let insight = analyzer
            .analyze_response(&response, &ConversationContext::default())
            .await;

        assert_eq!(insight.extracted_entities.company_name.as_deref(), Some("Acme"));
        assert_eq!(insight.extracted_entities.urgency_level, Some(UrgencyLevel::High));
        assert_eq!(
            insight.extracted_entities.sophistication_level,
            Some(SophisticationLevel::Beginner)
        );
        assert_eq!(insight.confidence_score, 70.0);
        assert_eq!(insight.strategic_implications, vec!["Validate demand".to_string()]);
    }

    #[tokio::test]
    async fn test_analyze_falls_back_on_garbage() {
        let gateway = ScriptedGateway::new(|_, _| Ok("I cannot help with that".into()));
        let analyzer = ResponseAnalyzer::new(&gateway);
        let response = UserResponse::baseline("Q", "A", 0);
        let insight = analyzer
            .analyze_response(&response, &ConversationContext::default())
            .await;

        assert_eq!(insight, fallback_insight(&response));
        assert_eq!(insight.confidence_score, 50.0);
        assert!(insight.extracted_entities.urgency_level.is_none());
    }
}
