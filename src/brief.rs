//! Brief Synthesizer
//!
//! Turns the final strategic profile into a personal message plus ordered
//! narrative sections. One gateway call; when that fails, a deterministic
//! two-section brief is built from the respondent's name and static
//! templates. Without a name there is nothing to fall back to.

use crate::director::summarize_history;
use crate::error::GatewayResult;
use crate::gateway::{call_json, TextGateway};
use crate::types::*;
use thiserror::Error;
use tracing::{info, warn};

pub const SYSTEM_PROMPT: &str = "You are a senior strategist writing a concise strategic brief for a client. \
Respond with a single JSON object and no other text.";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BriefError {
    /// Synthesis failed and the profile has no name to build a fallback around
    #[error("unable to build a brief: the profile has no name")]
    MissingName,
}

pub struct BriefSynthesizer<'a> {
    gateway: &'a dyn TextGateway,
}

impl<'a> BriefSynthesizer<'a> {
    pub fn new(gateway: &'a dyn TextGateway) -> Self {
        Self { gateway }
    }

    pub async fn synthesize(&self, profile: &StrategicProfile) -> Result<StrategicBrief, BriefError> {
        match self.try_synthesize(profile).await {
            Ok(brief) => {
                info!(sections = brief.sections.len(), "brief synthesized");
                Ok(brief)
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "brief synthesis failed, using template brief");
                fallback_brief(profile).ok_or(BriefError::MissingName)
            }
        }
    }

    async fn try_synthesize(&self, profile: &StrategicProfile) -> GatewayResult<StrategicBrief> {
        let prompt = build_brief_prompt(profile);
        let brief: StrategicBrief = call_json(self.gateway, SYSTEM_PROMPT, &prompt).await?;
        if brief.sections.is_empty() {
            return Err(crate::error::GatewayError::malformed("brief has no sections"));
        }
        Ok(brief)
    }
}

fn tone_for(sophistication: SophisticationLevel) -> &'static str {
    match sophistication {
        SophisticationLevel::Beginner => {
            "Plain language, no jargon, explain every recommendation step by step."
        }
        SophisticationLevel::Intermediate => {
            "Practical and direct, light on jargon, focus on the next concrete moves."
        }
        SophisticationLevel::Advanced => {
            "Peer-to-peer and dense: frameworks, trade-offs and metrics are welcome."
        }
    }
}

fn pacing_for(urgency_score: u8) -> &'static str {
    match urgency_score {
        70..=100 => "The client is under time pressure: lead with what to do this month.",
        40..=69 => "Balance quick wins against foundational work.",
        _ => "There is room to be deliberate: favour validation before investment.",
    }
}

fn build_brief_prompt(profile: &StrategicProfile) -> String {
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "not provided".to_string());

    let implications: Vec<String> = profile
        .insights
        .iter()
        .flat_map(|i| i.strategic_implications.iter().cloned())
        .collect();
    let transcript: Vec<UserResponse> = profile
        .insights
        .iter()
        .map(|i| i.original_response.clone())
        .collect();

    format!(
        r#"Write a strategic brief for this client.

## Profile
Name: {name}
Project: {project}
Target audience: {audience}
Core problem: {problem}
Success vision: {vision}
Timeline: {timeline}
Budget: {budget}
Additional context: {context}

## Scores
Overall sophistication: {sophistication}
Urgency: {urgency}/100
Strategic clarity: {clarity}/100
Implementation readiness: {readiness}/100

## Strategic Implications
{implications}

## Interview Transcript
{transcript}

## Tone
{tone}
{pacing}

## Instructions
Respond with:
{{
  "personalMessage": "a short note addressed to {name}",
  "sections": [
    {{"title": "...", "content": "...", "reasoning": "why this matters for them"}}
  ]
}}
Use 3 to 5 sections, most important first."#,
        name = field(&profile.name),
        project = field(&profile.project_description),
        audience = field(&profile.target_audience),
        problem = field(&profile.core_problem),
        vision = field(&profile.success_vision),
        timeline = field(&profile.timeline),
        budget = field(&profile.budget),
        context = field(&profile.additional_context),
        sophistication = profile.overall_sophistication.name(),
        urgency = profile.urgency_score,
        clarity = profile.strategic_clarity,
        readiness = profile.implementation_readiness,
        implications = if implications.is_empty() {
            "none recorded".to_string()
        } else {
            implications
                .iter()
                .map(|i| format!("- {}", i))
                .collect::<Vec<_>>()
                .join("\n")
        },
        transcript = summarize_history(&transcript, 12),
        tone = tone_for(profile.overall_sophistication),
        pacing = pacing_for(profile.urgency_score),
    )
}

/// Deterministic two-section brief. `None` when the profile has no name.
pub fn fallback_brief(profile: &StrategicProfile) -> Option<StrategicBrief> {
    let name = profile.name.as_deref().map(str::trim).filter(|n| !n.is_empty())?;

    Some(StrategicBrief {
        personal_message: format!(
            "Thank you, {}. We've captured your answers and put together a starting point for your strategy.",
            name
        ),
        sections: vec![
            BriefSection {
                title: "Where You Are Today".to_string(),
                content: format!(
                    "{}, you've shared the shape of your project and the problem behind it. \
                     The first step is to turn that into a crisp statement of who you serve \
                     and why they will care.",
                    name
                ),
                reasoning: "A clear problem statement anchors every later decision.".to_string(),
            },
            BriefSection {
                title: "Recommended Next Steps".to_string(),
                content: "Validate the core problem with five to ten target customers, \
                          define one measurable success metric, and scope the smallest \
                          launch that tests it."
                    .to_string(),
                reasoning: "Small, measurable steps reduce risk before larger investment."
                    .to_string(),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::ScriptedGateway;
    use std::sync::{Arc, Mutex};

    fn named_profile(name: &str) -> StrategicProfile {
        StrategicProfile {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_synthesize_parses_brief() {
        let gateway = ScriptedGateway::new(|_, _| {
            Ok(r#"{"personalMessage": "Hi Dana",
                   "sections": [{"title": "Focus", "content": "Do one thing", "reasoning": "Speed"}]}"#
                .into())
        });
        let brief = BriefSynthesizer::new(&gateway)
            .synthesize(&named_profile("Dana"))
            .await
            .unwrap();
        assert_eq!(brief.personal_message, "Hi Dana");
        assert_eq!(brief.sections[0].title, "Focus");
    }

    #[tokio::test]
    async fn test_prompt_names_tone_and_urgency() {
        let seen = Arc::new(Mutex::new(String::new()));
        let captured = seen.clone();
        let gateway = ScriptedGateway::new(move |_, user| {
            *captured.lock().unwrap() = user.to_string();
            Err(crate::error::GatewayError::Timeout(10))
        });
        let profile = StrategicProfile {
            overall_sophistication: SophisticationLevel::Advanced,
            urgency_score: 85,
            ..named_profile("Dana")
        };
        let _ = BriefSynthesizer::new(&gateway).synthesize(&profile).await;

        let prompt = seen.lock().unwrap().clone();
        assert!(prompt.contains("Overall sophistication: advanced"));
        assert!(prompt.contains("Urgency: 85/100"));
        assert!(prompt.contains("under time pressure"));
    }

    #[tokio::test]
    async fn test_failure_uses_template_brief() {
        let gateway = ScriptedGateway::failing();
        let brief = BriefSynthesizer::new(&gateway)
            .synthesize(&named_profile("Dana"))
            .await
            .unwrap();
        assert_eq!(brief.sections.len(), 2);
        assert!(brief.personal_message.contains("Dana"));
        assert!(!brief.is_empty());
    }

    #[tokio::test]
    async fn test_empty_sections_count_as_failure() {
        let gateway =
            ScriptedGateway::new(|_, _| Ok(r#"{"personalMessage": "Hi", "sections": []}"#.into()));
        let brief = BriefSynthesizer::new(&gateway)
            .synthesize(&named_profile("Dana"))
            .await
            .unwrap();
        assert_eq!(brief, fallback_brief(&named_profile("Dana")).unwrap());
    }

    #[tokio::test]
    async fn test_no_name_means_no_brief() {
        let gateway = ScriptedGateway::failing();
        let result = BriefSynthesizer::new(&gateway)
            .synthesize(&StrategicProfile::default())
            .await;
        assert_eq!(result, Err(BriefError::MissingName));
        assert!(fallback_brief(&named_profile("  ")).is_none());
    }
}
