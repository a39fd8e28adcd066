//! Core types for the strategic interview engine
//!
//! Everything a conversation turn reads or produces lives here:
//! - Responses and per-response insights (append-only)
//! - The aggregated strategic profile (first value wins per field)
//! - The conversation state value that each turn replaces with a new one

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// One answered question. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub question: String,
    pub answer: String,
    /// Position in the full turn sequence (baseline + follow-up turns)
    pub question_index: usize,
    pub is_follow_up: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_reasoning: Option<String>,
}

impl UserResponse {
    pub fn baseline(question: &str, answer: &str, question_index: usize) -> Self {
        Self {
            question: question.to_string(),
            answer: answer.to_string(),
            question_index,
            is_follow_up: false,
            follow_up_reasoning: None,
        }
    }

    pub fn follow_up(follow_up: &FollowUpQuestion, answer: &str, question_index: usize) -> Self {
        Self {
            question: follow_up.question.clone(),
            answer: answer.to_string(),
            question_index,
            is_follow_up: true,
            follow_up_reasoning: Some(follow_up.reasoning.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
}

impl UrgencyLevel {
    /// Case-insensitive; unknown text is `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(UrgencyLevel::Low),
            "medium" => Some(UrgencyLevel::Medium),
            "high" => Some(UrgencyLevel::High),
            _ => None,
        }
    }

    /// Weight used when averaging urgency into a 0-100 score
    pub fn score(&self) -> f64 {
        match self {
            UrgencyLevel::Low => 25.0,
            UrgencyLevel::Medium => 50.0,
            UrgencyLevel::High => 85.0,
        }
    }

    pub fn readiness_bonus(&self) -> i32 {
        match self {
            UrgencyLevel::Low => 0,
            UrgencyLevel::Medium => 5,
            UrgencyLevel::High => 10,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UrgencyLevel::Low => "low",
            UrgencyLevel::Medium => "medium",
            UrgencyLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SophisticationLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl SophisticationLevel {
    /// Case-insensitive; unknown text is `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "beginner" => Some(SophisticationLevel::Beginner),
            "intermediate" => Some(SophisticationLevel::Intermediate),
            "advanced" => Some(SophisticationLevel::Advanced),
            _ => None,
        }
    }

    pub fn readiness_bonus(&self) -> i32 {
        match self {
            SophisticationLevel::Beginner => 0,
            SophisticationLevel::Intermediate => 5,
            SophisticationLevel::Advanced => 10,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SophisticationLevel::Beginner => "beginner",
            SophisticationLevel::Intermediate => "intermediate",
            SophisticationLevel::Advanced => "advanced",
        }
    }
}

/// Entities pulled out of a single answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedEntities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_market: Option<String>,
    #[serde(default)]
    pub key_pain_points: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient_urgency",
        skip_serializing_if = "Option::is_none"
    )]
    pub urgency_level: Option<UrgencyLevel>,
    #[serde(
        default,
        deserialize_with = "lenient_sophistication",
        skip_serializing_if = "Option::is_none"
    )]
    pub sophistication_level: Option<SophisticationLevel>,
    #[serde(default)]
    pub budget_signals: Vec<String>,
    #[serde(default)]
    pub timeline_signals: Vec<String>,
}

// Model replies vary in casing and sometimes invent levels. A bad level
// becomes `None` instead of failing the whole entity set.
fn lenient_level<'de, D, T>(
    deserializer: D,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(parse))
}

fn lenient_urgency<'de, D>(deserializer: D) -> Result<Option<UrgencyLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_level(deserializer, UrgencyLevel::parse)
}

fn lenient_sophistication<'de, D>(deserializer: D) -> Result<Option<SophisticationLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_level(deserializer, SophisticationLevel::parse)
}

/// Analysis of one response. Created once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInsight {
    pub original_response: UserResponse,
    pub extracted_entities: ExtractedEntities,
    pub strategic_implications: Vec<String>,
    /// Always within [0, 100]
    pub confidence_score: f64,
}

/// Snapshot handed to the classifier and director. Rebuilt, not mutated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    pub sophistication_level: SophisticationLevel,
    pub strategic_clarity: u8,
    pub information_gaps: Vec<String>,
    pub urgency_level: u8,
    pub conversation_history: Vec<UserResponse>,
    pub current_insights: Vec<ResponseInsight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_question_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upcoming_questions: Option<Vec<String>>,
}

impl ConversationContext {
    /// Build a context from the profile's derived metrics and the response log
    pub fn from_state(state: &ConversationState, upcoming_questions: Vec<String>) -> Self {
        let profile = &state.user_profile;
        Self {
            sophistication_level: profile.overall_sophistication,
            strategic_clarity: profile.strategic_clarity,
            information_gaps: Vec::new(),
            urgency_level: profile.urgency_score,
            conversation_history: state.messages.clone(),
            current_insights: profile.insights.clone(),
            current_question_index: Some(state.current_question_index),
            upcoming_questions: Some(upcoming_questions),
        }
    }

    pub fn with_gaps(self, information_gaps: Vec<String>) -> Self {
        Self {
            information_gaps,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowUpPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowUpCategory {
    Strategic,
    Tactical,
    Clarification,
}

/// A dynamically generated question, consumed by at most one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpQuestion {
    pub question: String,
    pub reasoning: String,
    pub priority: FollowUpPriority,
    pub category: FollowUpCategory,
    #[serde(default)]
    pub expected_insight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAssessment {
    pub completeness_score: f64,
    pub strategic_readiness: f64,
    pub should_continue: bool,
    #[serde(default)]
    pub missing_elements: Vec<String>,
    #[serde(default)]
    pub recommended_questions: Vec<FollowUpQuestion>,
}

impl ConversationAssessment {
    /// Neutral assessment used whenever the evaluator cannot be reached
    pub fn neutral() -> Self {
        Self {
            completeness_score: 70.0,
            strategic_readiness: 60.0,
            should_continue: false,
            missing_elements: Vec::new(),
            recommended_questions: Vec::new(),
        }
    }
}

/// Scalar profile fields a response can populate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfileField {
    Name,
    ProjectDescription,
    TargetAudience,
    CoreProblem,
    SuccessVision,
    Timeline,
    Budget,
    AdditionalContext,
}

/// Aggregated, scored summary of every response in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicProfile {
    pub name: Option<String>,
    pub project_description: Option<String>,
    pub target_audience: Option<String>,
    pub core_problem: Option<String>,
    pub success_vision: Option<String>,
    pub timeline: Option<String>,
    pub budget: Option<String>,
    pub additional_context: Option<String>,

    pub overall_sophistication: SophisticationLevel,
    pub urgency_score: u8,
    pub strategic_clarity: u8,
    pub implementation_readiness: u8,
    pub insights: Vec<ResponseInsight>,
}

impl Default for StrategicProfile {
    fn default() -> Self {
        Self {
            name: None,
            project_description: None,
            target_audience: None,
            core_problem: None,
            success_vision: None,
            timeline: None,
            budget: None,
            additional_context: None,
            overall_sophistication: SophisticationLevel::Intermediate,
            urgency_score: 50,
            strategic_clarity: 0,
            implementation_readiness: 50,
            insights: Vec::new(),
        }
    }
}

impl StrategicProfile {
    pub fn field(&self, field: ProfileField) -> Option<&str> {
        match field {
            ProfileField::Name => self.name.as_deref(),
            ProfileField::ProjectDescription => self.project_description.as_deref(),
            ProfileField::TargetAudience => self.target_audience.as_deref(),
            ProfileField::CoreProblem => self.core_problem.as_deref(),
            ProfileField::SuccessVision => self.success_vision.as_deref(),
            ProfileField::Timeline => self.timeline.as_deref(),
            ProfileField::Budget => self.budget.as_deref(),
            ProfileField::AdditionalContext => self.additional_context.as_deref(),
        }
    }

    fn slot(&mut self, field: ProfileField) -> &mut Option<String> {
        match field {
            ProfileField::Name => &mut self.name,
            ProfileField::ProjectDescription => &mut self.project_description,
            ProfileField::TargetAudience => &mut self.target_audience,
            ProfileField::CoreProblem => &mut self.core_problem,
            ProfileField::SuccessVision => &mut self.success_vision,
            ProfileField::Timeline => &mut self.timeline,
            ProfileField::Budget => &mut self.budget,
            ProfileField::AdditionalContext => &mut self.additional_context,
        }
    }

    /// First value wins: writes only into an unset field. Blank values never qualify.
    /// Returns whether the field was written.
    pub fn set_if_unset(&mut self, field: ProfileField, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        let slot = self.slot(field);
        if slot.is_some() {
            return false;
        }
        *slot = Some(value.to_string());
        true
    }

    /// Whether a field holds more than `min_chars` characters
    pub fn has_substantial(&self, field: ProfileField, min_chars: usize) -> bool {
        self.field(field)
            .map(|v| v.trim().chars().count() > min_chars)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationPhase {
    Discovery,
    Refinement,
    Completion,
}

impl ConversationPhase {
    fn rank(&self) -> u8 {
        match self {
            ConversationPhase::Discovery => 0,
            ConversationPhase::Refinement => 1,
            ConversationPhase::Completion => 2,
        }
    }

    /// Phases only move forward
    pub fn can_transition_to(&self, next: ConversationPhase) -> bool {
        next.rank() >= self.rank()
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConversationPhase::Discovery => "discovery",
            ConversationPhase::Refinement => "refinement",
            ConversationPhase::Completion => "completion",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    AskQuestion,
    GenerateFollowup,
    Complete,
    Refine,
}

impl NextAction {
    pub fn name(&self) -> &'static str {
        match self {
            NextAction::AskQuestion => "ask_question",
            NextAction::GenerateFollowup => "generate_followup",
            NextAction::Complete => "complete",
            NextAction::Refine => "refine",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefSection {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub reasoning: String,
}

/// Final narrative output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicBrief {
    pub personal_message: String,
    pub sections: Vec<BriefSection>,
}

impl StrategicBrief {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.personal_message.trim().is_empty()
    }
}

/// Top-level state of one conversation. Each turn yields a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    pub messages: Vec<UserResponse>,
    pub current_phase: ConversationPhase,
    pub user_profile: StrategicProfile,
    pub next_action: NextAction,
    pub conversation_id: String,

    /// Baseline questions answered so far. Only the sequencer advances it.
    #[serde(default)]
    pub base_question_index: usize,
    /// Every recorded turn, baseline and follow-up alike
    #[serde(default)]
    pub current_question_index: usize,
    /// The single outstanding follow-up, if one was asked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_follow_up: Option<FollowUpQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brief: Option<StrategicBrief>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationState {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(conversation_id: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            current_phase: ConversationPhase::Discovery,
            user_profile: StrategicProfile::default(),
            next_action: NextAction::AskQuestion,
            conversation_id: conversation_id.into(),
            base_question_index: 0,
            current_question_index: 0,
            pending_follow_up: None,
            brief: None,
        }
    }

    /// Move to `next` if that does not regress. Returns the phase actually held.
    pub fn transition(&mut self, next: ConversationPhase) -> ConversationPhase {
        if self.current_phase.can_transition_to(next) {
            self.current_phase = next;
        }
        self.current_phase
    }

    pub fn is_complete(&self) -> bool {
        self.current_phase == ConversationPhase::Completion
    }

    pub fn baseline_response_count(&self) -> usize {
        self.messages.iter().filter(|m| !m.is_follow_up).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub reasoning: String,
    /// Within [0, 1]
    pub confidence: f64,
    pub suggested_action: String,
}

/// What the host shows after a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_message: Option<String>,
    pub should_continue: bool,
    pub is_complete: bool,
    pub metadata: ResponseMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_value_wins() {
        let mut profile = StrategicProfile::default();
        assert!(profile.set_if_unset(ProfileField::ProjectDescription, "A marketplace for tutors"));
        assert!(!profile.set_if_unset(ProfileField::ProjectDescription, "Something else"));
        assert_eq!(
            profile.field(ProfileField::ProjectDescription),
            Some("A marketplace for tutors")
        );
    }

    #[test]
    fn test_blank_values_never_qualify() {
        let mut profile = StrategicProfile::default();
        assert!(!profile.set_if_unset(ProfileField::Name, "   "));
        assert!(profile.name.is_none());
    }

    #[test]
    fn test_phase_transitions_are_monotonic() {
        let mut state = ConversationState::new();
        assert_eq!(state.transition(ConversationPhase::Refinement), ConversationPhase::Refinement);
        assert_eq!(state.transition(ConversationPhase::Discovery), ConversationPhase::Refinement);
        assert_eq!(state.transition(ConversationPhase::Completion), ConversationPhase::Completion);
        assert_eq!(state.transition(ConversationPhase::Refinement), ConversationPhase::Completion);
    }

    #[test]
    fn test_state_serializes_with_wire_names() {
        let state = ConversationState::with_id("c-1");
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["currentPhase"], "discovery");
        assert_eq!(json["nextAction"], "ask_question");
        assert_eq!(json["conversationId"], "c-1");
        assert!(json.get("pendingFollowUp").is_none());
    }

    #[test]
    fn test_entities_tolerate_missing_fields() {
        let entities: ExtractedEntities =
            serde_json::from_str(r#"{"urgencyLevel": "high"}"#).unwrap();
        assert_eq!(entities.urgency_level, Some(UrgencyLevel::High));
        assert!(entities.key_pain_points.is_empty());
        assert!(entities.sophistication_level.is_none());
    }

    #[test]
    fn test_entity_levels_ignore_casing_and_unknowns() {
        let entities: ExtractedEntities = serde_json::from_str(
            r#"{"companyName": "Acme", "urgencyLevel": " High", "sophisticationLevel": "ADVANCED"}"#,
        )
        .unwrap();
        assert_eq!(entities.urgency_level, Some(UrgencyLevel::High));
        assert_eq!(entities.sophistication_level, Some(SophisticationLevel::Advanced));

        let entities: ExtractedEntities = serde_json::from_str(
            r#"{"companyName": "Acme", "urgencyLevel": "urgent!", "sophisticationLevel": null,
                "budgetSignals": ["$20k"]}"#,
        )
        .unwrap();
        assert!(entities.urgency_level.is_none());
        assert!(entities.sophistication_level.is_none());
        assert_eq!(entities.company_name.as_deref(), Some("Acme"));
        assert_eq!(entities.budget_signals, vec!["$20k".to_string()]);

        let entities: ExtractedEntities =
            serde_json::from_str(r#"{"urgencyLevel": 3, "sophisticationLevel": ""}"#).unwrap();
        assert!(entities.urgency_level.is_none());
        assert!(entities.sophistication_level.is_none());
    }
}
