//! Conversation state machine
//!
//! One call to `process_user_input` is one turn: it takes the caller's state,
//! never mutates it, and returns the next state alongside the message to show.
//!
//! ```text
//! answer ─► classify ─► route ─┬─ off_topic ─► redirect (baseline index unchanged)
//!                              └─ handler ─► analyze ─► update profile
//!                                                  │
//!                   ┌──────────────────────────────┼──────────────────────┐
//!                   ▼                              ▼                      ▼
//!              complete                   follow-up (director)      next baseline
//! ```
//!
//! Phases only move forward: discovery → refinement → completion.

use crate::analyzer::{record_insight, ResponseAnalyzer};
use crate::brief::BriefSynthesizer;
use crate::classifier::{ResponseCategory, ResponseClassifier};
use crate::director::{should_consult, ConversationDirector};
use crate::gateway::TextGateway;
use crate::questions::QuestionSequencer;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub const REDIRECT_PROMPT: &str = "You are a friendly strategy interviewer. The client drifted off topic. \
Reply with two sentences of plain text: acknowledge briefly, then restate the question.";

/// Recorded turns required before the interview may end early
pub const MIN_TURNS_FOR_EARLY_COMPLETION: usize = 6;

/// Characters a key field needs to count as substantial
const SUBSTANTIAL_CHARS: usize = 10;

const KEY_FIELDS: [ProfileField; 3] = [
    ProfileField::Name,
    ProfileField::ProjectDescription,
    ProfileField::CoreProblem,
];

const UNABLE_TO_CONTINUE: &str =
    "We weren't able to put your brief together from these answers. Please restart the interview.";

/// Result of one turn: what to show, and the state to hand back next time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub response: ConversationResponse,
    pub state: ConversationState,
}

/// Where a classified answer goes. Total over every label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// Steer the respondent back without advancing the interview
    Redirect,
    /// Record the answer into the profile
    Record(CategoryHandler),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CategoryHandler {
    category: ResponseCategory,
    /// Fields this kind of answer can fill, in preference order, after the
    /// question's own binding
    fields: &'static [ProfileField],
    /// Whether the director may be asked for a follow-up
    consults_director: bool,
}

fn route(category: ResponseCategory) -> Route {
    use ProfileField::*;

    match category {
        ResponseCategory::OffTopic => Route::Redirect,
        ResponseCategory::BasicInfo => record(category, &[Name], false),
        ResponseCategory::TechnicalDetails => record(category, &[AdditionalContext], true),
        ResponseCategory::BusinessStrategy => {
            record(category, &[ProjectDescription, TargetAudience], true)
        }
        ResponseCategory::ProblemDefinition => record(category, &[CoreProblem], true),
        ResponseCategory::VisionGoals => record(category, &[SuccessVision], true),
        ResponseCategory::Generic => record(category, &[], false),
    }
}

fn record(
    category: ResponseCategory,
    fields: &'static [ProfileField],
    consults_director: bool,
) -> Route {
    Route::Record(CategoryHandler {
        category,
        fields,
        consults_director,
    })
}

impl CategoryHandler {
    /// Write the answer into the first unset field among the question's
    /// binding and this handler's fields. First value wins.
    fn apply(
        &self,
        profile: &mut StrategicProfile,
        answer: &str,
        binding: Option<ProfileField>,
        insight: &ResponseInsight,
    ) -> Option<ProfileField> {
        let written = binding
            .into_iter()
            .chain(self.fields.iter().copied())
            .find(|field| profile.set_if_unset(*field, answer));

        if let Some(market) = &insight.extracted_entities.target_market {
            profile.set_if_unset(ProfileField::TargetAudience, market);
        }
        written
    }
}

/// Whether enough is known to stop before the baseline list runs out
pub fn has_enough_information(state: &ConversationState) -> bool {
    let substantial = KEY_FIELDS
        .iter()
        .filter(|field| state.user_profile.has_substantial(**field, SUBSTANTIAL_CHARS))
        .count();
    substantial >= KEY_FIELDS.len() && state.messages.len() >= MIN_TURNS_FOR_EARLY_COMPLETION
}

/// Drives interviews. Holds no per-conversation state.
pub struct InterviewEngine {
    gateway: Arc<dyn TextGateway>,
    sequencer: QuestionSequencer,
}

impl InterviewEngine {
    pub fn new(gateway: Arc<dyn TextGateway>, sequencer: QuestionSequencer) -> Self {
        Self { gateway, sequencer }
    }

    pub fn sequencer(&self) -> &QuestionSequencer {
        &self.sequencer
    }

    /// The question the respondent should be answering now
    pub fn next_question(&self, state: &ConversationState) -> Option<String> {
        if state.current_phase != ConversationPhase::Discovery {
            return None;
        }
        match &state.pending_follow_up {
            Some(follow_up) => Some(follow_up.question.clone()),
            None => self
                .sequencer
                .current_base_question(state.base_question_index)
                .map(|q| q.question.clone()),
        }
    }

    pub async fn process_user_input(&self, answer: &str, state: &ConversationState) -> Turn {
        match state.current_phase {
            ConversationPhase::Discovery => self.handle_discovery(answer, state).await,
            ConversationPhase::Refinement => self.handle_refinement(state).await,
            ConversationPhase::Completion => Turn {
                response: completed_response(state),
                state: state.clone(),
            },
        }
    }

    /// Explicit re-generation request. Moves discovery into refinement;
    /// later phases are left where they are.
    pub fn request_refinement(&self, state: &ConversationState) -> ConversationState {
        let mut next = state.clone();
        if next.current_phase == ConversationPhase::Discovery {
            next.transition(ConversationPhase::Refinement);
            next.pending_follow_up = None;
            next.next_action = NextAction::Refine;
            info!(conversation = %next.conversation_id, "entering refinement");
        }
        next
    }

    /// Re-run brief synthesis on the latest profile snapshot
    pub async fn regenerate_brief(&self, state: &ConversationState) -> Turn {
        let next = self.request_refinement(state);
        self.complete(next, "Brief regenerated from the latest profile")
            .await
    }

    async fn handle_refinement(&self, state: &ConversationState) -> Turn {
        self.complete(state.clone(), "Brief regenerated from the latest profile")
            .await
    }

    async fn handle_discovery(&self, answer: &str, state: &ConversationState) -> Turn {
        let mut next = state.clone();
        let follow_up = next.pending_follow_up.take();
        let answered_base_index = follow_up.is_none().then_some(next.base_question_index);

        let (response, binding) = match &follow_up {
            Some(question) => (
                UserResponse::follow_up(question, answer, next.current_question_index),
                None,
            ),
            None => match self.sequencer.current_base_question(next.base_question_index) {
                Some(question) => (
                    UserResponse::baseline(&question.question, answer, next.current_question_index),
                    question.profile_field,
                ),
                None => {
                    warn!(
                        conversation = %next.conversation_id,
                        index = next.base_question_index,
                        "answer arrived after the last baseline question"
                    );
                    next.messages.push(UserResponse::baseline(
                        "",
                        answer,
                        next.current_question_index,
                    ));
                    next.current_question_index += 1;
                    return self.complete(next, "All baseline questions answered").await;
                }
            },
        };

        let context = ConversationContext::from_state(
            &next,
            self.sequencer.remaining_questions(next.base_question_index),
        );
        let category = ResponseClassifier::new(&*self.gateway)
            .classify(answer, &context)
            .await;

        let handler = match route(category) {
            Route::Redirect => {
                if follow_up.is_some() {
                    // The follow-up stays open; only its real answer is logged
                    next.pending_follow_up = follow_up;
                } else {
                    next.messages.push(response);
                    next.current_question_index += 1;
                }
                return self.redirect(next, answer).await;
            }
            Route::Record(handler) => handler,
        };

        next.messages.push(response.clone());
        next.current_question_index += 1;

        let insight = ResponseAnalyzer::new(&*self.gateway)
            .analyze_response(&response, &context)
            .await;
        let confidence = insight.confidence_score / 100.0;
        handler.apply(&mut next.user_profile, answer, binding, &insight);
        record_insight(&mut next.user_profile, insight);

        if let Some(index) = answered_base_index {
            next.base_question_index = self.sequencer.advance(index);
        }

        if self.sequencer.is_exhausted(next.base_question_index) {
            return self.complete(next, "All baseline questions answered").await;
        }
        if has_enough_information(&next) {
            return self
                .complete(next, "Enough information gathered to write the brief")
                .await;
        }

        if let Some(index) = answered_base_index {
            if handler.consults_director && should_consult(next.baseline_response_count(), index) {
                let context = ConversationContext::from_state(
                    &next,
                    self.sequencer.remaining_questions(index),
                );
                let director = ConversationDirector::new(&*self.gateway, context);
                if let Some(question) = director.recommend_follow_up(&response).await {
                    next.next_action = NextAction::GenerateFollowup;
                    next.pending_follow_up = Some(question.clone());
                    return Turn {
                        response: ConversationResponse {
                            next_message: Some(question.question),
                            should_continue: true,
                            is_complete: false,
                            metadata: ResponseMetadata {
                                reasoning: question.reasoning,
                                confidence,
                                suggested_action: NextAction::GenerateFollowup.name().to_string(),
                            },
                        },
                        state: next,
                    };
                }
            }
        }

        next.next_action = NextAction::AskQuestion;
        let next_message = self.next_question(&next);
        Turn {
            response: ConversationResponse {
                next_message,
                should_continue: true,
                is_complete: false,
                metadata: ResponseMetadata {
                    reasoning: format!(
                        "Recorded {} answer; moving to the next question",
                        handler.category.label()
                    ),
                    confidence,
                    suggested_action: NextAction::AskQuestion.name().to_string(),
                },
            },
            state: next,
        }
    }

    /// Off-topic answer: steer back to the same question
    async fn redirect(&self, mut next: ConversationState, answer: &str) -> Turn {
        next.next_action = match next.pending_follow_up {
            Some(_) => NextAction::GenerateFollowup,
            None => NextAction::AskQuestion,
        };
        let question = self.next_question(&next).unwrap_or_default();

        let prompt = format!(
            "The interview question was: {}\nThe client answered: {}\nGently bring them back to the question.",
            question, answer
        );
        let message = match self.gateway.call(REDIRECT_PROMPT, &prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => static_redirect(&question),
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "redirect generation failed");
                static_redirect(&question)
            }
        };

        Turn {
            response: ConversationResponse {
                next_message: Some(message),
                should_continue: true,
                is_complete: false,
                metadata: ResponseMetadata {
                    reasoning: "Answer was off topic; repeating the current question".to_string(),
                    confidence: 0.5,
                    suggested_action: next.next_action.name().to_string(),
                },
            },
            state: next,
        }
    }

    /// Enter completion and synthesize the brief
    async fn complete(&self, mut next: ConversationState, reasoning: &str) -> Turn {
        next.transition(ConversationPhase::Completion);
        next.next_action = NextAction::Complete;
        next.pending_follow_up = None;
        info!(
            conversation = %next.conversation_id,
            turns = next.messages.len(),
            "interview complete"
        );

        next.brief = match BriefSynthesizer::new(&*self.gateway)
            .synthesize(&next.user_profile)
            .await
        {
            Ok(brief) => Some(brief),
            Err(err) => {
                warn!(error = %err, conversation = %next.conversation_id, "no brief available");
                None
            }
        };

        let mut response = completed_response(&next);
        response.metadata.reasoning = reasoning.to_string();
        Turn {
            response,
            state: next,
        }
    }
}

/// Response for a conversation that has reached completion
fn completed_response(state: &ConversationState) -> ConversationResponse {
    let confidence = f64::from(state.user_profile.strategic_clarity) / 100.0;
    match &state.brief {
        Some(brief) => ConversationResponse {
            next_message: Some(brief.personal_message.clone()),
            should_continue: false,
            is_complete: true,
            metadata: ResponseMetadata {
                reasoning: "Interview complete".to_string(),
                confidence,
                suggested_action: NextAction::Complete.name().to_string(),
            },
        },
        None => ConversationResponse {
            next_message: Some(UNABLE_TO_CONTINUE.to_string()),
            should_continue: false,
            is_complete: true,
            metadata: ResponseMetadata {
                reasoning: "Unable to continue: no brief could be produced".to_string(),
                confidence: 0.0,
                suggested_action: "restart".to_string(),
            },
        },
    }
}

fn static_redirect(question: &str) -> String {
    format!(
        "Thanks for sharing! To put your strategy together, let's get back to this: {}",
        question
    )
}
