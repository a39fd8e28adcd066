//! Strategic Brief - adaptive strategy interview engine
//!
//! Runs a guided interview, decides turn by turn whether a follow-up
//! question is worth asking, and turns the answers into a scored strategic
//! profile and a narrative brief.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use strategic_brief::{AnthropicGateway, Config, ConversationState, InterviewEngine, QuestionSequencer};
//!
//! let config = Config::from_env()?;
//! let gateway = Arc::new(AnthropicGateway::new(config.gateway.clone())?);
//! let engine = InterviewEngine::new(gateway, QuestionSequencer::default());
//!
//! let mut state = ConversationState::new();
//! let turn = engine.process_user_input("Dana", &state).await;
//! println!("{}", turn.response.next_message.unwrap_or_default());
//! state = turn.state;
//! ```
//!
//! # Architecture
//!
//! ```text
//! answer ─► ResponseClassifier ─► category handler ─► ResponseAnalyzer (profile scores)
//!                                                            │
//!                      ConversationDirector ◄────────────────┘
//!                      {follow-up | next baseline | complete}
//!                                                            │
//!                                        BriefSynthesizer ◄──┘ (once, on completion)
//! ```
//!
//! Every component talks to the model through [`TextGateway`], and every
//! gateway failure turns into that component's fallback. A turn never fails.

pub mod analyzer;
pub mod brief;
pub mod classifier;
pub mod config;
pub mod conversation;
pub mod director;
pub mod error;
pub mod gateway;
pub mod questions;
pub mod store;
pub mod types;

pub use analyzer::{ProfileMetrics, ResponseAnalyzer};
pub use brief::{BriefError, BriefSynthesizer};
pub use classifier::{ResponseCategory, ResponseClassifier};
pub use config::{Config, GatewayConfig, GATEWAY_TIMEOUT};
pub use conversation::{has_enough_information, InterviewEngine, Turn};
pub use director::ConversationDirector;
pub use error::{GatewayError, GatewayResult};
pub use gateway::{AnthropicGateway, TextGateway};
pub use questions::{BaselineQuestion, QuestionSequencer, QuestionType};
pub use store::{init_store, BriefStore, BriefSummary, StoredBrief};
pub use types::*;
