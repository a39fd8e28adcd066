//! Replay a list of answers through a fresh interview
//!
//! Usage: cargo run --bin replay -- answers.json
//!
//! `answers.json` is a JSON array of strings. Prints every turn's response
//! to stderr and the final conversation state as JSON on stdout.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use strategic_brief::{AnthropicGateway, Config, ConversationState, InterviewEngine, QuestionSequencer};

fn load_answers(path: &Path) -> Result<Vec<String>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read answers from {:?}", path))?;
    serde_json::from_str(&json).context("Answers file must be a JSON array of strings")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args: Vec<String> = std::env::args().collect();
    let path = args.get(1).context("Usage: replay <answers.json>")?;
    let answers = load_answers(Path::new(path))?;

    let config = Config::from_env()?;
    let sequencer = match &config.questions_path {
        Some(p) => QuestionSequencer::load(p)?,
        None => QuestionSequencer::default(),
    };
    let engine = InterviewEngine::new(Arc::new(AnthropicGateway::new(config.gateway)?), sequencer);

    let mut state = ConversationState::new();
    for (i, answer) in answers.iter().enumerate() {
        if state.is_complete() {
            eprintln!("Interview completed after {} answers; {} unused", i, answers.len() - i);
            break;
        }
        let turn = engine.process_user_input(answer, &state).await;
        eprintln!(
            "[{}] {} -> {}",
            i,
            turn.response.metadata.suggested_action,
            turn.response.next_message.as_deref().unwrap_or("")
        );
        state = turn.state;
    }

    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
