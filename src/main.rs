//! Strategic Brief CLI
//!
//! Run with: cargo run
//! One stateless turn: cargo run -- --turn state.json "my answer"

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use strategic_brief::{
    init_store, AnthropicGateway, Config, ConversationState, InterviewEngine, QuestionSequencer,
    StrategicBrief,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let args: Vec<String> = std::env::args().collect();
    let config = Config::from_env()?;

    if args.len() > 1 {
        match args[1].as_str() {
            "--questions" => {
                let sequencer = load_sequencer(&config)?;
                println!("{}", serde_json::to_string_pretty(sequencer.questions())?);
                return Ok(());
            }
            "--turn" => {
                // --turn <state.json|-> <answer...>
                let state_path = args.get(2).map(|s| s.as_str()).unwrap_or("-");
                let answer = args.get(3..).map(|rest| rest.join(" ")).unwrap_or_default();
                return run_turn(&config, state_path, &answer).await;
            }
            "--history" => {
                let limit = args.get(2).and_then(|n| n.parse().ok()).unwrap_or(10);
                return run_history(&config, limit);
            }
            "--show" => {
                let id = args.get(2).context("Usage: --show <conversation_id>")?;
                return run_show(&config, id);
            }
            "--repl" => {}
            other => {
                eprintln!("Unknown command: {}", other);
                print_usage();
                return Ok(());
            }
        }
    }

    run_repl(&config).await
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  strategic-brief                       interactive interview");
    eprintln!("  strategic-brief --turn <state|-> <answer>  one stateless turn (JSON out)");
    eprintln!("  strategic-brief --questions           baseline questions as JSON");
    eprintln!("  strategic-brief --history [N]         recently stored briefs");
    eprintln!("  strategic-brief --show <id>           one stored profile and brief");
}

fn load_sequencer(config: &Config) -> Result<QuestionSequencer> {
    match &config.questions_path {
        Some(path) => QuestionSequencer::load(path),
        None => Ok(QuestionSequencer::default()),
    }
}

fn build_engine(config: &Config) -> Result<InterviewEngine> {
    let gateway = AnthropicGateway::new(config.gateway.clone())?;
    Ok(InterviewEngine::new(Arc::new(gateway), load_sequencer(config)?))
}

/// Store the brief of a completed conversation
fn persist(config: &Config, state: &ConversationState) -> Result<()> {
    let Some(brief) = &state.brief else {
        return Ok(());
    };
    config.ensure_data_dir()?;
    let store = init_store(&config.db_path())?;
    store.save(&state.conversation_id, &state.user_profile, brief)?;
    tracing::info!(conversation = %state.conversation_id, "brief stored");
    Ok(())
}

async fn run_turn(config: &Config, state_path: &str, answer: &str) -> Result<()> {
    let engine = build_engine(config)?;
    let state = if state_path == "-" {
        ConversationState::new()
    } else {
        let json = std::fs::read_to_string(state_path)
            .with_context(|| format!("Failed to read state from {}", state_path))?;
        serde_json::from_str(&json).context("State file is not a valid conversation state")?
    };

    if answer.trim().is_empty() {
        let output = serde_json::json!({
            "nextMessage": engine.next_question(&state),
            "state": state,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let turn = engine.process_user_input(answer, &state).await;
    if turn.response.is_complete {
        persist(config, &turn.state)?;
    }
    println!("{}", serde_json::to_string_pretty(&turn)?);
    Ok(())
}

fn run_history(config: &Config, limit: usize) -> Result<()> {
    config.ensure_data_dir()?;
    let store = init_store(&config.db_path())?;
    let briefs = store.list_recent(limit)?;
    if briefs.is_empty() {
        println!("No briefs stored yet.");
        return Ok(());
    }
    for b in briefs {
        println!(
            "{}  {:<24} clarity {:>3}  readiness {:>3}  {}",
            b.conversation_id,
            b.name.unwrap_or_else(|| "(unnamed)".to_string()),
            b.strategic_clarity,
            b.implementation_readiness,
            b.updated_at
        );
    }
    Ok(())
}

fn run_show(config: &Config, id: &str) -> Result<()> {
    config.ensure_data_dir()?;
    let store = init_store(&config.db_path())?;
    match store.get(id)? {
        Some(stored) => println!("{}", serde_json::to_string_pretty(&stored)?),
        None => println!("No brief stored for {}", id),
    }
    Ok(())
}

fn print_brief(brief: &StrategicBrief) {
    println!("\n{}\n", brief.personal_message);
    for (i, section) in brief.sections.iter().enumerate() {
        println!("{}. {}", i + 1, section.title);
        println!("   {}", section.content);
        if !section.reasoning.is_empty() {
            println!("   Why: {}", section.reasoning);
        }
        println!();
    }
}

async fn run_repl(config: &Config) -> Result<()> {
    let engine = build_engine(config)?;
    let mut state = ConversationState::new();

    println!("Strategy interview. Type /brief to finish early, /quit to leave.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    while let Some(question) = engine.next_question(&state) {
        println!("{}", question);
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        let answer = line.trim();

        let turn = match answer {
            "/quit" => return Ok(()),
            "/brief" => engine.regenerate_brief(&state).await,
            "" => continue,
            _ => engine.process_user_input(answer, &state).await,
        };
        state = turn.state;

        if turn.response.is_complete {
            break;
        }
        if let Some(message) = turn.response.next_message {
            // The next question is printed at the top of the loop
            if Some(&message) != engine.next_question(&state).as_ref() {
                println!("\n{}\n", message);
            }
        }
    }

    match &state.brief {
        Some(brief) => {
            print_brief(brief);
            persist(config, &state)?;
            println!("Saved as {}", state.conversation_id);
        }
        None => println!(
            "We weren't able to put your brief together. Please restart the interview."
        ),
    }
    Ok(())
}
