//! Interactive chat command over the video corpus.
//!
//! The first query grounds the session in the best-matching video segment;
//! follow-up questions are answered about the same segment. Typing 'clear'
//! starts over, and a bare number picks one of the configured sample
//! queries.

use super::build_retriever;
use crate::chain::RagChain;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::inference::OpenAiLvlm;
use crate::session::ChatSession;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use uuid::Uuid;

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Chat) {
        Output::error(&format!("{}", e));
        Output::info("Run 'sikt init' to verify your setup.");
        return Err(e.into());
    }

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;

    let model = model.unwrap_or_else(|| settings.inference.model.clone());
    let lvlm = Arc::new(OpenAiLvlm::new(&model, settings.inference.temperature));

    let chain = RagChain::new(build_retriever(&settings)?, lvlm.clone(), prompts.clone());

    // Per-session clip name so parallel sessions don't overwrite each other
    let mut session = ChatSession::new(chain, lvlm, prompts, &settings)
        .with_clip_name(format!("clip_{}.mp4", Uuid::new_v4()));

    let sample_queries = &settings.chat.sample_queries;

    println!("\n{}", style("Sikt Chat").bold().cyan());
    println!(
        "{}",
        style("Ask about your video corpus. 'clear' starts over, 'exit' quits.").dim()
    );
    print_sample_queries(sample_queries);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            session.clear();
            Output::info("Session cleared. The next question retrieves a fresh segment.");
            continue;
        }

        // A bare number selects a sample query
        let query = match input.parse::<usize>() {
            Ok(n) if n >= 1 && n <= sample_queries.len() => sample_queries[n - 1].clone(),
            _ => input.to_string(),
        };

        let was_grounded = session.is_grounded();
        let spinner = Output::spinner("Processing your query...");

        match session.submit_query(&query).await {
            Ok(answer) => {
                spinner.finish_and_clear();
                println!("\n{} {}\n", style("Sikt:").cyan().bold(), answer);

                // Surface the anchored clip once, right after grounding
                if !was_grounded {
                    if let Some(clip) = &session.state().grounding.video_path {
                        Output::clip_anchor(&clip.display().to_string());
                    }
                }
            }
            Err(e) => {
                spinner.finish_and_clear();
                Output::error(&format!("An error occurred: {}", e));
            }
        }
    }

    Ok(())
}

/// Print the configured sample queries, numbered for quick selection.
fn print_sample_queries(sample_queries: &[String]) {
    if sample_queries.is_empty() {
        println!();
        return;
    }

    println!("{}", style("Sample queries (type a number to use one):").dim());
    for (i, query) in sample_queries.iter().enumerate() {
        println!("  {} {}", style(format!("{}.", i + 1)).dim(), query);
    }
    println!();
}
