//! Ask command implementation.
//!
//! One-shot grounding: run the retrieval-augmented chain for a single
//! question and print the answer with the segment it was grounded in.

use super::build_retriever;
use crate::chain::RagChain;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::inference::OpenAiLvlm;
use anyhow::Result;
use std::sync::Arc;

/// Run the ask command.
pub async fn run_ask(question: &str, model: Option<String>, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask) {
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

    let chain = RagChain::new(build_retriever(&settings)?, lvlm, prompts);

    let spinner = Output::spinner("Searching video corpus...");

    match chain.invoke(question).await {
        Ok(output) => {
            spinner.finish_and_clear();

            println!("\n{}\n", output.final_text_output);

            let metadata = &output.input_to_lvlm.metadata;
            Output::header("Grounded in");
            Output::kv("video", &metadata.video_id);
            Output::kv("frame", &output.input_to_lvlm.image.display().to_string());
            if let Some(transcript) = &metadata.transcript {
                Output::kv("transcript", transcript);
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
