//! Search command implementation.

use super::build_retriever;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, limit: usize, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let retriever = build_retriever(&settings)?;

    let spinner = Output::spinner("Searching...");

    let results = retriever.search(query, limit).await;
    spinner.finish_and_clear();

    match results {
        Ok(hits) => {
            if hits.is_empty() {
                Output::warning("No segments found matching your query.");
            } else {
                Output::success(&format!("Found {} segments", hits.len()));

                for hit in &hits {
                    let timestamp = format_mid_time(hit.metadata.mid_time_ms);
                    Output::segment_result(
                        &hit.metadata.video_id,
                        &timestamp,
                        hit.score,
                        &hit.content,
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(anyhow::anyhow!("{}", e));
        }
    }

    Ok(())
}

/// Format a millisecond midpoint as MM:SS for display.
fn format_mid_time(mid_time_ms: Option<i64>) -> String {
    match mid_time_ms {
        Some(ms) => {
            let total_seconds = ms / 1000;
            format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
        }
        None => "--:--".to_string(),
    }
}
