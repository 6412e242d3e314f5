//! List command implementation.

use super::open_store;
use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::VectorStore;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;

    match store.list_videos().await {
        Ok(videos) => {
            if videos.is_empty() {
                Output::info("No videos indexed yet. Use 'sikt import <file>' to load a corpus.");
            } else {
                Output::header(&format!("Indexed Videos ({})", videos.len()));
                println!();

                for video in &videos {
                    Output::video_info(&video.video_title, &video.video_id, video.segment_count);
                }

                let total_segments: u32 = videos.iter().map(|v| v.segment_count).sum();
                println!();
                Output::kv("Total videos", &videos.len().to_string());
                Output::kv("Total segments", &total_segments.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list videos: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
