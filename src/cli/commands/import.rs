//! Import command implementation.
//!
//! Loads pre-indexed video segments (metadata plus precomputed embedding
//! vectors) from a JSONL file into the local store. The corpus is indexed
//! offline by the embedding pipeline; this is the only write surface.

use super::open_store;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::{SegmentDocument, VectorStore};
use anyhow::Result;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::BufRead;

/// One line of an import file.
#[derive(Debug, Deserialize)]
struct SegmentRecord {
    video_id: String,
    video_title: String,
    content: String,
    #[serde(default)]
    transcript: Option<String>,
    extracted_frame_path: String,
    #[serde(default)]
    video_path: Option<String>,
    #[serde(default)]
    mid_time_ms: Option<i64>,
    embedding: Vec<f32>,
}

impl From<SegmentRecord> for SegmentDocument {
    fn from(record: SegmentRecord) -> Self {
        SegmentDocument::new(
            record.video_id,
            record.video_title,
            record.content,
            record.transcript,
            record.extracted_frame_path,
            record.video_path,
            record.mid_time_ms,
            record.embedding,
        )
    }
}

/// Run the import command.
pub async fn run_import(input: &str, replace: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Import) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let store = open_store(&settings)?;

    let file = std::fs::File::open(input)
        .map_err(|e| anyhow::anyhow!("Cannot open {}: {}", input, e))?;
    let reader = std::io::BufReader::new(file);

    let mut documents: Vec<SegmentDocument> = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: SegmentRecord = serde_json::from_str(&line)
            .map_err(|e| anyhow::anyhow!("Invalid segment record on line {}: {}", line_no + 1, e))?;
        documents.push(record.into());
    }

    if documents.is_empty() {
        Output::warning("No segment records found in the input file.");
        return Ok(());
    }

    // Mismatched dimensions would make every search return noise
    let expected = settings.embedding.dimensions as usize;
    if let Some(doc) = documents.iter().find(|d| d.embedding.len() != expected) {
        Output::warning(&format!(
            "Segment {} has {}-dimensional embedding, configured dimensions are {}.",
            doc.id,
            doc.embedding.len(),
            expected
        ));
    }

    if replace {
        let video_ids: HashSet<String> =
            documents.iter().map(|d| d.video_id.clone()).collect();
        for video_id in &video_ids {
            store.delete_by_video_id(video_id).await?;
        }
        Output::info(&format!("Replaced segments for {} videos", video_ids.len()));
    }

    let spinner = Output::spinner("Importing segments...");
    let count = store.upsert_batch(&documents).await?;
    spinner.finish_and_clear();

    Output::success(&format!("Imported {} segments from {}", count, input));
    Ok(())
}
