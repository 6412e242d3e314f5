//! Vector store abstraction for Sikt.
//!
//! Provides a trait-based interface over an index of video-segment
//! embeddings. The conversational core only reads from the index; writes
//! happen through the `import` surface when a corpus is loaded.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One indexed video segment: the embedded text unit plus the frame,
/// transcript, and source-video references needed to ground an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDocument {
    /// Unique document ID.
    pub id: Uuid,
    /// Video ID this segment belongs to.
    pub video_id: String,
    /// Video title.
    pub video_title: String,
    /// Text content this segment's embedding was computed from.
    pub content: String,
    /// Transcript of the segment, when the source had one.
    pub transcript: Option<String>,
    /// Path to the frame image extracted at the segment midpoint.
    pub frame_path: String,
    /// Path to the source video file, when available locally.
    pub video_path: Option<String>,
    /// Midpoint of the segment within the source video, in milliseconds.
    pub mid_time_ms: Option<i64>,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this segment was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl SegmentDocument {
    /// Create a new segment document.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        video_id: String,
        video_title: String,
        content: String,
        transcript: Option<String>,
        frame_path: String,
        video_path: Option<String>,
        mid_time_ms: Option<i64>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            video_id,
            video_title,
            content,
            transcript,
            frame_path,
            video_path,
            mid_time_ms,
            embedding,
            indexed_at: Utc::now(),
        }
    }

    /// Format the segment midpoint for display.
    pub fn format_timestamp(&self) -> String {
        let total_seconds = self.mid_time_ms.unwrap_or(0) / 1000;
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let secs = total_seconds % 60;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, minutes, secs)
        } else {
            format!("{:02}:{:02}", minutes, secs)
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched segment.
    pub document: SegmentDocument,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Summary information about an indexed video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedVideo {
    /// Video ID.
    pub video_id: String,
    /// Video title.
    pub video_title: String,
    /// Number of indexed segments.
    pub segment_count: u32,
    /// When the video was indexed.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store a segment with its embedding.
    async fn upsert(&self, doc: &SegmentDocument) -> Result<()>;

    /// Bulk upsert segments.
    async fn upsert_batch(&self, docs: &[SegmentDocument]) -> Result<usize>;

    /// Search for similar segments, best first.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// Delete segments by video ID.
    async fn delete_by_video_id(&self, video_id: &str) -> Result<usize>;

    /// List all indexed videos.
    async fn list_videos(&self) -> Result<Vec<IndexedVideo>>;

    /// Get total segment count.
    async fn document_count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
