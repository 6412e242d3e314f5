//! Retrieval contract and the vector-store-backed implementation.
//!
//! The conversational core consumes retrieval through the narrow
//! [`Retriever`] trait: a query string in, ranked segment hits out.
//! [`VectorRetriever`] is the shipped implementation, composing a query
//! embedder with a vector store.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{SearchResult, VectorStore};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Metadata carried by a retrieved video segment.
#[derive(Debug, Clone)]
pub struct SegmentMetadata {
    /// Video ID the segment belongs to.
    pub video_id: String,
    /// Segment transcript, when the source had one.
    pub transcript: Option<String>,
    /// Frame image extracted at the segment midpoint.
    pub frame_path: PathBuf,
    /// Source video file, when available locally.
    pub video_path: Option<PathBuf>,
    /// Segment midpoint within the source video, in milliseconds.
    pub mid_time_ms: Option<i64>,
}

/// A retrieved segment with its relevance score.
#[derive(Debug, Clone)]
pub struct SegmentHit {
    /// The text unit the segment embedding was matched on.
    pub content: String,
    /// Similarity score (higher is better).
    pub score: f32,
    /// Segment metadata.
    pub metadata: SegmentMetadata,
}

impl From<SearchResult> for SegmentHit {
    fn from(result: SearchResult) -> Self {
        let doc = result.document;
        Self {
            content: doc.content,
            score: result.score,
            metadata: SegmentMetadata {
                video_id: doc.video_id,
                transcript: doc.transcript,
                frame_path: PathBuf::from(doc.frame_path),
                video_path: doc.video_path.map(PathBuf::from),
                mid_time_ms: doc.mid_time_ms,
            },
        }
    }
}

/// Trait for segment retrieval.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Search the index, returning up to `k` hits ordered by relevance.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SegmentHit>>;
}

/// Retriever backed by an embedder and a vector store.
pub struct VectorRetriever {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl VectorRetriever {
    /// Create a new vector retriever.
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
        }
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    #[instrument(skip(self), fields(query = %query))]
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SegmentHit>> {
        let query_embedding = self.embedder.embed(query).await?;

        let results = self.vector_store.search(&query_embedding, k).await?;
        debug!("Retrieved {} segments", results.len());

        Ok(results.into_iter().map(SegmentHit::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::{MemoryVectorStore, SegmentDocument};
    use crate::error::SiktError;

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| self.0.clone()).collect())
        }

        fn dimensions(&self) -> usize {
            self.0.len()
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(SiktError::Embedding("backend unavailable".to_string()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(SiktError::Embedding("backend unavailable".to_string()))
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    #[tokio::test]
    async fn test_vector_retriever_top_k() {
        let store = Arc::new(MemoryVectorStore::new());

        let close = SegmentDocument::new(
            "v1".to_string(),
            "Spacewalk".to_string(),
            "An astronaut floats outside the station".to_string(),
            Some("An astronaut floats outside the station".to_string()),
            "/frames/v1_3.jpg".to_string(),
            Some("/videos/v1.mp4".to_string()),
            Some(42_000),
            vec![1.0, 0.0, 0.0],
        );
        let far = SegmentDocument::new(
            "v2".to_string(),
            "Launch Day".to_string(),
            "The rocket lifts off".to_string(),
            None,
            "/frames/v2_0.jpg".to_string(),
            None,
            None,
            vec![0.0, 1.0, 0.0],
        );
        store.upsert_batch(&[close, far]).await.unwrap();

        let retriever = VectorRetriever::new(store, Arc::new(FixedEmbedder(vec![1.0, 0.0, 0.0])));

        let hits = retriever.search("astronaut", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.video_id, "v1");
        assert_eq!(hits[0].metadata.frame_path, PathBuf::from("/frames/v1_3.jpg"));
        assert_eq!(hits[0].metadata.mid_time_ms, Some(42_000));
    }

    #[tokio::test]
    async fn test_embedder_failure_propagates() {
        let store = Arc::new(MemoryVectorStore::new());
        let retriever = VectorRetriever::new(store, Arc::new(FailingEmbedder));

        let result = retriever.search("anything", 1).await;
        assert!(matches!(result, Err(SiktError::Embedding(_))));
    }
}
