//! In-memory vector store implementation.
//!
//! Useful for testing and small corpora.

use super::{cosine_similarity, IndexedVideo, SearchResult, SegmentDocument, VectorStore};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory vector store.
pub struct MemoryVectorStore {
    documents: RwLock<HashMap<String, SegmentDocument>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, doc: &SegmentDocument) -> Result<()> {
        let mut docs = self.documents.write().unwrap();
        docs.insert(doc.id.to_string(), doc.clone());
        Ok(())
    }

    async fn upsert_batch(&self, docs: &[SegmentDocument]) -> Result<usize> {
        let mut store = self.documents.write().unwrap();
        for doc in docs {
            store.insert(doc.id.to_string(), doc.clone());
        }
        Ok(docs.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let docs = self.documents.read().unwrap();

        let mut results: Vec<SearchResult> = docs
            .values()
            .map(|doc| {
                let score = cosine_similarity(query_embedding, &doc.embedding);
                SearchResult {
                    document: doc.clone(),
                    score,
                }
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }

    async fn delete_by_video_id(&self, video_id: &str) -> Result<usize> {
        let mut docs = self.documents.write().unwrap();
        let initial_len = docs.len();
        docs.retain(|_, doc| doc.video_id != video_id);
        Ok(initial_len - docs.len())
    }

    async fn list_videos(&self) -> Result<Vec<IndexedVideo>> {
        let docs = self.documents.read().unwrap();

        let mut video_map: HashMap<String, IndexedVideo> = HashMap::new();

        for doc in docs.values() {
            let entry = video_map
                .entry(doc.video_id.clone())
                .or_insert_with(|| IndexedVideo {
                    video_id: doc.video_id.clone(),
                    video_title: doc.video_title.clone(),
                    segment_count: 0,
                    indexed_at: doc.indexed_at,
                });

            entry.segment_count += 1;
            if doc.indexed_at > entry.indexed_at {
                entry.indexed_at = doc.indexed_at;
            }
        }

        let mut videos: Vec<IndexedVideo> = video_map.into_values().collect();
        videos.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));

        Ok(videos)
    }

    async fn document_count(&self) -> Result<usize> {
        let docs = self.documents.read().unwrap();
        Ok(docs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();

        let doc1 = SegmentDocument::new(
            "video1".to_string(),
            "Moon Landing".to_string(),
            "Astronauts aboard the spacecraft".to_string(),
            Some("Astronauts aboard the spacecraft".to_string()),
            "/frames/video1_0.jpg".to_string(),
            Some("/videos/video1.mp4".to_string()),
            Some(125_000),
            vec![1.0, 0.0, 0.0],
        );

        let doc2 = SegmentDocument::new(
            "video1".to_string(),
            "Moon Landing".to_string(),
            "Mission control celebrates".to_string(),
            None,
            "/frames/video1_1.jpg".to_string(),
            None,
            None,
            vec![0.0, 1.0, 0.0],
        );

        store.upsert_batch(&[doc1, doc2]).await.unwrap();

        assert_eq!(store.document_count().await.unwrap(), 2);

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].document.frame_path, "/frames/video1_0.jpg");

        let videos = store.list_videos().await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].segment_count, 2);
    }
}
