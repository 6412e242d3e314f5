//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! For large corpora, consider the sqlite-vec extension or a dedicated
//! vector database.

use super::{cosine_similarity, IndexedVideo, SearchResult, SegmentDocument, VectorStore};
use crate::error::{Result, SiktError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS segments (
    id TEXT PRIMARY KEY,
    video_id TEXT NOT NULL,
    video_title TEXT NOT NULL,
    content TEXT NOT NULL,
    transcript TEXT,
    frame_path TEXT NOT NULL,
    video_path TEXT,
    mid_time_ms INTEGER,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_segments_video_id ON segments(video_id);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Create a new SQLite vector store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_document(row: &Row<'_>) -> rusqlite::Result<SegmentDocument> {
        let id_str: String = row.get(0)?;
        let embedding_bytes: Vec<u8> = row.get(8)?;
        let indexed_at_str: String = row.get(9)?;

        Ok(SegmentDocument {
            id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
            video_id: row.get(1)?,
            video_title: row.get(2)?,
            content: row.get(3)?,
            transcript: row.get(4)?,
            frame_path: row.get(5)?,
            video_path: row.get(6)?,
            mid_time_ms: row.get(7)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, doc))]
    async fn upsert(&self, doc: &SegmentDocument) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO segments
            (id, video_id, video_title, content, transcript, frame_path,
             video_path, mid_time_ms, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                doc.id.to_string(),
                doc.video_id,
                doc.video_title,
                doc.content,
                doc.transcript,
                doc.frame_path,
                doc.video_path,
                doc.mid_time_ms,
                Self::embedding_to_bytes(&doc.embedding),
                doc.indexed_at.to_rfc3339(),
            ],
        )?;

        debug!("Upserted segment {}", doc.id);
        Ok(())
    }

    #[instrument(skip(self, docs))]
    async fn upsert_batch(&self, docs: &[SegmentDocument]) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let tx = conn.unchecked_transaction()?;

        for doc in docs {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO segments
                (id, video_id, video_title, content, transcript, frame_path,
                 video_path, mid_time_ms, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    doc.id.to_string(),
                    doc.video_id,
                    doc.video_title,
                    doc.content,
                    doc.transcript,
                    doc.frame_path,
                    doc.video_path,
                    doc.mid_time_ms,
                    Self::embedding_to_bytes(&doc.embedding),
                    doc.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} segments", docs.len());
        Ok(docs.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, video_id, video_title, content, transcript, frame_path,
                   video_path, mid_time_ms, embedding, indexed_at
            FROM segments
            "#,
        )?;

        let docs = stmt.query_map([], Self::row_to_document)?;

        let mut results: Vec<SearchResult> = docs
            .filter_map(|doc_result| doc_result.ok())
            .map(|doc| {
                let score = cosine_similarity(query_embedding, &doc.embedding);
                SearchResult { document: doc, score }
            })
            .collect();

        // Sort by score descending
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        debug!("Found {} matching segments", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn delete_by_video_id(&self, video_id: &str) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let deleted = conn.execute("DELETE FROM segments WHERE video_id = ?1", params![video_id])?;

        info!("Deleted {} segments for video {}", deleted, video_id);
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn list_videos(&self) -> Result<Vec<IndexedVideo>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let mut stmt = conn.prepare(
            r#"
            SELECT video_id, video_title, COUNT(*) as segment_count,
                   MAX(indexed_at) as indexed_at
            FROM segments
            GROUP BY video_id
            ORDER BY indexed_at DESC
            "#,
        )?;

        let videos = stmt.query_map([], |row| {
            let indexed_at_str: String = row.get(3)?;
            Ok(IndexedVideo {
                video_id: row.get(0)?,
                video_title: row.get(1)?,
                segment_count: row.get(2)?,
                indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let result: Vec<IndexedVideo> = videos.filter_map(|v| v.ok()).collect();
        Ok(result)
    }

    async fn document_count(&self) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM segments", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory().unwrap();

        let doc = SegmentDocument::new(
            "video1".to_string(),
            "Moon Landing".to_string(),
            "One small step".to_string(),
            Some("One small step".to_string()),
            "/frames/video1_0.jpg".to_string(),
            Some("/videos/video1.mp4".to_string()),
            Some(125_000),
            vec![1.0, 0.0, 0.0],
        );

        store.upsert(&doc).await.unwrap();

        let videos = store.list_videos().await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].video_id, "video1");

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[0].document.transcript.as_deref(), Some("One small step"));
        assert_eq!(results[0].document.mid_time_ms, Some(125_000));

        let deleted = store.delete_by_video_id("video1").await.unwrap();
        assert_eq!(deleted, 1);

        let videos = store.list_videos().await.unwrap();
        assert!(videos.is_empty());
    }

    #[tokio::test]
    async fn test_optional_fields_roundtrip() {
        let store = SqliteVectorStore::in_memory().unwrap();

        let doc = SegmentDocument::new(
            "video2".to_string(),
            "Silent Film".to_string(),
            "A train arrives".to_string(),
            None,
            "/frames/video2_0.jpg".to_string(),
            None,
            None,
            vec![0.5, 0.5],
        );

        store.upsert(&doc).await.unwrap();

        let results = store.search(&[0.5, 0.5], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].document.transcript.is_none());
        assert!(results[0].document.video_path.is_none());
        assert!(results[0].document.mid_time_ms.is_none());
    }
}
