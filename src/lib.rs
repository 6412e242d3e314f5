//! Sikt - Chat with your video corpus
//!
//! A local-first CLI for conversational question answering over indexed
//! video segments.
//!
//! The name "Sikt" comes from the Norwegian word for "sight."
//!
//! # Overview
//!
//! Sikt allows you to:
//! - Load a pre-indexed corpus of video segments (frames + transcripts)
//! - Ask questions and get answers grounded in the best-matching segment
//! - Keep asking follow-up questions about the same segment
//! - Get a short playable clip of the moment an answer refers to
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt template management
//! - `embedding` - Query embedding generation
//! - `vector_store` - Segment index abstraction
//! - `retrieval` - Retrieval contract over embedder + store
//! - `inference` - Vision-language inference
//! - `chain` - Retrieval-augmented inference chain
//! - `clip` - Video segment extraction
//! - `conversation` - Dialogue-to-prompt adaptation
//! - `session` - Conversational session state machine
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sikt::chain::RagChain;
//! use sikt::config::{Prompts, Settings};
//! use sikt::embedding::OpenAIEmbedder;
//! use sikt::inference::OpenAiLvlm;
//! use sikt::retrieval::VectorRetriever;
//! use sikt::session::ChatSession;
//! use sikt::vector_store::SqliteVectorStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let prompts = Prompts::default();
//!
//!     let store = Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?);
//!     let embedder = Arc::new(OpenAIEmbedder::new());
//!     let retriever = Arc::new(VectorRetriever::new(store, embedder));
//!     let lvlm = Arc::new(OpenAiLvlm::new("gpt-4o-mini", 0.7));
//!
//!     let chain = RagChain::new(retriever, lvlm.clone(), prompts.clone());
//!     let mut session = ChatSession::new(chain, lvlm, prompts, &settings);
//!
//!     let answer = session.submit_query("What is the name of one of the astronauts?").await?;
//!     println!("{}", answer);
//!
//!     Ok(())
//! }
//! ```

pub mod chain;
pub mod cli;
pub mod clip;
pub mod config;
pub mod conversation;
pub mod embedding;
pub mod error;
pub mod inference;
pub mod openai;
pub mod retrieval;
pub mod session;
pub mod vector_store;

pub use error::{Result, SiktError};
