//! Vision-language inference.
//!
//! Two call shapes over one capability: a single `(prompt, image)` pair for
//! the grounding turn, and a full multi-turn conversation for follow-ups.

mod openai;

pub use openai::OpenAiLvlm;

use crate::conversation::Conversation;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for vision-language inference backends.
#[async_trait]
pub trait Lvlm: Send + Sync {
    /// Answer a single prompt grounded in one image.
    async fn infer(&self, prompt: &str, image: &Path) -> Result<String>;

    /// Answer the latest turn of a multi-turn conversation.
    async fn infer_conversation(&self, conversation: &Conversation) -> Result<String>;
}
