//! Configuration module for Sikt.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{GroundingPrompts, Prompts};
pub use settings::{
    ChatSettings, ClipSettings, EmbeddingSettings, GeneralSettings, InferenceSettings,
    PromptSettings, Settings, VectorStoreSettings,
};
