//! Conversation types and the adapter that prepares a grounded dialogue
//! for vision-language inference.
//!
//! Placement is positional, not role-based: the first turn in history
//! carries the anchored frame (attached exactly once), the latest turn is
//! rewritten through the caption template, and everything in between passes
//! through unchanged. A single-message history is both first and last, so
//! it receives both treatments.

use crate::config::Prompts;
use crate::error::{Result, SiktError};
use crate::session::GroundingContext;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in a session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One turn of a model-ready conversation.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Frame image attached to this turn, if any.
    pub image: Option<PathBuf>,
}

/// A multi-turn structure ready for vision-language inference.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    pub turns: Vec<Turn>,
}

impl Conversation {
    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the conversation has no turns.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Build a model-ready conversation from session history and grounding.
///
/// When no caption was anchored the latest turn passes through unrewritten;
/// prefixing an empty transcript sentence would mislead the model.
pub fn build_lvlm_conversation(
    messages: &[Message],
    grounding: &GroundingContext,
    prompts: &Prompts,
) -> Result<Conversation> {
    if messages.is_empty() {
        return Err(SiktError::InvalidInput(
            "Conversation history must contain at least one message".to_string(),
        ));
    }

    let last = messages.len() - 1;
    let turns = messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            let content = if i == last {
                match &grounding.caption {
                    Some(caption) => prompts.render_grounding(caption, &message.content),
                    None => message.content.clone(),
                }
            } else {
                message.content.clone()
            };

            let image = if i == 0 {
                grounding.image_path.clone()
            } else {
                None
            };

            Turn {
                role: message.role,
                content,
                image,
            }
        })
        .collect();

    Ok(Conversation { turns })
}
