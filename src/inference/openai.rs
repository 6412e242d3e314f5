//! OpenAI vision-language inference implementation.

use super::Lvlm;
use crate::conversation::{Conversation, Role};
use crate::error::{Result, SiktError};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
    ImageUrlArgs,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::path::Path;
use tracing::{debug, instrument};

/// OpenAI-based vision-language model.
pub struct OpenAiLvlm {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiLvlm {
    /// Create a new vision-language client.
    pub fn new(model: &str, temperature: f32) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            temperature,
        }
    }

    /// Build the user content parts for a text + image turn.
    fn image_turn_parts(
        text: &str,
        image: &Path,
    ) -> Result<Vec<ChatCompletionRequestUserMessageContentPart>> {
        let text_part = ChatCompletionRequestMessageContentPartTextArgs::default()
            .text(text)
            .build()
            .map_err(|e| SiktError::Inference(e.to_string()))?;

        let image_part = ChatCompletionRequestMessageContentPartImageArgs::default()
            .image_url(
                ImageUrlArgs::default()
                    .url(encode_image_data_url(image)?)
                    .detail(ImageDetail::Auto)
                    .build()
                    .map_err(|e| SiktError::Inference(e.to_string()))?,
            )
            .build()
            .map_err(|e| SiktError::Inference(e.to_string()))?;

        Ok(vec![text_part.into(), image_part.into()])
    }

    async fn complete(&self, messages: Vec<ChatCompletionRequestMessage>) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| SiktError::Inference(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| SiktError::OpenAI(format!("Vision-language API error: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| SiktError::Inference("Empty response from model".to_string()))
    }
}

#[async_trait::async_trait]
impl Lvlm for OpenAiLvlm {
    #[instrument(skip(self, prompt), fields(image = %image.display()))]
    async fn infer(&self, prompt: &str, image: &Path) -> Result<String> {
        let user_message = ChatCompletionRequestUserMessageArgs::default()
            .content(Self::image_turn_parts(prompt, image)?)
            .build()
            .map_err(|e| SiktError::Inference(e.to_string()))?;

        self.complete(vec![user_message.into()]).await
    }

    #[instrument(skip(self, conversation), fields(turns = conversation.len()))]
    async fn infer_conversation(&self, conversation: &Conversation) -> Result<String> {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(conversation.len());

        for turn in &conversation.turns {
            let message: ChatCompletionRequestMessage = match turn.role {
                Role::User => {
                    let mut builder = ChatCompletionRequestUserMessageArgs::default();
                    match &turn.image {
                        Some(image) => {
                            builder.content(Self::image_turn_parts(&turn.content, image)?)
                        }
                        None => builder.content(turn.content.as_str()),
                    };
                    builder
                        .build()
                        .map_err(|e| SiktError::Inference(e.to_string()))?
                        .into()
                }
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.content.as_str())
                    .build()
                    .map_err(|e| SiktError::Inference(e.to_string()))?
                    .into(),
            };
            messages.push(message);
        }

        debug!("Sending {} conversation turns", messages.len());
        self.complete(messages).await
    }
}

/// Read an image file and encode it as a base64 data URL.
fn encode_image_data_url(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| SiktError::Inference(format!("Cannot read image {:?}: {}", path, e)))?;

    let mime = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    };

    Ok(format!("data:{};base64,{}", mime, BASE64.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_encode_image_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&[0x89, 0x50, 0x4E, 0x47]).unwrap();

        let url = encode_image_data_url(&path).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_unknown_extension_defaults_to_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.bin");
        std::fs::write(&path, b"data").unwrap();

        let url = encode_image_data_url(&path).unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_missing_image_is_an_inference_error() {
        let result = encode_image_data_url(Path::new("/nonexistent/frame.jpg"));
        assert!(matches!(result, Err(SiktError::Inference(_))));
    }
}
