//! Configuration settings for Sikt.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub inference: InferenceSettings,
    pub clip: ClipSettings,
    pub chat: ChatSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.sikt".to_string(),
            temp_dir: "/tmp/sikt".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Embedding generation settings (query-side; the index carries
/// precomputed vectors from the same model).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions. Must match the indexed vectors.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.sikt/segments.db".to_string(),
        }
    }
}

/// Vision-language inference settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceSettings {
    /// Vision-language model for grounded answers.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
        }
    }
}

/// Video clip extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipSettings {
    /// Directory where extracted clips are written.
    pub output_dir: String,
    /// Default output file name. Callers needing uniqueness vary this.
    pub output_name: String,
    /// Seconds of video to keep before the segment timestamp.
    pub lead_seconds: f64,
    /// Seconds of video to keep after the segment timestamp.
    pub trail_seconds: f64,
}

impl Default for ClipSettings {
    fn default() -> Self {
        Self {
            output_dir: "~/.sikt/clips".to_string(),
            output_name: "video_tmp.mp4".to_string(),
            lead_seconds: 3.0,
            trail_seconds: 3.0,
        }
    }
}

/// Chat surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Sample queries offered to the user at session start.
    pub sample_queries: Vec<String>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            sample_queries: vec![
                "What is the name of one of the astronauts?".to_string(),
                "An astronaut's spacewalk".to_string(),
                "What does the astronaut say?".to_string(),
            ],
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SiktError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sikt")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    /// Get the expanded clip output directory.
    pub fn clip_output_dir(&self) -> PathBuf {
        Self::expand_path(&self.clip.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.embedding.dimensions, 1536);
        assert_eq!(settings.clip.lead_seconds, 3.0);
        assert_eq!(settings.clip.trail_seconds, 3.0);
        assert_eq!(settings.chat.sample_queries.len(), 3);
    }

    #[test]
    fn test_settings_roundtrip() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.clip.output_name, settings.clip.output_name);
        assert_eq!(parsed.inference.model, settings.inference.model);
    }
}
