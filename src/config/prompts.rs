//! Prompt templates for Sikt.
//!
//! Prompts can be customized by placing TOML files in the custom prompts
//! directory. The grounding template is the two-slot string used both when
//! building the first retrieval-augmented prompt and when rewriting the
//! latest turn of a grounded conversation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub grounding: GroundingPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for grounded question answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundingPrompts {
    /// Two-slot template joining a segment transcript with the user query.
    pub user: String,
}

impl Default for GroundingPrompts {
    fn default() -> Self {
        Self {
            user: "The transcript associated with the image is '{{transcript}}'. {{query}}"
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let grounding_path = custom_path.join("grounding.toml");
            if grounding_path.exists() {
                let content = std::fs::read_to_string(&grounding_path)?;
                prompts.grounding = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render the grounding template over a transcript and user query.
    pub fn render_grounding(&self, transcript: &str, query: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("transcript".to_string(), transcript.to_string());
        vars.insert("query".to_string(), query.to_string());
        self.render_with_custom(&self.grounding.user, &vars)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grounding_template() {
        let prompts = Prompts::default();
        let rendered = prompts.render_grounding(
            "Astronauts aboard the ISS",
            "What is the name of one of the astronauts?",
        );
        assert_eq!(
            rendered,
            "The transcript associated with the image is 'Astronauts aboard the ISS'. \
             What is the name of one of the astronauts?"
        );
    }

    #[test]
    fn test_render_template() {
        let template = "Transcript: {{transcript}}. Query: {{query}}.";
        let mut vars = HashMap::new();
        vars.insert("transcript".to_string(), "hello".to_string());
        vars.insert("query".to_string(), "what?".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Transcript: hello. Query: what?.");
    }

    #[test]
    fn test_empty_transcript_slot_renders_empty() {
        let prompts = Prompts::default();
        let rendered = prompts.render_grounding("", "What happens next?");
        assert_eq!(
            rendered,
            "The transcript associated with the image is ''. What happens next?"
        );
    }
}
