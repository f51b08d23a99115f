use anyhow::Result;
use async_trait::async_trait;

// =============================================================================
// Message Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

// =============================================================================
// Request Options
// =============================================================================

/// How the provider should shape the completion text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseMode {
    #[default]
    Text,
    /// Provider-enforced JSON object output (`response_format: json_object`).
    JsonObject,
}

#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub response_mode: ResponseMode,
}

impl ChatOptions {
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn json_object(mut self) -> Self {
        self.response_mode = ResponseMode::JsonObject;
        self
    }
}

// =============================================================================
// ChatAgent Trait
// =============================================================================

/// A chat-completion provider. Returns the text of the first choice.
#[async_trait]
pub trait ChatAgent: Send + Sync {
    async fn chat(&self, messages: Vec<Message>, options: ChatOptions) -> Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_builder_sets_fields() {
        let opts = ChatOptions::default()
            .temperature(0.1)
            .max_tokens(16)
            .json_object();
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(16));
        assert_eq!(opts.response_mode, ResponseMode::JsonObject);
    }

    #[test]
    fn default_mode_is_text() {
        assert_eq!(ChatOptions::default().response_mode, ResponseMode::Text);
    }
}
