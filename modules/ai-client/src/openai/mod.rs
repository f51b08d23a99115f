mod client;
pub(crate) mod types;

use crate::traits::{ChatAgent, ChatOptions, Message};
use anyhow::{anyhow, Result};
use async_trait::async_trait;

use client::{OpenAiClient, OPENAI_API_URL};

/// Groq's OpenAI-compatible endpoint.
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";
/// Perplexity's OpenAI-compatible endpoint (search-augmented models).
pub const PERPLEXITY_API_URL: &str = "https://api.perplexity.ai";

// =============================================================================
// OpenAi Agent
// =============================================================================

/// Chat agent for any provider speaking the OpenAI chat-completions protocol.
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            http: reqwest::Client::new(),
        }
    }

    /// Agent pointed at Groq.
    pub fn groq(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(api_key, model).with_base_url(GROQ_API_URL)
    }

    /// Agent pointed at Perplexity.
    pub fn perplexity(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(api_key, model).with_base_url(PERPLEXITY_API_URL)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    pub(crate) fn client(&self) -> OpenAiClient {
        let client = OpenAiClient::new(&self.api_key, self.http.clone());
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }
}

// =============================================================================
// ChatAgent Implementation
// =============================================================================

#[async_trait]
impl ChatAgent for OpenAi {
    async fn chat(&self, messages: Vec<Message>, options: ChatOptions) -> Result<String> {
        let mut request = types::ChatRequest::new(&self.model)
            .messages(messages.iter().map(types::WireMessage::from))
            .response_mode(options.response_mode);

        if let Some(temp) = options.temperature {
            if !self.model.starts_with("gpt-5") {
                request = request.temperature(temp);
            }
        }
        if let Some(limit) = options.max_tokens {
            request = request.token_limit(limit);
        }

        let response = self.client().chat(&request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("No response content from {}", self.base_url()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
