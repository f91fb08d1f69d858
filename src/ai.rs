use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::AppError;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-6";

// --- Provider trait ---

pub trait AIProvider {
    fn send(&self, request: &MessageRequest) -> Result<MessageResponse>;
    fn model_name(&self) -> &str;
}

/// Maps a short alias to a full model id. Full `claude-*` ids pass through.
pub fn resolve_model(name: &str) -> Result<String> {
    match name {
        "sonnet" => Ok(DEFAULT_MODEL.to_string()),
        "opus" => Ok("claude-opus-4-6".to_string()),
        "haiku" => Ok("claude-haiku-4-5-20251001".to_string()),
        id if id.starts_with("claude-") => Ok(id.to_string()),
        _ => Err(AppError::Validation(format!(
            "Unknown model '{}'. Use sonnet (default), opus, haiku, or a full claude-* model id",
            name
        ))
        .into()),
    }
}

// --- Messages API wire types ---

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_uses: Option<u32>,
}

impl Tool {
    pub fn web_search(max_uses: u32) -> Self {
        Self {
            tool_type: "web_search_20250305".to_string(),
            name: "web_search".to_string(),
            max_uses: Some(max_uses),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    pub messages: Vec<Message>,
}

impl MessageRequest {
    pub fn user(model: &str, prompt: &str, max_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            max_tokens,
            tools: Vec::new(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        }
    }

    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }
}

/// One block of a response. Web-search responses interleave tool records
/// with text; only `Text` carries prose meant for the user.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ServerToolUse {
        name: String,
    },
    WebSearchToolResult {
        tool_use_id: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub content: Vec<ContentBlock>,
}

impl MessageResponse {
    /// Text blocks in response order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }
}

// --- Anthropic provider ---

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug)]
pub struct AnthropicProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, model_id: String) -> Self {
        let client = reqwest::blocking::Client::new();
        Self {
            api_key: api_key.to_string(),
            model_id,
            client,
        }
    }

    /// Builds a provider from config. Fails before any network traffic when
    /// the credential is missing.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?;
        let model_id = resolve_model(&config.model)?;
        Ok(Self::new(api_key, model_id))
    }
}

impl AIProvider for AnthropicProvider {
    fn send(&self, request: &MessageRequest) -> Result<MessageResponse> {
        info!(
            model = %request.model,
            max_tokens = request.max_tokens,
            tools = request.tools.len(),
            "sending LLM request"
        );

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .map_err(|e| AppError::Upstream(format!("Failed to send request to Anthropic API: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Anthropic API request failed with status {}: {}",
                status, error_text
            ))
            .into());
        }

        let api_response: MessageResponse = response
            .json()
            .map_err(|e| AppError::Upstream(format!("Failed to parse Anthropic API response: {}", e)))?;
        debug!(blocks = api_response.content.len(), "LLM response received");
        Ok(api_response)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Standalone helpers ---

/// Sends a single user prompt and returns the first text block.
pub fn complete(provider: &dyn AIProvider, prompt: &str, max_tokens: u32) -> Result<String> {
    debug!(prompt_chars = prompt.len(), "completing prompt");
    let request = MessageRequest::user(provider.model_name(), prompt, max_tokens);
    let response = provider
        .send(&request)
        .context("LLM completion failed")?;
    response
        .texts()
        .next()
        .map(str::to_string)
        .ok_or_else(|| anyhow!(AppError::Upstream("No text content in LLM response".to_string())))
}
