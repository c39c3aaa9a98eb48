//! Anthropic Messages API adapter.

use super::{ContentBlock, LanguageModel, LlmRequest, LlmResponse, Message, StopReason, ToolDefinition};
use crate::config::LlmSettings;
use crate::error::{KursError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Serialize)]
struct ToolChoice {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<StopReason>,
}

/// Chat model served by the Anthropic Messages API.
pub struct AnthropicModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicModel {
    /// Create a model client with an explicit key.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KursError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Create a model client from settings, reading the key from `api_key_env`.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
            KursError::Config(format!(
                "{} environment variable is not set",
                settings.api_key_env
            ))
        })?;

        Self::new(
            api_key,
            &settings.model,
            settings.base_url.as_deref(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn build_body<'a>(&'a self, request: &'a LlmRequest) -> MessagesRequest<'a> {
        let has_tools = !request.tools.is_empty();
        MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: &request.messages,
            tools: has_tools.then_some(request.tools.as_slice()),
            tool_choice: has_tools.then_some(ToolChoice { kind: "auto" }),
        }
    }
}

#[async_trait]
impl LanguageModel for AnthropicModel {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    #[instrument(skip(self, request), fields(model = %self.model, messages = request.messages.len()))]
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let body = self.build_body(request);
        let url = format!("{}/v1/messages", self.base_url);

        debug!("Sending request with {} tools", request.tools.len());

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| KursError::Llm(format!("Failed to send request to Anthropic: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(KursError::Llm(format!(
                "Anthropic API error ({}): {}",
                status, error_text
            )));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| KursError::Llm(format!("Failed to parse Anthropic response: {}", e)))?;

        let stop_reason = parsed.stop_reason.unwrap_or(StopReason::Unknown);
        info!("Received completion ({:?})", stop_reason);

        Ok(LlmResponse::new(parsed.content, stop_reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model() -> AnthropicModel {
        AnthropicModel::new("key", "claude-test", Some("http://localhost:1/"), Duration::from_secs(1))
            .unwrap()
    }

    fn request(tools: Vec<ToolDefinition>) -> LlmRequest {
        LlmRequest {
            system: "You answer questions.".to_string(),
            messages: vec![Message::user("What is RAG?")],
            tools,
            max_tokens: 800,
            temperature: 0.0,
        }
    }

    #[test]
    fn test_body_offers_tools_with_auto_choice() {
        let model = model();
        let request = request(vec![ToolDefinition {
            name: "get_course_outline".to_string(),
            description: "Outline".to_string(),
            input_schema: json!({"type": "object"}),
        }]);

        let body = serde_json::to_value(model.build_body(&request)).unwrap();
        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["max_tokens"], 800);
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["tool_choice"], json!({"type": "auto"}));
        assert_eq!(body["tools"][0]["name"], "get_course_outline");
        assert_eq!(body["messages"][0]["content"][0]["type"], "text");
    }

    #[test]
    fn test_body_without_tools_omits_tool_fields() {
        let model = model();
        let request = request(Vec::new());

        let body = serde_json::to_value(model.build_body(&request)).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
        assert_eq!(model.base_url, "http://localhost:1");
    }

    #[test]
    fn test_parse_response_with_null_stop_reason() {
        let parsed: MessagesResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "content": [{"type": "text", "text": "hi"}],
            "stop_reason": null
        }))
        .unwrap();
        assert!(parsed.stop_reason.is_none());
        assert_eq!(parsed.content.len(), 1);
    }
}
