//! OpenAI chat completions adapter.
//!
//! Tool calls are mapped onto tool-use blocks and tool-result blocks onto
//! `tool` role messages, so the engine sees one message model for every
//! provider.

use super::{
    ContentBlock, LanguageModel, LlmRequest, LlmResponse, Message, Role, StopReason,
    ToolDefinition,
};
use crate::config::LlmSettings;
use crate::error::{KursError, Result};
use crate::openai::create_client_with_options;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FinishReason, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Chat model served by the OpenAI chat completions API.
pub struct OpenAIModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl OpenAIModel {
    /// Create a model client from settings.
    ///
    /// The key comes from `api_key_env` when that variable is set, otherwise
    /// from `OPENAI_API_KEY`.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).ok();
        let client = create_client_with_options(
            api_key.as_deref(),
            settings.base_url.as_deref(),
            Duration::from_secs(settings.timeout_secs),
        )?;

        Ok(Self {
            client,
            model: settings.model.clone(),
        })
    }
}

fn build_error(e: impl std::fmt::Display) -> KursError {
    KursError::Llm(format!("Failed to build chat request: {}", e))
}

fn to_openai_tools(tools: &[ToolDefinition]) -> Vec<ChatCompletionTool> {
    tools
        .iter()
        .map(|tool| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                parameters: Some(tool.input_schema.clone()),
                strict: None,
            },
        })
        .collect()
}

fn to_openai_messages(request: &LlmRequest) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(request.system.clone())
            .build()
            .map_err(build_error)?
            .into(),
    ];

    for message in &request.messages {
        messages.extend(convert_message(message)?);
    }

    Ok(messages)
}

fn convert_message(message: &Message) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut out = Vec::new();
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for block in &message.content {
        match block {
            ContentBlock::Text { text: t } => text.push_str(t),
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ChatCompletionMessageToolCall {
                    id: id.clone(),
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionCall {
                        name: name.clone(),
                        arguments: input.to_string(),
                    },
                });
            }
            ContentBlock::ToolResult {
                tool_use_id,
                content,
            } => {
                out.push(
                    ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(tool_use_id.as_str())
                        .content(content.clone())
                        .build()
                        .map_err(build_error)?
                        .into(),
                );
            }
        }
    }

    match message.role {
        Role::User => {
            if !text.is_empty() {
                out.push(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(text)
                        .build()
                        .map_err(build_error)?
                        .into(),
                );
            }
        }
        Role::Assistant => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if !text.is_empty() {
                args.content(text);
            }
            if !tool_calls.is_empty() {
                args.tool_calls(tool_calls);
            }
            out.push(args.build().map_err(build_error)?.into());
        }
    }

    Ok(out)
}

fn from_openai_message(
    content: Option<String>,
    tool_calls: Option<Vec<ChatCompletionMessageToolCall>>,
    finish_reason: Option<FinishReason>,
) -> LlmResponse {
    let mut blocks = Vec::new();

    if let Some(text) = content.filter(|t| !t.is_empty()) {
        blocks.push(ContentBlock::text(text));
    }

    for call in tool_calls.unwrap_or_default() {
        let input = serde_json::from_str(&call.function.arguments).unwrap_or_else(|e| {
            warn!("Tool call {} has invalid JSON arguments: {}", call.id, e);
            Value::String(call.function.arguments.clone())
        });
        blocks.push(ContentBlock::tool_use(call.id, call.function.name, input));
    }

    let stop_reason = match finish_reason {
        Some(FinishReason::Stop) => StopReason::EndTurn,
        Some(FinishReason::ToolCalls) | Some(FinishReason::FunctionCall) => StopReason::ToolUse,
        Some(FinishReason::Length) => StopReason::MaxTokens,
        _ => StopReason::Unknown,
    };

    LlmResponse::new(blocks, stop_reason)
}

#[async_trait]
impl LanguageModel for OpenAIModel {
    fn provider_name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %self.model, messages = request.messages.len()))]
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(to_openai_messages(request)?)
            .max_completion_tokens(request.max_tokens)
            .temperature(request.temperature);

        if !request.tools.is_empty() {
            args.tools(to_openai_tools(&request.tools))
                .tool_choice(ChatCompletionToolChoiceOption::Auto);
        }

        let chat_request = args.build().map_err(build_error)?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| KursError::OpenAI(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| KursError::Llm("No response from model".to_string()))?;

        debug!("Finish reason: {:?}", choice.finish_reason);

        Ok(from_openai_message(
            choice.message.content,
            choice.message.tool_calls,
            choice.finish_reason,
        ))
    }
}
