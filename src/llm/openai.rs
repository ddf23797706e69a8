//! OpenAI chat-completions backend.

use super::{CompletionRequest, ContentBlock, LlmBackend, ModelResponse, Role, StopReason, ToolInvocation, Turn};
use crate::agent::ToolSchema;
use crate::config::LlmSettings;
use crate::error::{Result, SyllabusError};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
    ChatCompletionToolChoiceOption, ChatCompletionToolType, CreateChatCompletionRequestArgs,
    FinishReason, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// LLM backend backed by the OpenAI chat completions API.
pub struct OpenAIBackend {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIBackend {
    /// Create a backend for the given model with deterministic sampling.
    pub fn new(model: &str) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            temperature: 0.0,
            max_tokens: 800,
        })
    }

    /// Create a backend from LLM settings.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        Ok(Self::new(&settings.model)?
            .with_temperature(settings.temperature)
            .with_max_tokens(settings.max_tokens))
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the completion token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Model name used for requests.
    pub fn model(&self) -> &str {
        &self.model
    }
}

fn build_err(e: impl std::fmt::Display) -> SyllabusError {
    SyllabusError::Llm(e.to_string())
}

/// Convert the system instruction and transcript into chat messages.
fn to_messages(system: &str, turns: &[Turn]) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system.to_string())
            .build()
            .map_err(build_err)?
            .into(),
    ];

    for turn in turns {
        match turn.role {
            Role::User => {
                messages.push(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(turn.text())
                        .build()
                        .map_err(build_err)?
                        .into(),
                );
            }
            Role::Assistant => {
                let tool_calls: Vec<ChatCompletionMessageToolCall> = turn
                    .content
                    .iter()
                    .filter_map(|b| match b {
                        ContentBlock::ToolUse(call) => Some(ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: call.input.to_string(),
                            },
                        }),
                        _ => None,
                    })
                    .collect();

                let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                let text = turn.text();
                if !text.is_empty() {
                    args.content(text);
                }
                if !tool_calls.is_empty() {
                    args.tool_calls(tool_calls);
                }
                messages.push(args.build().map_err(build_err)?.into());
            }
            Role::Tool => {
                // One tool message per result, in invocation order
                for block in &turn.content {
                    if let ContentBlock::ToolResult(result) = block {
                        messages.push(
                            ChatCompletionRequestToolMessageArgs::default()
                                .tool_call_id(result.invocation_id.clone())
                                .content(result.content.clone())
                                .build()
                                .map_err(build_err)?
                                .into(),
                        );
                    }
                }
            }
        }
    }

    Ok(messages)
}

/// Convert tool schemas into OpenAI function tools.
fn to_tools(schemas: &[ToolSchema]) -> Vec<ChatCompletionTool> {
    schemas
        .iter()
        .map(|schema| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: schema.name.clone(),
                description: Some(schema.description.clone()),
                parameters: Some(schema.input_schema()),
                strict: None,
            },
        })
        .collect()
}

/// Parse tool-call arguments, keeping malformed JSON as a string value.
fn parse_arguments(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

#[async_trait]
impl LlmBackend for OpenAIBackend {
    #[instrument(skip(self, request), fields(model = %self.model, turns = request.turns.len()))]
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<ModelResponse> {
        let messages = to_messages(request.system, request.turns)?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens);

        if let Some(schemas) = request.tools {
            if !schemas.is_empty() {
                args.tools(to_tools(schemas))
                    .tool_choice(ChatCompletionToolChoiceOption::Auto);
            }
        }

        let chat_request = args.build().map_err(build_err)?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| SyllabusError::OpenAI(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SyllabusError::Llm("No response from model".to_string()))?;

        let mut content = Vec::new();
        if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
            content.push(ContentBlock::text(text));
        }

        let tool_calls = choice.message.tool_calls.unwrap_or_default();
        let wants_tools =
            !tool_calls.is_empty() || choice.finish_reason == Some(FinishReason::ToolCalls);

        content.extend(tool_calls.into_iter().map(|call| {
            ContentBlock::ToolUse(ToolInvocation {
                id: call.id,
                input: parse_arguments(&call.function.arguments),
                name: call.function.name,
            })
        }));

        debug!("Model returned {} content blocks (tools requested: {})", content.len(), wants_tools);

        Ok(ModelResponse {
            stop_reason: if wants_tools {
                StopReason::ToolRequested
            } else {
                StopReason::Complete
            },
            content,
        })
    }
}
