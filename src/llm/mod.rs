//! Conversation model and the LLM backend abstraction.
//!
//! A [`Turn`] is one role-tagged entry in the transcript sent to the model on
//! every round. Backends translate the transcript into their wire format and
//! report back a [`ModelResponse`].

pub mod mock;
mod openai;

pub use mock::{RecordedRequest, ScriptedBackend};
pub use openai::OpenAIBackend;

use crate::agent::ToolSchema;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Carrier role for tool results.
    Tool,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Invocation identifier assigned by the model.
    pub id: String,
    /// Name of the requested tool.
    pub name: String,
    /// Arguments as sent by the model.
    pub input: serde_json::Value,
}

/// The outcome of executing a [`ToolInvocation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    /// Identifier of the originating invocation.
    pub invocation_id: String,
    /// Tool output, or a human-readable error.
    pub content: String,
}

/// One segment of turn content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse(ToolInvocation),
    ToolResult(ToolInvocationResult),
}

impl ContentBlock {
    /// Create a text block.
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

/// A role-tagged unit of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Turn {
    /// A user turn with a single text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// An assistant turn carrying the model's content verbatim.
    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// A carrier turn holding tool results in invocation order.
    pub fn tool_results(results: Vec<ToolInvocationResult>) -> Self {
        Self {
            role: Role::Tool,
            content: results.into_iter().map(ContentBlock::ToolResult).collect(),
        }
    }

    /// Concatenated text of all text blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model wants one or more tools executed.
    ToolRequested,
    /// The model produced its final answer.
    Complete,
}

/// A model reply for one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub stop_reason: StopReason,
    pub content: Vec<ContentBlock>,
}

impl ModelResponse {
    /// A final text answer.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            stop_reason: StopReason::Complete,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// A response requesting the given tool invocations.
    pub fn tool_use(invocations: Vec<ToolInvocation>) -> Self {
        Self {
            stop_reason: StopReason::ToolRequested,
            content: invocations.into_iter().map(ContentBlock::ToolUse).collect(),
        }
    }

    /// First text segment of the content, or an empty string.
    pub fn first_text(&self) -> String {
        self.content
            .iter()
            .find_map(|b| match b {
                ContentBlock::Text { text } => Some(text.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Tool invocations in the order the model issued them.
    pub fn tool_invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.content.iter().filter_map(|b| match b {
            ContentBlock::ToolUse(call) => Some(call),
            _ => None,
        })
    }
}

/// Everything a backend needs for one model call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    /// System instruction.
    pub system: &'a str,
    /// Transcript so far.
    pub turns: &'a [Turn],
    /// Tools offered on this call; `None` forces a text answer.
    pub tools: Option<&'a [ToolSchema]>,
}

/// A chat model that may request tool invocations.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Run one model call. Failures are fatal for the query.
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<ModelResponse>;
}
