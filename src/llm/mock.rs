//! Scripted backend for exercising the agent without network access.

use super::{CompletionRequest, LlmBackend, ModelResponse, Turn};
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Snapshot of one call made against a [`ScriptedBackend`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system: String,
    pub turns: Vec<Turn>,
    /// Names of the offered tools, `None` when no tools were offered.
    pub tools: Option<Vec<String>>,
}

/// Replays pre-configured responses in order and records every request.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<ModelResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedBackend {
    /// Create a backend that answers with the given responses in order.
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a failure as the next unanswered call.
    pub fn then_fail(self, message: &str) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(SyllabusError::Llm(message.to_string())));
        }
        self
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<ModelResponse> {
        let recorded = RecordedRequest {
            system: request.system.to_string(),
            turns: request.turns.to_vec(),
            tools: request
                .tools
                .map(|tools| tools.iter().map(|t| t.name.clone()).collect()),
        };
        self.requests
            .lock()
            .map_err(|e| SyllabusError::Llm(e.to_string()))?
            .push(recorded);

        let next = self
            .script
            .lock()
            .map_err(|e| SyllabusError::Llm(e.to_string()))?
            .pop_front();

        next.unwrap_or_else(|| Err(SyllabusError::Llm("Scripted backend exhausted".to_string())))
    }
}
