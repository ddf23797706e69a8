//! Agent runner with a bounded tool calling loop.

use super::registry::ToolSession;
use super::tools::ToolSchema;
use crate::error::Result;
use crate::llm::{CompletionRequest, LlmBackend, ModelResponse, StopReason, ToolInvocationResult, Turn};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Default number of tool rounds per query.
pub const MAX_TOOL_ROUNDS: usize = 2;

/// Where the loop is for the current query.
enum State {
    AwaitingModel,
    ExecutingTools(ModelResponse),
    Done(String),
}

/// Agent that drives a model through at most `max_tool_rounds` tool rounds.
///
/// One call to [`Agent::generate`] owns its transcript and round counter, so a
/// single agent can serve concurrent queries as long as each brings its own
/// [`ToolSession`].
pub struct Agent {
    backend: Arc<dyn LlmBackend>,
    system_prompt: String,
    max_tool_rounds: usize,
}

impl Agent {
    /// Create an agent with an empty system prompt and the default round limit.
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            system_prompt: String::new(),
            max_tool_rounds: MAX_TOOL_ROUNDS,
        }
    }

    /// Set the static system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set the maximum number of tool rounds per query.
    pub fn with_max_tool_rounds(mut self, max: usize) -> Self {
        self.max_tool_rounds = max;
        self
    }

    /// Maximum number of tool rounds per query.
    pub fn max_tool_rounds(&self) -> usize {
        self.max_tool_rounds
    }

    /// System instruction for one query.
    fn system_for(&self, conversation_summary: Option<&str>) -> String {
        match conversation_summary {
            Some(summary) if !summary.is_empty() => format!(
                "{}\n\nPrevious conversation:\n{}",
                self.system_prompt, summary
            ),
            _ => self.system_prompt.clone(),
        }
    }

    /// Answer a query, executing requested tools through `tools`.
    ///
    /// Backend failures are returned as errors. Tool failures are fed back to
    /// the model as text and never abort the query.
    #[instrument(skip_all, fields(max_rounds = self.max_tool_rounds, tools = tools.is_some()))]
    pub async fn generate(
        &self,
        query: &str,
        conversation_summary: Option<&str>,
        mut tools: Option<&mut ToolSession<'_>>,
    ) -> Result<AgentResponse> {
        let system = self.system_for(conversation_summary);
        let schemas: Vec<ToolSchema> = tools.as_ref().map(|s| s.schemas()).unwrap_or_default();

        let mut turns = vec![Turn::user(query)];
        let mut rounds = 0;
        let mut llm_calls = 0;
        let mut tool_calls = Vec::new();
        let mut state = State::AwaitingModel;

        loop {
            state = match state {
                State::AwaitingModel => {
                    let offer_tools = tools.is_some() && rounds < self.max_tool_rounds;
                    let request = CompletionRequest {
                        system: &system,
                        turns: &turns,
                        tools: offer_tools.then_some(schemas.as_slice()),
                    };

                    llm_calls += 1;
                    debug!("Model call {} (round {}, tools offered: {})", llm_calls, rounds, offer_tools);
                    let response = self.backend.complete(&request).await?;

                    if response.stop_reason != StopReason::ToolRequested {
                        State::Done(response.first_text())
                    } else if tools.is_none() {
                        warn!("Model requested tools but no tools are available");
                        State::Done(response.first_text())
                    } else if !offer_tools {
                        warn!("Model requested tools after the round limit");
                        State::Done(response.first_text())
                    } else if response.tool_invocations().next().is_none() {
                        debug!("Tool request carried no invocations, treating as final");
                        State::Done(response.first_text())
                    } else {
                        State::ExecutingTools(response)
                    }
                }
                State::ExecutingTools(response) => {
                    let Some(session) = tools.as_deref_mut() else {
                        break Ok(self.finish(response.first_text(), rounds, llm_calls, tool_calls));
                    };

                    let mut results = Vec::new();
                    for invocation in response.tool_invocations() {
                        info!("Agent calling tool: {} ({})", invocation.name, invocation.id);
                        let content = session.execute(&invocation.name, &invocation.input).await;

                        tool_calls.push(ToolCallRecord {
                            name: invocation.name.clone(),
                            arguments: invocation.input.to_string(),
                            result: content.clone(),
                        });
                        results.push(ToolInvocationResult {
                            invocation_id: invocation.id.clone(),
                            content,
                        });
                    }

                    turns.push(Turn::assistant(response.content));
                    turns.push(Turn::tool_results(results));
                    rounds += 1;
                    State::AwaitingModel
                }
                State::Done(content) => {
                    break Ok(self.finish(content, rounds, llm_calls, tool_calls));
                }
            };
        }
    }

    fn finish(
        &self,
        content: String,
        rounds: usize,
        llm_calls: usize,
        tool_calls: Vec<ToolCallRecord>,
    ) -> AgentResponse {
        info!(
            "Agent finished after {} round(s), {} model call(s), {} tool call(s)",
            rounds,
            llm_calls,
            tool_calls.len()
        );
        AgentResponse {
            content,
            rounds,
            llm_calls,
            tool_calls,
        }
    }
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// The final response content from the agent.
    pub content: String,
    /// Number of rounds in which tools were executed.
    pub rounds: usize,
    /// Number of model calls made.
    pub llm_calls: usize,
    /// Record of all tool calls made during execution, in order.
    pub tool_calls: Vec<ToolCallRecord>,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tools::{ParamKind, ParamSpec, Source, Tool, ToolArgs, ToolOutput};
    use crate::agent::ToolRegistry;
    use crate::error::SyllabusError;
    use crate::llm::{ContentBlock, Role, ScriptedBackend, ToolInvocation};
    use async_trait::async_trait;
    use serde_json::json;

    /// Answers with its name and argument, citing the argument.
    struct LookupTool {
        name: &'static str,
    }

    #[async_trait]
    impl Tool for LookupTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema::new(self.name, "Look something up")
                .with_param(ParamSpec::required("q", ParamKind::String, "Lookup key"))
        }

        async fn execute(&self, args: &ToolArgs) -> ToolOutput {
            let q = args.str("q").unwrap_or_default();
            ToolOutput::with_sources(
                format!("{} result for {}", self.name, q),
                vec![Source {
                    text: format!("{}:{}", self.name, q),
                    link: None,
                }],
            )
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with_tool(Arc::new(LookupTool { name: "get_course_outline" }))
            .unwrap()
            .with_tool(Arc::new(LookupTool { name: "search_course_content" }))
            .unwrap()
    }

    fn call(id: &str, name: &str, q: &str) -> ToolInvocation {
        ToolInvocation {
            id: id.to_string(),
            name: name.to_string(),
            input: json!({ "q": q }),
        }
    }

    fn agent(backend: &Arc<ScriptedBackend>) -> Agent {
        Agent::new(backend.clone()).with_system_prompt("You answer course questions.")
    }

    #[test]
    fn test_tool_call_record_display() {
        let record = ToolCallRecord {
            name: "search".to_string(),
            arguments: r#"{"query": "test"}"#.to_string(),
            result: "Found results".to_string(),
        };
        assert_eq!(format!("{}", record), r#"search({"query": "test"})"#);
    }

    #[tokio::test]
    async fn test_no_tool_use_makes_one_call() {
        let backend = Arc::new(ScriptedBackend::new(vec![ModelResponse::text("Paris.")]));
        let registry = registry();
        let mut session = registry.session();

        let response = agent(&backend)
            .generate("Capital of France?", None, Some(&mut session))
            .await
            .unwrap();

        assert_eq!(response.content, "Paris.");
        assert_eq!(response.rounds, 0);
        assert_eq!(backend.call_count(), 1);

        let requests = backend.requests();
        assert_eq!(requests[0].system, "You answer course questions.");
        assert_eq!(requests[0].turns, vec![Turn::user("Capital of France?")]);
        assert_eq!(
            requests[0].tools,
            Some(vec!["get_course_outline".to_string(), "search_course_content".to_string()])
        );
        assert!(session.last_sources().is_empty());
    }

    #[tokio::test]
    async fn test_summary_is_appended_to_system_prompt() {
        let backend = Arc::new(ScriptedBackend::new(vec![ModelResponse::text("ok")]));

        agent(&backend)
            .generate("q", Some("User: hi\nAssistant: hello"), None)
            .await
            .unwrap();

        assert_eq!(
            backend.requests()[0].system,
            "You answer course questions.\n\nPrevious conversation:\nUser: hi\nAssistant: hello"
        );
        assert_eq!(backend.requests()[0].tools, None);
    }

    #[tokio::test]
    async fn test_two_round_scenario() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ModelResponse::tool_use(vec![call("call_1", "get_course_outline", "MCP")]),
            ModelResponse::tool_use(vec![call("call_2", "search_course_content", "lesson 4")]),
            ModelResponse::text("Lesson 4 covers servers."),
        ]));
        let registry = registry();
        let mut session = registry.session();

        let response = agent(&backend)
            .generate("What does lesson 4 of MCP cover?", None, Some(&mut session))
            .await
            .unwrap();

        assert_eq!(response.content, "Lesson 4 covers servers.");
        assert_eq!(backend.call_count(), 3);
        assert_eq!(response.llm_calls, 3);
        assert_eq!(response.rounds, 2);

        let names: Vec<_> = response.tool_calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["get_course_outline", "search_course_content"]);

        let requests = backend.requests();
        // Transcript grows by two turns per executed round
        assert_eq!(requests[0].turns.len(), 1);
        assert_eq!(requests[1].turns.len(), 3);
        assert_eq!(requests[2].turns.len(), 5);

        // Tools offered until the limit is reached, then withheld
        assert!(requests[0].tools.is_some());
        assert!(requests[1].tools.is_some());
        assert_eq!(requests[2].tools, None);

        // Most recent citations win
        assert_eq!(session.last_sources()[0].text, "search_course_content:lesson 4");
    }

    #[tokio::test]
    async fn test_round_limit_forces_text_answer() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ModelResponse::tool_use(vec![call("a", "search_course_content", "x")]),
            ModelResponse::text("Done with one round."),
        ]));
        let registry = registry();
        let mut session = registry.session();

        let response = agent(&backend)
            .with_max_tool_rounds(1)
            .generate("q", None, Some(&mut session))
            .await
            .unwrap();

        assert_eq!(response.content, "Done with one round.");
        assert_eq!(response.rounds, 1);
        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].tools, None);
    }

    #[tokio::test]
    async fn test_tool_request_after_limit_is_final() {
        // A model ignoring the withheld tools still terminates the query
        let backend = Arc::new(ScriptedBackend::new(vec![
            ModelResponse::tool_use(vec![call("a", "search_course_content", "x")]),
            ModelResponse::tool_use(vec![call("b", "search_course_content", "y")]),
            ModelResponse::tool_use(vec![call("c", "search_course_content", "z")]),
        ]));
        let registry = registry();
        let mut session = registry.session();

        let response = agent(&backend)
            .generate("q", None, Some(&mut session))
            .await
            .unwrap();

        assert_eq!(response.content, "");
        assert_eq!(response.rounds, MAX_TOOL_ROUNDS);
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_results_preserve_request_order() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ModelResponse::tool_use(vec![
                call("first", "search_course_content", "one"),
                call("second", "get_course_outline", "two"),
                call("third", "search_course_content", "three"),
            ]),
            ModelResponse::text("Combined."),
        ]));
        let registry = registry();
        let mut session = registry.session();

        agent(&backend)
            .generate("q", None, Some(&mut session))
            .await
            .unwrap();

        let requests = backend.requests();
        let transcript = &requests[1].turns;
        assert_eq!(transcript[1].role, Role::Assistant);
        assert_eq!(transcript[2].role, Role::Tool);

        let ids: Vec<_> = transcript[2]
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolResult(r) => Some((r.invocation_id.as_str(), r.content.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            ids,
            vec![
                ("first", "search_course_content result for one"),
                ("second", "get_course_outline result for two"),
                ("third", "search_course_content result for three"),
            ]
        );
    }

    #[tokio::test]
    async fn test_tool_failure_does_not_abort() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ModelResponse::tool_use(vec![
                call("a", "missing_tool", "x"),
                ToolInvocation {
                    id: "b".to_string(),
                    name: "search_course_content".to_string(),
                    input: json!({ "wrong": 1 }),
                },
            ]),
            ModelResponse::text("Nothing found."),
        ]));
        let registry = registry();
        let mut session = registry.session();

        let response = agent(&backend)
            .generate("q", None, Some(&mut session))
            .await
            .unwrap();

        assert_eq!(response.content, "Nothing found.");
        assert_eq!(response.tool_calls[0].result, "Tool 'missing_tool' not found");
        assert!(response.tool_calls[1].result.starts_with("Invalid arguments for tool"));
        assert!(session.last_sources().is_empty());
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let backend = Arc::new(
            ScriptedBackend::new(vec![ModelResponse::tool_use(vec![call(
                "a",
                "search_course_content",
                "x",
            )])])
            .then_fail("rate limited"),
        );
        let registry = registry();
        let mut session = registry.session();

        let err = agent(&backend)
            .generate("q", None, Some(&mut session))
            .await
            .unwrap_err();

        assert!(matches!(err, SyllabusError::Llm(msg) if msg == "rate limited"));
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_tool_request_without_registry_returns_text() {
        let mut response = ModelResponse::tool_use(vec![call("a", "search_course_content", "x")]);
        response.content.insert(0, ContentBlock::text("Let me check."));
        let backend = Arc::new(ScriptedBackend::new(vec![
            response,
            ModelResponse::tool_use(vec![call("b", "search_course_content", "y")]),
        ]));

        let first = agent(&backend).generate("q", None, None).await.unwrap();
        assert_eq!(first.content, "Let me check.");
        assert_eq!(first.rounds, 0);

        // Only a tool-use segment: empty answer
        let second = agent(&backend).generate("q", None, None).await.unwrap();
        assert_eq!(second.content, "");
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_tool_request_is_final() {
        let backend = Arc::new(ScriptedBackend::new(vec![ModelResponse {
            stop_reason: StopReason::ToolRequested,
            content: vec![ContentBlock::text("Here you go.")],
        }]));
        let registry = registry();
        let mut session = registry.session();

        let response = agent(&backend)
            .generate("q", None, Some(&mut session))
            .await
            .unwrap();

        assert_eq!(response.content, "Here you go.");
        assert_eq!(response.rounds, 0);
        assert_eq!(backend.call_count(), 1);
    }
}
