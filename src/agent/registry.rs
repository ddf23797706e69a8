//! Tool registry and per-query tool sessions.

use super::tools::{Source, Tool, ToolOutput, ToolSchema};
use crate::error::{Result, SyllabusError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Named set of tools offered to the model.
///
/// The registry itself is immutable once built and can be shared between
/// queries; citation state lives in a [`ToolSession`].
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its schema name.
    ///
    /// Registering a name twice replaces the earlier tool in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.schema().name;
        if name.trim().is_empty() {
            return Err(SyllabusError::Config(
                "Tool must have a name in its schema".to_string(),
            ));
        }

        match self.index.get(&name) {
            Some(&slot) => {
                warn!("Replacing previously registered tool '{}'", name);
                self.tools[slot] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
        Ok(())
    }

    /// Builder-style [`ToolRegistry::register`].
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Result<Self> {
        self.register(tool)?;
        Ok(self)
    }

    /// Schemas of all tools, in registration order.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema()).collect()
    }

    /// Names of all tools, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.schema().name).collect()
    }

    /// Check whether a tool is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check whether no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate arguments and execute a tool by name.
    ///
    /// Unknown tools and invalid arguments produce a descriptive output rather
    /// than an error, because the text is replayed to the model.
    pub async fn dispatch(&self, name: &str, raw_args: &Value) -> ToolOutput {
        let Some(tool) = self.index.get(name).map(|&slot| &self.tools[slot]) else {
            warn!("Model requested unknown tool '{}'", name);
            return ToolOutput::text(format!("Tool '{}' not found", name));
        };

        match tool.schema().validate(raw_args) {
            Ok(args) => tool.execute(&args).await,
            Err(message) => {
                debug!("Rejected arguments for '{}': {}", name, message);
                ToolOutput::text(message)
            }
        }
    }

    /// Open a citation scope for one query.
    pub fn session(&self) -> ToolSession<'_> {
        ToolSession {
            registry: self,
            last_sources: Vec::new(),
        }
    }
}

/// A registry view scoped to a single query.
///
/// Holds at most one generation of citations: the most recent non-empty list
/// produced by any tool during this query.
pub struct ToolSession<'r> {
    registry: &'r ToolRegistry,
    last_sources: Vec<Source>,
}

impl ToolSession<'_> {
    /// Schemas of the underlying registry.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.registry.schemas()
    }

    /// Execute a tool and record any citations it produced.
    pub async fn execute(&mut self, name: &str, raw_args: &Value) -> String {
        let output = self.registry.dispatch(name, raw_args).await;
        if !output.sources.is_empty() {
            self.last_sources = output.sources;
        }
        output.content
    }

    /// Citations from the most recent tool call that produced any.
    pub fn last_sources(&self) -> &[Source] {
        &self.last_sources
    }

    /// Drop all recorded citations.
    pub fn reset_sources(&mut self) {
        self.last_sources.clear();
    }

    /// Read the recorded citations and reset.
    pub fn take_sources(&mut self) -> Vec<Source> {
        std::mem::take(&mut self.last_sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tools::{ParamKind, ParamSpec, ToolArgs};
    use async_trait::async_trait;
    use serde_json::json;

    /// Echoes its argument and cites it.
    struct EchoTool {
        name: &'static str,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema::new(self.name, "Echo a word")
                .with_param(ParamSpec::required("word", ParamKind::String, "Word to echo"))
        }

        async fn execute(&self, args: &ToolArgs) -> ToolOutput {
            let word = args.str("word").unwrap_or_default();
            if word == "silent" {
                return ToolOutput::text("nothing to cite");
            }
            ToolOutput::with_sources(
                format!("{}: {}", self.name, word),
                vec![Source {
                    text: word.to_string(),
                    link: None,
                }],
            )
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with_tool(Arc::new(EchoTool { name: "echo" }))
            .unwrap()
            .with_tool(Arc::new(EchoTool { name: "shout" }))
            .unwrap()
    }

    #[test]
    fn test_register_requires_name() {
        let mut registry = ToolRegistry::new();
        let err = registry.register(Arc::new(EchoTool { name: "" })).unwrap_err();
        assert!(matches!(err, SyllabusError::Config(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_schemas_in_registration_order() {
        let registry = registry();
        assert_eq!(registry.names(), vec!["echo".to_string(), "shout".to_string()]);
        assert_eq!(registry.schemas().len(), 2);
        assert!(registry.contains("shout"));
    }

    #[test]
    fn test_reregistering_replaces_in_place() {
        let mut registry = registry();
        registry.register(Arc::new(EchoTool { name: "echo" })).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names()[0], "echo");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool_returns_message() {
        let output = registry().dispatch("missing", &json!({})).await;
        assert_eq!(output.content, "Tool 'missing' not found");
        assert!(output.sources.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_invalid_arguments_returns_message() {
        let output = registry().dispatch("echo", &json!({"word": 7})).await;
        assert!(output.content.contains("'word' must be a string"));
    }

    #[tokio::test]
    async fn test_session_keeps_most_recent_sources() {
        let registry = registry();
        let mut session = registry.session();

        assert_eq!(session.execute("echo", &json!({"word": "first"})).await, "echo: first");
        assert_eq!(session.execute("shout", &json!({"word": "second"})).await, "shout: second");
        assert_eq!(session.last_sources()[0].text, "second");

        // A call without citations leaves the previous generation in place
        session.execute("echo", &json!({"word": "silent"})).await;
        assert_eq!(session.last_sources().len(), 1);
        assert_eq!(session.last_sources()[0].text, "second");

        let taken = session.take_sources();
        assert_eq!(taken.len(), 1);
        assert!(session.last_sources().is_empty());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let registry = registry();
        let mut first = registry.session();
        first.execute("echo", &json!({"word": "a"})).await;

        let second = registry.session();
        assert!(second.last_sources().is_empty());

        first.reset_sources();
        assert!(first.last_sources().is_empty());
    }
}
