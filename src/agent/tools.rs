//! Tool abstraction: typed schemas, validated arguments and tool output.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
}

impl ParamKind {
    fn json_type(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
        }
    }
}

/// Declaration of a single tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    pub required: bool,
}

impl ParamSpec {
    /// A parameter the model must always supply.
    pub fn required(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required: true,
        }
    }

    /// A parameter the model may omit.
    pub fn optional(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// Machine-readable description of a tool offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ToolSchema {
    /// Create a schema with no parameters.
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params: Vec::new(),
        }
    }

    /// Add a parameter.
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Render the parameters as a JSON Schema object.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.kind.json_type(),
                    "description": param.description,
                }),
            );
        }

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Validate raw model arguments against this schema.
    ///
    /// The error string is meant to be shown to the model as the tool result.
    pub fn validate(&self, raw: &Value) -> Result<ToolArgs, String> {
        let object = match raw {
            Value::Object(map) => map,
            Value::Null if self.params.iter().all(|p| !p.required) => {
                return Ok(ToolArgs::default());
            }
            other => {
                return Err(format!(
                    "Invalid arguments for tool '{}': expected a JSON object, got {}",
                    self.name, other
                ))
            }
        };

        if let Some(unknown) = object.keys().find(|k| !self.params.iter().any(|p| &p.name == *k)) {
            return Err(format!(
                "Invalid arguments for tool '{}': unknown argument '{}'",
                self.name, unknown
            ));
        }

        let mut values = BTreeMap::new();
        for param in &self.params {
            match object.get(&param.name) {
                None | Some(Value::Null) => {
                    if param.required {
                        return Err(format!(
                            "Invalid arguments for tool '{}': missing required argument '{}'",
                            self.name, param.name
                        ));
                    }
                }
                Some(value) => {
                    let parsed = ArgValue::parse(param.kind, value).ok_or_else(|| {
                        format!(
                            "Invalid arguments for tool '{}': '{}' must be {} {}, got {}",
                            self.name,
                            param.name,
                            if param.kind == ParamKind::Integer { "an" } else { "a" },
                            param.kind.json_type(),
                            value
                        )
                    })?;
                    values.insert(param.name.clone(), parsed);
                }
            }
        }

        Ok(ToolArgs { values })
    }
}

/// A validated argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Str(String),
    Int(i64),
}

impl ArgValue {
    fn parse(kind: ParamKind, value: &Value) -> Option<Self> {
        match kind {
            ParamKind::String => value.as_str().map(|s| ArgValue::Str(s.to_string())),
            ParamKind::Integer => value.as_i64().map(ArgValue::Int),
        }
    }
}

/// Arguments that passed schema validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    values: BTreeMap<String, ArgValue>,
}

impl ToolArgs {
    /// Get a string argument.
    pub fn str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get an integer argument.
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ArgValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// Get a non-negative integer argument that fits in `u32`.
    ///
    /// Returns `Err` with a model-facing message when the value is out of range.
    pub fn u32(&self, name: &str) -> Result<Option<u32>, String> {
        match self.int(name) {
            None => Ok(None),
            Some(n) => u32::try_from(n)
                .map(Some)
                .map_err(|_| format!("'{}' must be a non-negative integer, got {}", name, n)),
        }
    }
}

/// A citation for material used in an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Display text, e.g. `Testing 101 - Lesson 1`.
    pub text: String,
    /// Link to the cited material, if known.
    pub link: Option<String>,
}

/// What a tool execution produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    /// Text fed back to the model.
    pub content: String,
    /// Citations produced as a side channel; never sent to the model.
    pub sources: Vec<Source>,
}

impl ToolOutput {
    /// Output with no citations.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sources: Vec::new(),
        }
    }

    /// Output with citations.
    pub fn with_sources(content: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            content: content.into(),
            sources,
        }
    }
}

/// A capability the model can invoke.
///
/// Expected failures are reported through [`ToolOutput::content`], never as a
/// Rust error, so they can be replayed to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Schema offered to the model.
    fn schema(&self) -> ToolSchema;

    /// Execute with arguments already validated against [`Tool::schema`].
    async fn execute(&self, args: &ToolArgs) -> ToolOutput;
}
