//! Tool calling agent for course material questions.
//!
//! Tools expose typed schemas and are dispatched through a [`ToolRegistry`].
//! Each query opens a [`ToolSession`] that scopes citation state, and the
//! [`Agent`] drives the model through a bounded number of tool rounds.

mod course_tools;
mod registry;
mod runner;
mod tools;

pub use course_tools::{
    format_outline, CourseOutlineTool, CourseSearchTool, OUTLINE_TOOL_NAME, SEARCH_TOOL_NAME,
};
pub use registry::{ToolRegistry, ToolSession};
pub use runner::{Agent, AgentResponse, ToolCallRecord, MAX_TOOL_ROUNDS};
pub use tools::{ArgValue, ParamKind, ParamSpec, Source, Tool, ToolArgs, ToolOutput, ToolSchema};
