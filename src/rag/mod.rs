//! RAG (Retrieval-Augmented Generation) for course questions with sources.
//!
//! [`RagSystem`] wires the course tools into the agent and keeps
//! conversation history per session.

mod response;
mod session;

pub use response::{ChunkInput, CourseAnalytics, CourseDocument, RagResponse, RagSystem};
pub use session::SessionManager;
