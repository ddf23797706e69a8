//! Pre-flight checks before operations that call the OpenAI API.
//!
//! Validates configuration up front so commands fail with a clear message
//! instead of midway through a request.

use crate::error::{Result, SyllabusError};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering questions requires an API key.
    Ask,
    /// Importing embeds course text and requires an API key.
    Import,
    /// Reading the catalog has no external requirements.
    Catalog,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Ask | Operation::Import => check_api_key(std::env::var("OPENAI_API_KEY").ok()),
        Operation::Catalog => Ok(()),
    }
}

/// Check that an OpenAI API key is configured.
fn check_api_key(key: Option<String>) -> Result<()> {
    match key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        Some(_) => Err(SyllabusError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        None => Err(SyllabusError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}
