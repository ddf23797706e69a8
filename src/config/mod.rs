//! Configuration module for Syllabus.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::Prompts;
pub use settings::{
    EmbeddingSettings, GeneralSettings, LlmSettings, PromptSettings, RetrievalSettings,
    SessionSettings, Settings, VectorStoreSettings,
};
