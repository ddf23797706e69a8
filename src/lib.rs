//! Syllabus - Course Material Q&A
//!
//! Answers questions about course material by letting a language model call
//! retrieval tools over an indexed course catalog, then returning the answer
//! with citations.
//!
//! # Overview
//!
//! A query runs through a bounded tool loop:
//! - The model receives the question and the tool schemas
//! - Requested tools (content search, course outline) run in order and their
//!   results are appended to the transcript
//! - After the configured number of rounds tools are withheld, forcing a
//!   final text answer
//!
//! Citations come from the most recent search of the query and never leak
//! into the next one.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `llm` - Transcript model and LLM backends (OpenAI, scripted)
//! - `embedding` - Embedding generation
//! - `vector_store` - Course catalog and chunk index
//! - `retrieval` - Search, lesson links and outlines over the store
//! - `agent` - Tools, registry and the orchestration loop
//! - `rag` - Question answering facade and sessions
//!
//! # Example
//!
//! ```rust,no_run
//! use syllabus::config::Settings;
//! use syllabus::rag::RagSystem;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let system = RagSystem::from_settings(&settings)?;
//!
//!     let response = system.answer("What does lesson 1 of the MCP course cover?", None).await?;
//!     println!("{}", response.answer);
//!     for source in &response.sources {
//!         println!("- {}", source.text);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod openai;
pub mod rag;
pub mod retrieval;
pub mod vector_store;

pub use error::{Result, SyllabusError};
