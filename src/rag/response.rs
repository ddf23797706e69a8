//! Question answering over the course catalog.

use super::session::SessionManager;
use crate::agent::{Agent, CourseOutlineTool, CourseSearchTool, Source, ToolCallRecord, ToolRegistry};
use crate::config::{Prompts, Settings};
use crate::embedding::OpenAIEmbedder;
use crate::error::{Result, SyllabusError};
use crate::llm::{LlmBackend, OpenAIBackend};
use crate::retrieval::VectorRetriever;
use crate::vector_store::{open_store, Course, CourseChunk};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument};

/// Answer with the citations that back it.
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Citations from the most recent search of this query, sorted by course and lesson.
    pub sources: Vec<Source>,
    /// Tool calls made while answering, in order.
    #[serde(skip)]
    pub tool_calls: Vec<ToolCallRecord>,
}

/// Catalog summary.
#[derive(Debug, Clone, Serialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// A chunk of already-split course text to import.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkInput {
    #[serde(default)]
    pub lesson_number: Option<u32>,
    pub content: String,
}

/// A course file ready for import: metadata plus pre-chunked text.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseDocument {
    pub course: Course,
    #[serde(default)]
    pub chunks: Vec<ChunkInput>,
}

/// Course assistant combining the agent, course tools and session history.
pub struct RagSystem {
    agent: Agent,
    tools: ToolRegistry,
    retriever: Arc<VectorRetriever>,
    prompts: Prompts,
    sessions: Mutex<SessionManager>,
}

impl RagSystem {
    /// Create a system with the search and outline tools registered.
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        retriever: Arc<VectorRetriever>,
        prompts: Prompts,
        max_tool_rounds: usize,
        max_history: usize,
    ) -> Result<Self> {
        let tools = ToolRegistry::new()
            .with_tool(Arc::new(CourseSearchTool::new(retriever.clone())))?
            .with_tool(Arc::new(CourseOutlineTool::new(retriever.clone())))?;

        let agent = Agent::new(backend)
            .with_system_prompt(&prompts.system_prompt(max_tool_rounds))
            .with_max_tool_rounds(max_tool_rounds);

        Ok(Self {
            agent,
            tools,
            retriever,
            prompts,
            sessions: Mutex::new(SessionManager::new(max_history)),
        })
    }

    /// Build the OpenAI-backed system described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let store = open_store(settings)?;
        let embedder = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        )?);
        let retriever = Arc::new(
            VectorRetriever::new(store, embedder).with_max_results(settings.retrieval.max_results),
        );
        let backend = Arc::new(OpenAIBackend::from_settings(&settings.llm)?);
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        Self::new(
            backend,
            retriever,
            prompts,
            settings.llm.max_tool_rounds,
            settings.session.max_history,
        )
    }

    /// The tools offered to the model.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer a question, optionally with a rendered conversation summary.
    ///
    /// Citations are scoped to this call and never carry over to the next one.
    #[instrument(skip(self, conversation_summary), fields(query = %query))]
    pub async fn answer(&self, query: &str, conversation_summary: Option<&str>) -> Result<RagResponse> {
        info!("Processing question");

        let prompt = self.prompts.query_prompt(query);
        let mut session = self.tools.session();

        let response = self
            .agent
            .generate(&prompt, conversation_summary, Some(&mut session))
            .await?;

        let sources = session.take_sources();
        debug!(
            "Answered in {} round(s) with {} source(s)",
            response.rounds,
            sources.len()
        );

        Ok(RagResponse {
            answer: response.content,
            sources,
            tool_calls: response.tool_calls,
        })
    }

    /// Answer within a conversation session and record the exchange.
    pub async fn query(&self, query: &str, session_id: Option<&str>) -> Result<RagResponse> {
        let history = match session_id {
            Some(id) => self.sessions()?.history(id),
            None => None,
        };

        let response = self.answer(query, history.as_deref()).await?;

        if let Some(id) = session_id {
            self.sessions()?.add_exchange(id, query, &response.answer);
        }
        Ok(response)
    }

    /// Start a conversation session.
    pub fn create_session(&self) -> Result<String> {
        Ok(self.sessions()?.create_session())
    }

    /// Forget a session's history.
    pub fn clear_session(&self, session_id: &str) -> Result<()> {
        self.sessions()?.clear(session_id);
        Ok(())
    }

    fn sessions(&self) -> Result<MutexGuard<'_, SessionManager>> {
        self.sessions
            .lock()
            .map_err(|e| SyllabusError::Agent(format!("Session state poisoned: {}", e)))
    }

    /// Summary of the course catalog.
    pub async fn course_analytics(&self) -> Result<CourseAnalytics> {
        let course_titles = self.retriever.store().course_titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }

    /// Embed and store a pre-chunked course. Returns the number of chunks stored.
    ///
    /// Re-importing a course replaces its metadata and all of its chunks.
    #[instrument(skip(self, document), fields(course = %document.course.title))]
    pub async fn add_course_document(&self, document: CourseDocument) -> Result<usize> {
        if document.course.title.trim().is_empty() {
            return Err(SyllabusError::InvalidInput(
                "Course title must not be empty".to_string(),
            ));
        }

        let texts: Vec<String> = document.chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.retriever.embedder().embed_batch(&texts).await?
        };
        if embeddings.len() != texts.len() {
            return Err(SyllabusError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        let chunks: Vec<CourseChunk> = document
            .chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (chunk, embedding))| {
                CourseChunk::new(
                    document.course.title.clone(),
                    chunk.lesson_number,
                    i as u32,
                    chunk.content,
                    embedding,
                )
            })
            .collect();

        let store = self.retriever.store();
        store.add_course(&document.course).await?;

        let replaced = store.delete_course_chunks(&document.course.title).await?;
        if replaced > 0 {
            debug!("Replaced {} existing chunks", replaced);
        }
        if chunks.is_empty() {
            return Ok(0);
        }

        let stored = store.add_chunks(&chunks).await?;
        info!("Stored {} chunks", stored);
        Ok(stored)
    }
}
