//! Course catalog and chunk index for Syllabus.
//!
//! Provides a trait-based interface over the stores that hold course metadata
//! and embedded course chunks.

mod memory;
mod sqlite;

pub use memory::MemoryCourseStore;
pub use sqlite::SqliteCourseStore;

use crate::config::Settings;
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A lesson within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson number as published in the course.
    pub lesson_number: u32,
    /// Lesson title.
    pub title: String,
    /// Canonical link to the lesson, if known.
    #[serde(default)]
    pub lesson_link: Option<String>,
}

/// Course metadata stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Course title. Titles are unique within a catalog.
    pub title: String,
    /// Link to the course landing page.
    #[serde(default)]
    pub course_link: Option<String>,
    /// Course instructor.
    #[serde(default)]
    pub instructor: Option<String>,
    /// Lessons in published order.
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Look up a lesson by number.
    pub fn lesson(&self, lesson_number: u32) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.lesson_number == lesson_number)
    }
}

/// A chunk of course text stored in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseChunk {
    /// Unique chunk ID.
    pub id: Uuid,
    /// Title of the course this chunk belongs to.
    pub course_title: String,
    /// Lesson this chunk belongs to, if any.
    pub lesson_number: Option<u32>,
    /// Position of this chunk within the course.
    pub chunk_index: u32,
    /// Text content of this chunk.
    pub content: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
}

impl CourseChunk {
    /// Create a new chunk.
    pub fn new(
        course_title: String,
        lesson_number: Option<u32>,
        chunk_index: u32,
        content: String,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_title,
            lesson_number,
            chunk_index,
            content,
            embedding,
        }
    }
}

/// Filter applied to chunk searches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkFilter {
    /// Exact course title to restrict to.
    pub course_title: Option<String>,
    /// Lesson number to restrict to.
    pub lesson_number: Option<u32>,
}

impl ChunkFilter {
    /// Check whether a chunk passes this filter.
    pub fn matches(&self, chunk: &CourseChunk) -> bool {
        let course_ok = self
            .course_title
            .as_ref()
            .map_or(true, |title| &chunk.course_title == title);
        let lesson_ok = self
            .lesson_number
            .map_or(true, |n| chunk.lesson_number == Some(n));
        course_ok && lesson_ok
    }
}

/// A chunk search hit with score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The matched chunk.
    pub chunk: CourseChunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Trait for course store implementations.
#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Insert or replace a course in the catalog.
    async fn add_course(&self, course: &Course) -> Result<()>;

    /// Bulk insert chunks.
    async fn add_chunks(&self, chunks: &[CourseChunk]) -> Result<usize>;

    /// Remove every chunk of a course. Returns the number removed.
    async fn delete_course_chunks(&self, course_title: &str) -> Result<usize>;

    /// Search for chunks similar to the query embedding.
    async fn search(
        &self,
        query_embedding: &[f32],
        filter: &ChunkFilter,
        limit: usize,
    ) -> Result<Vec<SearchHit>>;

    /// List all course titles in the catalog, sorted.
    async fn course_titles(&self) -> Result<Vec<String>>;

    /// Get a course by exact title.
    async fn get_course(&self, title: &str) -> Result<Option<Course>>;

    /// Get total chunk count.
    async fn chunk_count(&self) -> Result<usize>;

    /// Resolve a possibly partial course name to a catalog title.
    async fn resolve_course_title(&self, name: &str) -> Result<Option<String>> {
        let titles = self.course_titles().await?;
        Ok(best_title_match(name, &titles).map(str::to_string))
    }
}

/// Open the store configured in `settings.vector_store`.
pub fn open_store(settings: &Settings) -> Result<Arc<dyn CourseStore>> {
    match settings.vector_store.provider.as_str() {
        "sqlite" => {
            let path = settings.sqlite_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Ok(Arc::new(SqliteCourseStore::new(&path)?))
        }
        "memory" => Ok(Arc::new(MemoryCourseStore::new())),
        other => Err(SyllabusError::Config(format!(
            "Unknown vector store provider: {}",
            other
        ))),
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Pick the catalog title that best matches a partial course name.
///
/// Exact (case-insensitive) match wins, then substring containment in either
/// direction, then the title sharing the most words with the query. Ties keep
/// the earliest title.
pub fn best_title_match<'a>(query: &str, titles: &'a [String]) -> Option<&'a str> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    if let Some(title) = titles.iter().find(|t| t.to_lowercase() == needle) {
        return Some(title);
    }

    if let Some(title) = titles.iter().find(|t| {
        let hay = t.to_lowercase();
        hay.contains(&needle) || needle.contains(&hay)
    }) {
        return Some(title);
    }

    let query_words = words(&needle);
    let mut best: Option<(&str, usize)> = None;
    for title in titles {
        let title_words = words(&title.to_lowercase());
        let overlap = query_words.iter().filter(|w| title_words.contains(*w)).count();
        if overlap > 0 && best.map_or(true, |(_, score)| overlap > score) {
            best = Some((title, overlap));
        }
    }
    best.map(|(title, _)| title)
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1)
        .map(str::to_string)
        .collect()
}

/// Order hits by descending score and keep the best `limit`.
pub(crate) fn rank_hits(mut hits: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(limit);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_store_by_provider() {
        let mut settings = Settings::default();
        settings.vector_store.provider = "memory".to_string();
        let store = open_store(&settings).unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 0);

        settings.vector_store.provider = "qdrant".to_string();
        assert!(matches!(open_store(&settings), Err(SyllabusError::Config(_))));
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_best_title_match() {
        let titles = vec![
            "Building Towards Computer Use with Anthropic".to_string(),
            "MCP: Build Rich-Context AI Apps with Anthropic".to_string(),
            "Prompt Compression and Query Optimization".to_string(),
        ];

        assert_eq!(
            best_title_match("mcp", &titles),
            Some("MCP: Build Rich-Context AI Apps with Anthropic")
        );
        assert_eq!(
            best_title_match("prompt compression and query optimization", &titles),
            Some("Prompt Compression and Query Optimization")
        );
        assert_eq!(
            best_title_match("computer use course", &titles),
            Some("Building Towards Computer Use with Anthropic")
        );
        assert_eq!(best_title_match("Nope", &titles), None);
        assert_eq!(best_title_match("   ", &titles), None);
    }

    #[test]
    fn test_chunk_filter() {
        let chunk = CourseChunk::new("Testing 101".to_string(), Some(2), 0, "x".to_string(), vec![]);

        assert!(ChunkFilter::default().matches(&chunk));
        assert!(ChunkFilter {
            course_title: Some("Testing 101".to_string()),
            lesson_number: Some(2),
        }
        .matches(&chunk));
        assert!(!ChunkFilter {
            course_title: None,
            lesson_number: Some(3),
        }
        .matches(&chunk));
        assert!(!ChunkFilter {
            course_title: Some("Other".to_string()),
            lesson_number: None,
        }
        .matches(&chunk));
    }
}
