//! Retrieval backend used by the course tools.
//!
//! Wraps the course store and embedder behind the three lookups the tools
//! need: filtered content search, lesson link resolution and course outlines.

use crate::embedding::Embedder;
use crate::vector_store::{ChunkFilter, Course, CourseStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Metadata for a retrieved chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: u32,
}

/// Result of a content search.
///
/// `error` and an empty-but-successful result are distinct outcomes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    /// Chunk texts, best match first.
    pub documents: Vec<String>,
    /// Metadata parallel to `documents`.
    pub metadata: Vec<ChunkMetadata>,
    /// Cosine distances parallel to `documents`.
    pub distances: Vec<f32>,
    /// Human-readable failure, if the search could not run.
    pub error: Option<String>,
}

impl SearchResults {
    /// Create an empty result carrying an error message.
    pub fn empty(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Check whether the search returned no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// A lesson entry in a course outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonOutline {
    pub lesson_number: u32,
    pub lesson_title: String,
    pub lesson_link: Option<String>,
}

/// Outline of a course as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseOutline {
    pub title: String,
    pub course_link: Option<String>,
    pub instructor: Option<String>,
    /// Lessons in stored order.
    pub lessons: Vec<LessonOutline>,
}

/// Lookups the course tools delegate to.
#[async_trait]
pub trait RetrievalBackend: Send + Sync {
    /// Search course content, optionally restricted to a course and lesson.
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchResults;

    /// Resolve the canonical link of a lesson.
    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Option<String>;

    /// Get the outline of the course best matching `course_name`.
    async fn course_outline(&self, course_name: &str) -> Option<CourseOutline>;
}

/// Retrieval backend over a [`CourseStore`] and an [`Embedder`].
pub struct VectorRetriever {
    store: Arc<dyn CourseStore>,
    embedder: Arc<dyn Embedder>,
    max_results: usize,
}

impl VectorRetriever {
    /// Create a new retriever returning up to five results per search.
    pub fn new(store: Arc<dyn CourseStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            max_results: 5,
        }
    }

    /// Set the maximum number of results per search.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Access the underlying store.
    pub fn store(&self) -> Arc<dyn CourseStore> {
        self.store.clone()
    }

    /// Access the embedder used for queries.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    async fn run_search(
        &self,
        query: &str,
        filter: &ChunkFilter,
    ) -> crate::error::Result<SearchResults> {
        let embedding = self.embedder.embed(query).await?;
        let hits = self.store.search(&embedding, filter, self.max_results).await?;

        let mut results = SearchResults::default();
        for hit in hits {
            results.metadata.push(ChunkMetadata {
                course_title: hit.chunk.course_title,
                lesson_number: hit.chunk.lesson_number,
                chunk_index: hit.chunk.chunk_index,
            });
            results.documents.push(hit.chunk.content);
            results.distances.push(1.0 - hit.score);
        }
        Ok(results)
    }

    async fn find_course(&self, course_name: &str) -> crate::error::Result<Option<Course>> {
        match self.store.resolve_course_title(course_name).await? {
            Some(title) => self.store.get_course(&title).await,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RetrievalBackend for VectorRetriever {
    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchResults {
        let course_title = match course_name {
            Some(name) => match self.store.resolve_course_title(name).await {
                Ok(Some(title)) => Some(title),
                Ok(None) => return SearchResults::empty(format!("No course found matching '{}'", name)),
                Err(e) => {
                    warn!("Course resolution failed: {}", e);
                    return SearchResults::empty(format!("Search error: {}", e));
                }
            },
            None => None,
        };

        let filter = ChunkFilter {
            course_title,
            lesson_number,
        };

        match self.run_search(query, &filter).await {
            Ok(results) => {
                debug!("Search returned {} documents", results.documents.len());
                results
            }
            Err(e) => {
                warn!("Search failed: {}", e);
                SearchResults::empty(format!("Search error: {}", e))
            }
        }
    }

    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Option<String> {
        match self.store.get_course(course_title).await {
            Ok(course) => course?.lesson(lesson_number)?.lesson_link.clone(),
            Err(e) => {
                warn!("Lesson link lookup failed: {}", e);
                None
            }
        }
    }

    #[instrument(skip(self))]
    async fn course_outline(&self, course_name: &str) -> Option<CourseOutline> {
        let course = match self.find_course(course_name).await {
            Ok(course) => course?,
            Err(e) => {
                warn!("Outline lookup failed: {}", e);
                return None;
            }
        };

        Some(CourseOutline {
            title: course.title,
            course_link: course.course_link,
            instructor: course.instructor,
            lessons: course
                .lessons
                .into_iter()
                .map(|l| LessonOutline {
                    lesson_number: l.lesson_number,
                    lesson_title: l.title,
                    lesson_link: l.lesson_link,
                })
                .collect(),
        })
    }
}
