//! In-memory course store implementation.
//!
//! Useful for testing and small catalogs.

use super::{cosine_similarity, rank_hits, ChunkFilter, Course, CourseChunk, CourseStore, SearchHit};
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory course store.
pub struct MemoryCourseStore {
    courses: RwLock<BTreeMap<String, Course>>,
    chunks: RwLock<Vec<CourseChunk>>,
}

impl MemoryCourseStore {
    /// Create a new in-memory course store.
    pub fn new() -> Self {
        Self {
            courses: RwLock::new(BTreeMap::new()),
            chunks: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryCourseStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> SyllabusError {
    SyllabusError::VectorStore(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl CourseStore for MemoryCourseStore {
    async fn add_course(&self, course: &Course) -> Result<()> {
        let mut courses = self.courses.write().map_err(poisoned)?;
        courses.insert(course.title.clone(), course.clone());
        Ok(())
    }

    async fn add_chunks(&self, chunks: &[CourseChunk]) -> Result<usize> {
        let mut store = self.chunks.write().map_err(poisoned)?;
        store.extend(chunks.iter().cloned());
        Ok(chunks.len())
    }

    async fn delete_course_chunks(&self, course_title: &str) -> Result<usize> {
        let mut store = self.chunks.write().map_err(poisoned)?;
        let before = store.len();
        store.retain(|c| c.course_title != course_title);
        Ok(before - store.len())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        filter: &ChunkFilter,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let chunks = self.chunks.read().map_err(poisoned)?;

        let hits: Vec<SearchHit> = chunks
            .iter()
            .filter(|c| filter.matches(c))
            .map(|chunk| SearchHit {
                score: cosine_similarity(query_embedding, &chunk.embedding),
                chunk: chunk.clone(),
            })
            .collect();

        Ok(rank_hits(hits, limit))
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let courses = self.courses.read().map_err(poisoned)?;
        Ok(courses.keys().cloned().collect())
    }

    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let courses = self.courses.read().map_err(poisoned)?;
        Ok(courses.get(title).cloned())
    }

    async fn chunk_count(&self) -> Result<usize> {
        let chunks = self.chunks.read().map_err(poisoned)?;
        Ok(chunks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::Lesson;

    fn course(title: &str) -> Course {
        Course {
            title: title.to_string(),
            course_link: None,
            instructor: None,
            lessons: vec![Lesson {
                lesson_number: 1,
                title: "Intro".to_string(),
                lesson_link: Some(format!("https://example.com/{}/1", title)),
            }],
        }
    }

    #[tokio::test]
    async fn test_memory_course_store() {
        let store = MemoryCourseStore::new();
        store.add_course(&course("Beta Course")).await.unwrap();
        store.add_course(&course("Alpha Course")).await.unwrap();

        let chunks = vec![
            CourseChunk::new("Alpha Course".to_string(), Some(1), 0, "Hello".to_string(), vec![1.0, 0.0]),
            CourseChunk::new("Alpha Course".to_string(), Some(2), 1, "World".to_string(), vec![0.6, 0.8]),
            CourseChunk::new("Beta Course".to_string(), None, 0, "Other".to_string(), vec![0.0, 1.0]),
        ];
        assert_eq!(store.add_chunks(&chunks).await.unwrap(), 3);
        assert_eq!(store.chunk_count().await.unwrap(), 3);

        assert_eq!(
            store.course_titles().await.unwrap(),
            vec!["Alpha Course".to_string(), "Beta Course".to_string()]
        );

        let hits = store.search(&[1.0, 0.0], &ChunkFilter::default(), 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.content, "Hello");
        assert!(hits[0].score > hits[1].score);

        let filter = ChunkFilter {
            course_title: Some("Alpha Course".to_string()),
            lesson_number: Some(2),
        };
        let hits = store.search(&[1.0, 0.0], &filter, 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.content, "World");
    }

    #[tokio::test]
    async fn test_delete_course_chunks() {
        let store = MemoryCourseStore::new();
        let chunks = vec![
            CourseChunk::new("Alpha Course".to_string(), Some(1), 0, "Hello".to_string(), vec![1.0]),
            CourseChunk::new("Alpha Course".to_string(), Some(2), 1, "World".to_string(), vec![1.0]),
            CourseChunk::new("Beta Course".to_string(), None, 0, "Other".to_string(), vec![1.0]),
        ];
        store.add_chunks(&chunks).await.unwrap();

        assert_eq!(store.delete_course_chunks("Alpha Course").await.unwrap(), 2);
        assert_eq!(store.delete_course_chunks("Alpha Course").await.unwrap(), 0);
        assert_eq!(store.chunk_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resolve_course_title() {
        let store = MemoryCourseStore::new();
        store.add_course(&course("Introduction to Rust")).await.unwrap();

        assert_eq!(
            store.resolve_course_title("rust").await.unwrap(),
            Some("Introduction to Rust".to_string())
        );
        assert_eq!(store.resolve_course_title("Haskell").await.unwrap(), None);
    }
}
