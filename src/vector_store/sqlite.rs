//! SQLite-based course store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! Course catalogs are small, so a full scan per query is acceptable.

use super::{cosine_similarity, rank_hits, ChunkFilter, Course, CourseChunk, CourseStore, SearchHit};
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS courses (
    title TEXT PRIMARY KEY,
    course_link TEXT,
    instructor TEXT,
    lessons_json TEXT NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    course_title TEXT NOT NULL,
    lesson_number INTEGER,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_course ON chunks(course_title);
CREATE INDEX IF NOT EXISTS idx_chunks_lesson ON chunks(course_title, lesson_number);
"#;

/// SQLite-based course store.
pub struct SqliteCourseStore {
    conn: Mutex<Connection>,
}

impl SqliteCourseStore {
    /// Open (or create) a course store at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL lets readers proceed while an import is running
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite course store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite course store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SyllabusError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<CourseChunk> {
        let id_str: String = row.get(0)?;
        let embedding_bytes: Vec<u8> = row.get(5)?;

        Ok(CourseChunk {
            id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
            course_title: row.get(1)?,
            lesson_number: row.get(2)?,
            chunk_index: row.get(3)?,
            content: row.get(4)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
        })
    }
}

#[async_trait]
impl CourseStore for SqliteCourseStore {
    #[instrument(skip(self, course), fields(title = %course.title))]
    async fn add_course(&self, course: &Course) -> Result<()> {
        let conn = self.lock()?;
        let lessons_json = serde_json::to_string(&course.lessons)?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO courses (title, course_link, instructor, lessons_json, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                course.title,
                course.course_link,
                course.instructor,
                lessons_json,
                Utc::now().to_rfc3339(),
            ],
        )?;

        debug!("Stored course with {} lessons", course.lessons.len());
        Ok(())
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn add_chunks(&self, chunks: &[CourseChunk]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for chunk in chunks {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks
                (id, course_title, lesson_number, chunk_index, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    chunk.id.to_string(),
                    chunk.course_title,
                    chunk.lesson_number,
                    chunk.chunk_index,
                    chunk.content,
                    Self::embedding_to_bytes(&chunk.embedding),
                ],
            )?;
        }

        tx.commit()?;
        info!("Stored {} chunks", chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self))]
    async fn delete_course_chunks(&self, course_title: &str) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM chunks WHERE course_title = ?1",
            params![course_title],
        )?;
        debug!("Removed {} chunks", removed);
        Ok(removed)
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(
        &self,
        query_embedding: &[f32],
        filter: &ChunkFilter,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, course_title, lesson_number, chunk_index, content, embedding
            FROM chunks
            WHERE (?1 IS NULL OR course_title = ?1)
              AND (?2 IS NULL OR lesson_number = ?2)
            "#,
        )?;

        let chunks = stmt
            .query_map(
                params![filter.course_title, filter.lesson_number],
                Self::row_to_chunk,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let hits: Vec<SearchHit> = chunks
            .into_iter()
            .map(|chunk| SearchHit {
                score: cosine_similarity(query_embedding, &chunk.embedding),
                chunk,
            })
            .collect();

        let hits = rank_hits(hits, limit);
        debug!("Found {} matching chunks", hits.len());
        Ok(hits)
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT title FROM courses ORDER BY title")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(titles)
    }

    #[instrument(skip(self))]
    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT title, course_link, instructor, lessons_json FROM courses WHERE title = ?1",
                params![title],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((title, course_link, instructor, lessons_json)) => Ok(Some(Course {
                title,
                course_link,
                instructor,
                lessons: serde_json::from_str(&lessons_json)?,
            })),
            None => Ok(None),
        }
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
