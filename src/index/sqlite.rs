//! SQLite-based vector store implementation.
//!
//! Uses SQLite for persistence with cosine similarity computed in Rust.
//! Structured filters are applied in SQL before ranking.

use super::{cosine_similarity, rank, Course, ScoredChunk, SearchFilter, StoredChunk, VectorStore};
use crate::error::{KursError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS courses (
        title TEXT PRIMARY KEY,
        link TEXT,
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
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_course ON chunks(course_title, lesson_number);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a SQLite vector store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
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
            .map_err(|e| KursError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_chunk(row: &Row<'_>) -> rusqlite::Result<StoredChunk> {
        let id_str: String = row.get(0)?;
        let embedding_bytes: Vec<u8> = row.get(5)?;
        let indexed_at: String = row.get(6)?;

        Ok(StoredChunk {
            id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
            course_title: row.get(1)?,
            lesson_number: row.get(2)?,
            chunk_index: row.get(3)?,
            content: row.get(4)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            indexed_at: Self::parse_timestamp(&indexed_at),
        })
    }

    fn row_to_course(row: &Row<'_>) -> rusqlite::Result<(Course, String)> {
        let lessons_json: String = row.get(3)?;
        Ok((
            Course {
                title: row.get(0)?,
                link: row.get(1)?,
                instructor: row.get(2)?,
                lessons: Vec::new(),
            },
            lessons_json,
        ))
    }

    fn with_lessons((mut course, lessons_json): (Course, String)) -> Result<Course> {
        course.lessons = serde_json::from_str(&lessons_json).map_err(|e| {
            KursError::VectorStore(format!(
                "Corrupt lesson list for '{}': {}",
                course.title, e
            ))
        })?;
        Ok(course)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, course), fields(title = %course.title))]
    async fn upsert_course(&self, course: &Course) -> Result<()> {
        let conn = self.lock()?;
        let lessons_json = serde_json::to_string(&course.lessons)?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO courses (title, link, instructor, lessons_json, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                course.title,
                course.link,
                course.instructor,
                lessons_json,
                Utc::now().to_rfc3339(),
            ],
        )?;

        debug!("Upserted course with {} lessons", course.lessons.len());
        Ok(())
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn upsert_chunks(&self, chunks: &[StoredChunk]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for chunk in chunks {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks
                (id, course_title, lesson_number, chunk_index, content, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    chunk.id.to_string(),
                    chunk.course_title,
                    chunk.lesson_number,
                    chunk.chunk_index,
                    chunk.content,
                    Self::embedding_to_bytes(&chunk.embedding),
                    chunk.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} chunks", chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(
        &self,
        query_embedding: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, course_title, lesson_number, chunk_index, content, embedding, indexed_at
            FROM chunks
            WHERE (?1 IS NULL OR course_title = ?1)
              AND (?2 IS NULL OR lesson_number = ?2)
            "#,
        )?;

        let rows = stmt.query_map(
            params![filter.course_title, filter.lesson_number],
            Self::row_to_chunk,
        )?;

        let mut results = Vec::new();
        for row in rows {
            let chunk = row?;
            results.push(ScoredChunk {
                score: cosine_similarity(query_embedding, &chunk.embedding),
                chunk,
            });
        }

        let ranked = rank(results, limit);
        debug!("Found {} matching chunks", ranked.len());
        Ok(ranked)
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT title, link, instructor, lessons_json FROM courses ORDER BY title",
        )?;

        let rows = stmt.query_map([], Self::row_to_course)?;
        let mut courses = Vec::new();
        for row in rows {
            courses.push(Self::with_lessons(row?)?);
        }
        Ok(courses)
    }

    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT title, link, instructor, lessons_json FROM courses WHERE title = ?1",
            params![title],
            Self::row_to_course,
        );

        match result {
            Ok(row) => Ok(Some(Self::with_lessons(row)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn delete_course(&self, title: &str) -> Result<usize> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM courses WHERE title = ?1", params![title])?;
        let deleted = conn.execute("DELETE FROM chunks WHERE course_title = ?1", params![title])?;

        info!("Deleted {} chunks for course {}", deleted, title);
        Ok(deleted)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM chunks; DELETE FROM courses;")?;
        info!("Cleared vector store");
        Ok(())
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
