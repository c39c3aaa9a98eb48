//! In-memory vector store implementation.
//!
//! Useful for testing and small course sets.

use super::{cosine_similarity, rank, Course, ScoredChunk, SearchFilter, StoredChunk, VectorStore};
use crate::error::{KursError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory vector store.
#[derive(Default)]
pub struct MemoryVectorStore {
    courses: RwLock<BTreeMap<String, Course>>,
    chunks: RwLock<Vec<StoredChunk>>,
}

impl MemoryVectorStore {
    /// Create a new, empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> KursError {
    KursError::VectorStore(format!("Lock poisoned: {}", e))
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_course(&self, course: &Course) -> Result<()> {
        let mut courses = self.courses.write().map_err(poisoned)?;
        courses.insert(course.title.clone(), course.clone());
        Ok(())
    }

    async fn upsert_chunks(&self, chunks: &[StoredChunk]) -> Result<usize> {
        let mut store = self.chunks.write().map_err(poisoned)?;
        for chunk in chunks {
            store.retain(|c| c.id != chunk.id);
            store.push(chunk.clone());
        }
        Ok(chunks.len())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let chunks = self.chunks.read().map_err(poisoned)?;

        let results: Vec<ScoredChunk> = chunks
            .iter()
            .filter(|c| filter.matches(c))
            .map(|c| ScoredChunk {
                score: cosine_similarity(query_embedding, &c.embedding),
                chunk: c.clone(),
            })
            .collect();

        Ok(rank(results, limit))
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let courses = self.courses.read().map_err(poisoned)?;
        Ok(courses.values().cloned().collect())
    }

    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let courses = self.courses.read().map_err(poisoned)?;
        Ok(courses.get(title).cloned())
    }

    async fn delete_course(&self, title: &str) -> Result<usize> {
        self.courses.write().map_err(poisoned)?.remove(title);

        let mut chunks = self.chunks.write().map_err(poisoned)?;
        let initial_len = chunks.len();
        chunks.retain(|c| c.course_title != title);
        Ok(initial_len - chunks.len())
    }

    async fn clear(&self) -> Result<()> {
        self.courses.write().map_err(poisoned)?.clear();
        self.chunks.write().map_err(poisoned)?.clear();
        Ok(())
    }

    async fn chunk_count(&self) -> Result<usize> {
        Ok(self.chunks.read().map_err(poisoned)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::CourseChunk;

    fn chunk(course: &str, lesson: u32, index: u32, embedding: Vec<f32>) -> StoredChunk {
        StoredChunk::new(
            CourseChunk {
                content: format!("{} lesson {} chunk {}", course, lesson, index),
                course_title: course.to_string(),
                lesson_number: Some(lesson),
                chunk_index: index,
            },
            embedding,
        )
    }

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();
        store.upsert_course(&Course::new("Rust Basics")).await.unwrap();
        store.upsert_course(&Course::new("Async Rust")).await.unwrap();

        store
            .upsert_chunks(&[
                chunk("Rust Basics", 1, 0, vec![1.0, 0.0, 0.0]),
                chunk("Rust Basics", 2, 1, vec![0.0, 1.0, 0.0]),
                chunk("Async Rust", 1, 0, vec![0.9, 0.1, 0.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.chunk_count().await.unwrap(), 3);

        let results = store
            .search(&[1.0, 0.0, 0.0], &SearchFilter::default(), 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].score >= results[1].score);
        assert!(results[1].score >= results[2].score);

        let filtered = store
            .search(
                &[1.0, 0.0, 0.0],
                &SearchFilter {
                    course_title: Some("Rust Basics".to_string()),
                    lesson_number: Some(2),
                },
                10,
            )
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].chunk.lesson_number, Some(2));

        let limited = store
            .search(&[1.0, 0.0, 0.0], &SearchFilter::default(), 1)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);

        let titles: Vec<String> = store
            .list_courses()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["Async Rust", "Rust Basics"]);

        assert_eq!(store.delete_course("Rust Basics").await.unwrap(), 2);
        assert!(store.get_course("Rust Basics").await.unwrap().is_none());
        assert_eq!(store.chunk_count().await.unwrap(), 1);
    }
}
