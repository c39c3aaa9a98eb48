//! Semantic index over course content.
//!
//! A [`VectorStore`] persists content chunks with their embeddings and the
//! course catalog. [`SemanticIndex`] sits on top of a store and an embedder and
//! answers filtered similarity queries for the capabilities.

mod memory;
mod resolve;
mod semantic;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use resolve::resolve_course_name;
pub use semantic::{CourseIndex, SemanticIndex};
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A lesson entry in the course catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub number: u32,
    pub title: String,
    pub link: Option<String>,
}

/// A course catalog entry. The title is the unique key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub link: Option<String>,
    pub instructor: Option<String>,
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Create a course with no lessons.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: None,
            instructor: None,
            lessons: Vec::new(),
        }
    }

    /// Look up a lesson by number.
    pub fn lesson(&self, number: u32) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.number == number)
    }

    /// Structured outline of this course.
    pub fn outline(&self) -> CourseOutline {
        let mut lessons = self.lessons.clone();
        lessons.sort_by_key(|l| l.number);
        CourseOutline {
            title: self.title.clone(),
            link: self.link.clone(),
            lessons,
        }
    }
}

/// A course outline: title, link and ordered lessons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseOutline {
    pub title: String,
    pub link: Option<String>,
    pub lessons: Vec<Lesson>,
}

/// A chunk of course text produced by ingestion, not yet embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseChunk {
    pub content: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: u32,
}

/// A chunk stored in the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub id: Uuid,
    pub content: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: u32,
    pub embedding: Vec<f32>,
    pub indexed_at: DateTime<Utc>,
}

impl StoredChunk {
    /// Attach an embedding to an ingested chunk.
    pub fn new(chunk: CourseChunk, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: chunk.content,
            course_title: chunk.course_title,
            lesson_number: chunk.lesson_number,
            chunk_index: chunk.chunk_index,
            embedding,
            indexed_at: Utc::now(),
        }
    }

    /// Metadata view of this chunk.
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            course_title: Some(self.course_title.clone()),
            lesson_number: self.lesson_number,
            chunk_index: Some(self.chunk_index),
        }
    }
}

/// A stored chunk with its similarity score (higher is better).
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: StoredChunk,
    pub score: f32,
}

/// Structured filter applied before ranking. Both fields combine conjunctively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    /// Exact catalog title.
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
}

impl SearchFilter {
    /// Whether a chunk passes the filter.
    pub fn matches(&self, chunk: &StoredChunk) -> bool {
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

/// Metadata attached to a search hit. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
    pub chunk_index: Option<u32>,
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub document: String,
    pub metadata: ChunkMetadata,
    /// Lower is better.
    pub distance: f32,
}

/// Result set of a semantic search.
///
/// `documents`, `metadata` and `distances` always have the same length; when
/// `error` is set all three are empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    documents: Vec<String>,
    metadata: Vec<ChunkMetadata>,
    distances: Vec<f32>,
    error: Option<String>,
}

impl SearchResults {
    /// Build a result set from ranked hits.
    pub fn from_hits(hits: impl IntoIterator<Item = SearchHit>) -> Self {
        let mut results = Self::default();
        for hit in hits {
            results.documents.push(hit.document);
            results.metadata.push(hit.metadata);
            results.distances.push(hit.distance);
        }
        results
    }

    /// An empty result set carrying an error message.
    pub fn empty(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn metadata(&self) -> &[ChunkMetadata] {
        &self.metadata
    }

    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Iterate over `(document, metadata, distance)` in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChunkMetadata, f32)> {
        self.documents
            .iter()
            .zip(self.metadata.iter())
            .zip(self.distances.iter())
            .map(|((doc, meta), dist)| (doc.as_str(), meta, *dist))
    }
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace a course catalog entry.
    async fn upsert_course(&self, course: &Course) -> Result<()>;

    /// Bulk insert content chunks.
    async fn upsert_chunks(&self, chunks: &[StoredChunk]) -> Result<usize>;

    /// Rank chunks passing `filter` by similarity to the query embedding.
    async fn search(
        &self,
        query_embedding: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>>;

    /// All catalog entries, ordered by title.
    async fn list_courses(&self) -> Result<Vec<Course>>;

    /// A catalog entry by exact title.
    async fn get_course(&self, title: &str) -> Result<Option<Course>>;

    /// Delete a course and its chunks. Returns the number of chunks removed.
    async fn delete_course(&self, title: &str) -> Result<usize>;

    /// Remove everything.
    async fn clear(&self) -> Result<()>;

    /// Total number of stored chunks.
    async fn chunk_count(&self) -> Result<usize>;
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

/// Sort by descending score and keep the best `limit`.
pub(crate) fn rank(mut results: Vec<ScoredChunk>, limit: usize) -> Vec<ScoredChunk> {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.course_title.cmp(&b.chunk.course_title))
            .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
    });
    results.truncate(limit);
    results
}
