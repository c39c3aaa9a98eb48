//! Semantic index: similarity search plus course catalog lookups.

use super::{
    resolve_course_name, ChunkMetadata, Course, CourseChunk, CourseOutline, SearchFilter,
    SearchHit, SearchResults, StoredChunk, VectorStore,
};
use crate::embedding::Embedder;
use crate::error::{KursError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Read side of the index as seen by the capabilities.
#[async_trait]
pub trait CourseIndex: Send + Sync {
    /// Ranked content matching `query`, optionally restricted to a course
    /// (resolved fuzzily) and a lesson. Failures are reported through
    /// [`SearchResults::error`], never as `Err`.
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchResults;

    /// Link of a lesson, looked up by exact course title.
    async fn get_lesson_link(&self, course_title: &str, lesson_number: u32) -> Option<String>;

    /// Outline of the course best matching `course_name`.
    async fn get_course_outline(&self, course_name: &str) -> Option<CourseOutline>;
}

/// Vector-store backed semantic index.
pub struct SemanticIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    max_results: usize,
}

impl SemanticIndex {
    /// Create an index over a store. `max_results` must be positive.
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        max_results: usize,
    ) -> Result<Self> {
        if max_results == 0 {
            return Err(KursError::Config(
                "max_results must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            store,
            embedder,
            max_results,
        })
    }

    /// Underlying vector store.
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Number of courses in the catalog.
    pub async fn get_course_count(&self) -> Result<usize> {
        Ok(self.store.list_courses().await?.len())
    }

    /// All catalog titles, ordered by title.
    pub async fn get_existing_course_titles(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .list_courses()
            .await?
            .into_iter()
            .map(|c| c.title)
            .collect())
    }

    /// Add or replace a catalog entry.
    pub async fn add_course(&self, course: &Course) -> Result<()> {
        self.store.upsert_course(course).await
    }

    /// Embed and store content chunks. Returns the number stored.
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    pub async fn add_chunks(&self, chunks: Vec<CourseChunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(KursError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let stored: Vec<StoredChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| StoredChunk::new(chunk, embedding))
            .collect();

        let count = self.store.upsert_chunks(&stored).await?;
        info!("Indexed {} chunks", count);
        Ok(count)
    }

    /// Remove all courses and content.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }

    async fn resolve(&self, course_name: &str) -> Result<Option<String>> {
        let titles = self.get_existing_course_titles().await?;
        let resolved = resolve_course_name(course_name, &titles);
        debug!(course_name, ?resolved, "Resolved course name");
        Ok(resolved)
    }

    async fn run_search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<SearchResults> {
        let course_title = match course_name {
            Some(name) => match self.resolve(name).await? {
                Some(title) => Some(title),
                None => {
                    return Ok(SearchResults::empty(format!(
                        "No course found matching '{}'",
                        name
                    )))
                }
            },
            None => None,
        };

        let filter = SearchFilter {
            course_title,
            lesson_number,
        };

        let embedding = self.embedder.embed(query).await?;
        let scored = self
            .store
            .search(&embedding, &filter, self.max_results)
            .await?;

        Ok(SearchResults::from_hits(scored.into_iter().map(|s| {
            SearchHit {
                metadata: ChunkMetadata {
                    course_title: Some(s.chunk.course_title),
                    lesson_number: s.chunk.lesson_number,
                    chunk_index: Some(s.chunk.chunk_index),
                },
                document: s.chunk.content,
                distance: 1.0 - s.score,
            }
        })))
    }
}

#[async_trait]
impl CourseIndex for SemanticIndex {
    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchResults {
        match self.run_search(query, course_name, lesson_number).await {
            Ok(results) => {
                debug!("Search returned {} documents", results.len());
                results
            }
            Err(e) => {
                warn!("Search failed: {}", e);
                SearchResults::empty(format!("Search error: {}", e))
            }
        }
    }

    async fn get_lesson_link(&self, course_title: &str, lesson_number: u32) -> Option<String> {
        match self.store.get_course(course_title).await {
            Ok(course) => course
                .and_then(|c| c.lesson(lesson_number).and_then(|l| l.link.clone())),
            Err(e) => {
                warn!("Lesson link lookup failed: {}", e);
                None
            }
        }
    }

    async fn get_course_outline(&self, course_name: &str) -> Option<CourseOutline> {
        let title = match self.resolve(course_name).await {
            Ok(title) => title?,
            Err(e) => {
                warn!("Course resolution failed: {}", e);
                return None;
            }
        };

        match self.store.get_course(&title).await {
            Ok(course) => course.map(|c| c.outline()),
            Err(e) => {
                warn!("Outline lookup failed: {}", e);
                None
            }
        }
    }
}
