//! System facade for Kurs.
//!
//! Wires settings into the vector store, semantic index, capabilities, language
//! model and conversation store, and exposes querying and ingestion.

use crate::config::{Prompts, Settings};
use crate::document::{is_supported, ChunkingConfig, CourseFileProcessor, DocumentProcessor};
use crate::embedding::{create_embedder, Embedder};
use crate::error::{KursError, Result};
use crate::index::{Course, CourseIndex, MemoryVectorStore, SemanticIndex, SqliteVectorStore, VectorStore};
use crate::llm::{create_model, LanguageModel};
use crate::rag::{Answer, ConversationStore, QueryEngine};
use crate::tools::{CapabilityRegistry, ContentSearchCapability, OutlineCapability};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Catalog summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// The main orchestrator for Kurs.
pub struct Orchestrator {
    settings: Settings,
    index: Arc<SemanticIndex>,
    engine: QueryEngine,
    processor: Arc<dyn DocumentProcessor>,
}

impl Orchestrator {
    /// Create an orchestrator with components built from settings.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let store: Arc<dyn VectorStore> = match settings.index.provider.to_lowercase().as_str() {
            "sqlite" => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
            "memory" => Arc::new(MemoryVectorStore::new()),
            other => {
                return Err(KursError::Config(format!(
                    "Unknown index provider: {}",
                    other
                )))
            }
        };

        let embedder = create_embedder(&settings.embedding)?;
        let model = create_model(&settings.llm)?;

        info!(
            "Using {} model {} with {} index",
            model.provider_name(),
            settings.llm.model,
            settings.index.provider
        );

        Self::with_components(settings, prompts, store, embedder, model)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        let index = Arc::new(SemanticIndex::new(
            store,
            embedder,
            settings.index.max_results,
        )?);

        let course_index: Arc<dyn CourseIndex> = index.clone();
        let mut registry = CapabilityRegistry::new(settings.tools.max_concurrent);
        registry.register(Arc::new(ContentSearchCapability::new(course_index.clone())))?;
        registry.register(Arc::new(OutlineCapability::new(course_index)))?;

        let engine = QueryEngine::new(
            model,
            registry,
            ConversationStore::new(settings.session.max_history)
                .with_max_sessions(settings.session.max_sessions),
            prompts,
            &settings.llm,
        );

        let processor = Arc::new(CourseFileProcessor::new(ChunkingConfig::from(
            &settings.ingest,
        )));

        Ok(Self {
            settings,
            index,
            engine,
            processor,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the semantic index.
    pub fn index(&self) -> &Arc<SemanticIndex> {
        &self.index
    }

    /// Get the query engine.
    pub fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    /// Answer a question, continuing `session_id` when given.
    pub async fn query(&self, query: &str, session_id: Option<&str>) -> Result<Answer> {
        self.engine.answer(query, session_id).await
    }

    /// Number and titles of indexed courses.
    pub async fn course_analytics(&self) -> Result<CourseAnalytics> {
        let course_titles = self.index.get_existing_course_titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }

    /// Index one course document, replacing any course with the same title.
    ///
    /// Returns the catalog entry and the number of chunks indexed.
    #[instrument(skip(self))]
    pub async fn add_course_document(&self, path: &Path) -> Result<(Course, usize)> {
        let doc = self.processor.process(path).await?;

        let removed = self.index.store().delete_course(&doc.course.title).await?;
        if removed > 0 {
            info!("Replacing course '{}' ({} old chunks)", doc.course.title, removed);
        }

        self.index.add_course(&doc.course).await?;
        let count = self.index.add_chunks(doc.chunks).await?;

        info!("Indexed course '{}' with {} chunks", doc.course.title, count);
        Ok((doc.course, count))
    }

    /// Index every course document in `dir`.
    ///
    /// Courses whose title is already indexed are skipped, as are files that
    /// are not course documents or fail to process. Returns the number of
    /// courses and chunks added.
    #[instrument(skip(self))]
    pub async fn add_course_folder(&self, dir: &Path, clear_existing: bool) -> Result<(usize, usize)> {
        if clear_existing {
            info!("Clearing existing courses");
            self.index.clear().await?;
        }

        if !dir.is_dir() {
            return Err(KursError::InvalidInput(format!(
                "Folder not found: {}",
                dir.display()
            )));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_supported(p))
            .collect();
        paths.sort();

        let mut existing: HashSet<String> = self
            .index
            .get_existing_course_titles()
            .await?
            .into_iter()
            .collect();

        let mut courses = 0;
        let mut chunks = 0;

        for path in paths {
            let doc = match self.processor.process(&path).await {
                Ok(doc) => doc,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            if existing.contains(&doc.course.title) {
                info!("Course already indexed: {}", doc.course.title);
                continue;
            }

            self.index.add_course(&doc.course).await?;
            chunks += self.index.add_chunks(doc.chunks).await?;
            courses += 1;
            info!("Added course '{}'", doc.course.title);
            existing.insert(doc.course.title);
        }

        Ok((courses, chunks))
    }
}
