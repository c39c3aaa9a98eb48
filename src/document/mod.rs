//! Course document ingestion.
//!
//! A [`DocumentProcessor`] turns a file into a catalog entry plus the content
//! chunks to embed.

mod chunker;
mod course_file;

pub use chunker::{chunk_text, split_sentences};
pub use course_file::{parse_course, CourseFileProcessor};

use crate::config::IngestSettings;
use crate::error::Result;
use crate::index::{Course, CourseChunk};
use async_trait::async_trait;
use std::path::Path;

/// File extensions accepted as course documents.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Whether a path looks like a course document.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Output of processing one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedDocument {
    pub course: Course,
    pub chunks: Vec<CourseChunk>,
}

/// Configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Characters of trailing sentences repeated at the start of the next chunk.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

impl From<&IngestSettings> for ChunkingConfig {
    fn from(settings: &IngestSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        }
    }
}

/// Trait for document processors.
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    /// Read and split a document.
    async fn process(&self, path: &Path) -> Result<ProcessedDocument>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported(Path::new("course1_script.txt")));
        assert!(is_supported(Path::new("notes/README.MD")));
        assert!(!is_supported(Path::new("slides.pdf")));
        assert!(!is_supported(Path::new("Makefile")));
    }
}
