//! Plain-text course script format.
//!
//! ```text
//! Course Title: <title>
//! Course Link: <url>
//! Course Instructor: <name>
//!
//! Lesson 0: Introduction
//! Lesson Link: <url>
//! <lesson body...>
//! ```

use super::{chunk_text, ChunkingConfig, DocumentProcessor, ProcessedDocument};
use crate::error::{KursError, Result};
use crate::index::{Course, CourseChunk, Lesson};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, instrument};

static COURSE_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^course\s+title:\s*(.*)$").expect("Invalid regex"));
static COURSE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^course\s+link:\s*(.*)$").expect("Invalid regex"));
static COURSE_INSTRUCTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^course\s+instructor:\s*(.*)$").expect("Invalid regex"));
static LESSON_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^lesson\s+(\d+)\s*:\s*(.*)$").expect("Invalid regex"));
static LESSON_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^lesson\s+link:\s*(.*)$").expect("Invalid regex"));

fn capture(re: &Regex, line: &str) -> Option<String> {
    re.captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

struct LessonDraft {
    lesson: Lesson,
    body: Vec<String>,
}

/// Parse a course script into a catalog entry and its content chunks.
///
/// `fallback_title` is used when the script has no `Course Title:` line.
pub fn parse_course(
    text: &str,
    fallback_title: &str,
    config: &ChunkingConfig,
) -> Result<ProcessedDocument> {
    if text.trim().is_empty() {
        return Err(KursError::Document("document is empty".to_string()));
    }

    let mut course = Course::new(fallback_title);
    let mut preamble: Vec<String> = Vec::new();
    let mut lessons: Vec<LessonDraft> = Vec::new();
    let mut expect_lesson_link = false;

    for raw in text.lines() {
        let line = raw.trim();

        if let Some(caps) = LESSON_MARKER.captures(line) {
            let number = caps[1]
                .parse::<u32>()
                .map_err(|e| KursError::Document(format!("Invalid lesson number: {}", e)))?;
            lessons.push(LessonDraft {
                lesson: Lesson {
                    number,
                    title: caps[2].trim().to_string(),
                    link: None,
                },
                body: Vec::new(),
            });
            expect_lesson_link = true;
            continue;
        }

        match lessons.last_mut() {
            Some(draft) => {
                if expect_lesson_link {
                    if line.is_empty() {
                        continue;
                    }
                    expect_lesson_link = false;
                    if let Some(link) = capture(&LESSON_LINK, line) {
                        draft.lesson.link = non_empty(link);
                        continue;
                    }
                }
                draft.body.push(line.to_string());
            }
            None => {
                if let Some(title) = capture(&COURSE_TITLE, line) {
                    if !title.is_empty() {
                        course.title = title;
                    }
                } else if let Some(link) = capture(&COURSE_LINK, line) {
                    course.link = non_empty(link);
                } else if let Some(instructor) = capture(&COURSE_INSTRUCTOR, line) {
                    course.instructor = non_empty(instructor);
                } else {
                    preamble.push(line.to_string());
                }
            }
        }
    }

    let mut chunks = Vec::new();
    let mut chunk_index = 0u32;

    if lessons.is_empty() {
        for content in chunk_text(&preamble.join("\n"), config) {
            chunks.push(CourseChunk {
                content,
                course_title: course.title.clone(),
                lesson_number: None,
                chunk_index,
            });
            chunk_index += 1;
        }
    }

    for draft in lessons {
        let number = draft.lesson.number;
        for (i, content) in chunk_text(&draft.body.join("\n"), config)
            .into_iter()
            .enumerate()
        {
            let content = if i == 0 {
                format!("Lesson {} content: {}", number, content)
            } else {
                content
            };
            chunks.push(CourseChunk {
                content,
                course_title: course.title.clone(),
                lesson_number: Some(number),
                chunk_index,
            });
            chunk_index += 1;
        }
        course.lessons.push(draft.lesson);
    }

    debug!(
        "Parsed course '{}' with {} lessons and {} chunks",
        course.title,
        course.lessons.len(),
        chunks.len()
    );

    Ok(ProcessedDocument { course, chunks })
}

/// Reads course scripts from disk.
pub struct CourseFileProcessor {
    config: ChunkingConfig,
}

impl CourseFileProcessor {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }
}

impl Default for CourseFileProcessor {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

#[async_trait]
impl DocumentProcessor for CourseFileProcessor {
    #[instrument(skip(self))]
    async fn process(&self, path: &Path) -> Result<ProcessedDocument> {
        let text = tokio::fs::read_to_string(path).await?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Untitled course");

        parse_course(&text, stem, &self.config)
            .map_err(|e| KursError::Document(format!("{}: {}", path.display(), e)))
    }
}
