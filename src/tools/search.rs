//! `search_course_content`: semantic search over course material.

use super::{parse_input, Capability, CapabilityOutput, Source};
use crate::index::{CourseIndex, SearchResults};
use crate::llm::ToolDefinition;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

pub const SEARCH_TOOL_NAME: &str = "search_course_content";

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    course_name: Option<String>,
    lesson_number: Option<u32>,
}

/// Searches indexed course content with optional course and lesson filters.
pub struct ContentSearchCapability {
    index: Arc<dyn CourseIndex>,
}

impl ContentSearchCapability {
    pub fn new(index: Arc<dyn CourseIndex>) -> Self {
        Self { index }
    }

    /// Search and format results for the model.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> CapabilityOutput {
        let results = self.index.search(query, course_name, lesson_number).await;

        if let Some(error) = results.error() {
            return CapabilityOutput::text(error);
        }

        if results.is_empty() {
            let mut message = String::from("No relevant content found");
            if let Some(course) = course_name {
                message.push_str(&format!(" in course '{}'", course));
            }
            if let Some(lesson) = lesson_number {
                message.push_str(&format!(" in lesson {}", lesson));
            }
            message.push('.');
            return CapabilityOutput::text(message);
        }

        self.format_results(&results).await
    }

    async fn format_results(&self, results: &SearchResults) -> CapabilityOutput {
        let mut blocks = Vec::with_capacity(results.len());
        let mut sources = Vec::with_capacity(results.len());

        for (document, meta, _) in results.iter() {
            let course = meta.course_title.as_deref().unwrap_or("unknown");
            let label = match meta.lesson_number {
                Some(lesson) => format!("{} - Lesson {}", course, lesson),
                None => course.to_string(),
            };

            let link = match (meta.course_title.as_deref(), meta.lesson_number) {
                (Some(title), Some(lesson)) => self.index.get_lesson_link(title, lesson).await,
                _ => None,
            };

            blocks.push(format!("[{}]\n{}", label, document));
            sources.push(Source { text: label, link });
        }

        CapabilityOutput {
            content: blocks.join("\n\n"),
            sources,
        }
    }
}

#[async_trait]
impl Capability for ContentSearchCapability {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: SEARCH_TOOL_NAME.to_string(),
            description: "Search course materials with smart course name matching and lesson filtering"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn invoke(&self, input: &Value) -> CapabilityOutput {
        let args: SearchArgs = match parse_input(SEARCH_TOOL_NAME, input) {
            Ok(args) => args,
            Err(output) => return output,
        };

        self.search(&args.query, args.course_name.as_deref(), args.lesson_number)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{ChunkMetadata, CourseOutline, SearchHit};
    use std::sync::Mutex;

    /// Index stub returning a canned result and recording the filters it saw.
    struct StubIndex {
        results: SearchResults,
        calls: Mutex<Vec<(String, Option<String>, Option<u32>)>>,
    }

    impl StubIndex {
        fn new(results: SearchResults) -> Arc<Self> {
            Arc::new(Self {
                results,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CourseIndex for StubIndex {
        async fn search(
            &self,
            query: &str,
            course_name: Option<&str>,
            lesson_number: Option<u32>,
        ) -> SearchResults {
            self.calls.lock().unwrap().push((
                query.to_string(),
                course_name.map(str::to_string),
                lesson_number,
            ));
            self.results.clone()
        }

        async fn get_lesson_link(&self, course_title: &str, lesson_number: u32) -> Option<String> {
            Some(format!("https://example.com/{}/{}", course_title, lesson_number))
        }

        async fn get_course_outline(&self, _course_name: &str) -> Option<CourseOutline> {
            None
        }
    }

    fn hit(document: &str, course: Option<&str>, lesson: Option<u32>) -> SearchHit {
        SearchHit {
            document: document.to_string(),
            metadata: ChunkMetadata {
                course_title: course.map(str::to_string),
                lesson_number: lesson,
                chunk_index: Some(0),
            },
            distance: 0.2,
        }
    }

    #[tokio::test]
    async fn test_formats_results_with_headers_and_sources() {
        let index = StubIndex::new(SearchResults::from_hits(vec![
            hit("Servers expose tools.", Some("MCP"), Some(1)),
            hit("Course overview.", Some("MCP"), None),
        ]));
        let capability = ContentSearchCapability::new(index);

        let output = capability
            .invoke(&json!({"query": "servers", "course_name": "MCP"}))
            .await;

        assert_eq!(
            output.content,
            "[MCP - Lesson 1]\nServers expose tools.\n\n[MCP]\nCourse overview."
        );
        assert_eq!(
            output.sources,
            vec![
                Source {
                    text: "MCP - Lesson 1".to_string(),
                    link: Some("https://example.com/MCP/1".to_string()),
                },
                Source {
                    text: "MCP".to_string(),
                    link: None,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_metadata_renders_unknown() {
        let index = StubIndex::new(SearchResults::from_hits(vec![hit("Orphan text", None, None)]));
        let capability = ContentSearchCapability::new(index);

        let output = capability.search("anything", None, None).await;
        assert_eq!(output.content, "[unknown]\nOrphan text");
        assert_eq!(output.sources[0].text, "unknown");
        assert!(output.sources[0].link.is_none());
    }

    #[tokio::test]
    async fn test_error_is_returned_verbatim() {
        let index = StubIndex::new(SearchResults::empty("Search error: index offline"));
        let capability = ContentSearchCapability::new(index);

        let output = capability.search("anything", None, None).await;
        assert_eq!(output.content, "Search error: index offline");
        assert!(output.sources.is_empty());
    }

    #[tokio::test]
    async fn test_empty_results_mention_filters() {
        let index = StubIndex::new(SearchResults::default());
        let capability = ContentSearchCapability::new(index.clone());

        let none = capability.search("x", None, None).await;
        assert_eq!(none.content, "No relevant content found.");

        let both = capability.search("x", Some("MCP"), Some(3)).await;
        assert_eq!(both.content, "No relevant content found in course 'MCP' in lesson 3.");

        let lesson = capability.search("x", None, Some(2)).await;
        assert_eq!(lesson.content, "No relevant content found in lesson 2.");
        assert!(lesson.sources.is_empty());
    }

    #[tokio::test]
    async fn test_filters_are_forwarded() {
        let index = StubIndex::new(SearchResults::default());
        let capability = ContentSearchCapability::new(index.clone());

        capability
            .invoke(&json!({"query": "embeddings", "course_name": "RAG", "lesson_number": 4}))
            .await;

        let calls = index.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            ("embeddings".to_string(), Some("RAG".to_string()), Some(4))
        );
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_reported() {
        let capability = ContentSearchCapability::new(StubIndex::new(SearchResults::default()));

        let output = capability.invoke(&json!({"course_name": "MCP"})).await;
        assert!(output.content.starts_with("Invalid arguments for search_course_content"));
    }

    #[test]
    fn test_schema_requires_only_query() {
        let capability = ContentSearchCapability::new(StubIndex::new(SearchResults::default()));
        let definition = capability.definition();

        assert_eq!(definition.name, "search_course_content");
        assert_eq!(definition.input_schema["required"], json!(["query"]));
        assert!(definition.input_schema["properties"]["lesson_number"].is_object());
    }
}
