//! `get_course_outline`: course title, link and lesson list.

use super::{parse_input, Capability, CapabilityOutput};
use crate::index::{CourseIndex, CourseOutline};
use crate::llm::ToolDefinition;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub const OUTLINE_TOOL_NAME: &str = "get_course_outline";

#[derive(Debug, Deserialize)]
struct OutlineArgs {
    course_name: String,
}

/// Renders the outline of the course best matching a name.
pub struct OutlineCapability {
    index: Arc<dyn CourseIndex>,
}

impl OutlineCapability {
    pub fn new(index: Arc<dyn CourseIndex>) -> Self {
        Self { index }
    }

    pub async fn outline(&self, course_name: &str) -> CapabilityOutput {
        match self.index.get_course_outline(course_name).await {
            Some(outline) => CapabilityOutput::text(render(&outline)),
            None => CapabilityOutput::text(format!("No course found matching '{}'", course_name)),
        }
    }
}

fn render(outline: &CourseOutline) -> String {
    let mut lines = vec![format!("Course: {}", outline.title)];
    if let Some(link) = &outline.link {
        lines.push(format!("Course Link: {}", link));
    }
    lines.push(format!("Lessons ({}):", outline.lessons.len()));
    lines.extend(
        outline
            .lessons
            .iter()
            .map(|l| format!("Lesson {}: {}", l.number, l.title)),
    );
    lines.join("\n")
}

#[async_trait]
impl Capability for OutlineCapability {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: OUTLINE_TOOL_NAME.to_string(),
            description: "Get the outline of a course: title, course link and the numbered list of lessons"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    }
                },
                "required": ["course_name"]
            }),
        }
    }

    async fn invoke(&self, input: &Value) -> CapabilityOutput {
        match parse_input::<OutlineArgs>(OUTLINE_TOOL_NAME, input) {
            Ok(args) => self.outline(&args.course_name).await,
            Err(output) => output,
        }
    }
}
