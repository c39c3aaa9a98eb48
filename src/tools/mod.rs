//! Capabilities the model can invoke during a query.
//!
//! Each capability publishes a [`ToolDefinition`] and returns its result as
//! text plus the sources it drew on. Failures are rendered into the text so the
//! model can read them; they never abort the query.

mod outline;
mod registry;
mod search;

pub use outline::{OutlineCapability, OUTLINE_TOOL_NAME};
pub use registry::CapabilityRegistry;
pub use search::{ContentSearchCapability, SEARCH_TOOL_NAME};

use crate::llm::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A citation returned alongside an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// `<course> - Lesson <n>` or just `<course>`.
    pub text: String,
    pub link: Option<String>,
}

/// Result of one capability invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilityOutput {
    pub content: String,
    pub sources: Vec<Source>,
}

impl CapabilityOutput {
    /// Output with text only.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sources: Vec::new(),
        }
    }
}

/// A named action the model can request.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Name, description and input schema.
    fn definition(&self) -> ToolDefinition;

    /// Run with model-supplied input.
    async fn invoke(&self, input: &Value) -> CapabilityOutput;
}

/// Deserialize tool input, rendering failures as model-readable text.
pub(crate) fn parse_input<T: serde::de::DeserializeOwned>(
    tool: &str,
    input: &Value,
) -> std::result::Result<T, CapabilityOutput> {
    serde_json::from_value(input.clone()).map_err(|e| {
        CapabilityOutput::text(format!("Invalid arguments for {}: {}", tool, e))
    })
}
