//! Registry of capabilities keyed by name.

use super::{Capability, CapabilityOutput};
use crate::error::{KursError, Result};
use crate::llm::{ToolDefinition, ToolUse};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Ordered set of uniquely named capabilities.
pub struct CapabilityRegistry {
    entries: Vec<(ToolDefinition, Arc<dyn Capability>)>,
    max_concurrent: usize,
}

impl CapabilityRegistry {
    /// Create an empty registry dispatching at most `max_concurrent`
    /// invocations at once.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Register a capability. Names must be unique.
    pub fn register(&mut self, capability: Arc<dyn Capability>) -> Result<()> {
        let definition = capability.definition();
        if self.entries.iter().any(|(d, _)| d.name == definition.name) {
            return Err(KursError::DuplicateCapability(definition.name));
        }

        info!("Registered capability {}", definition.name);
        self.entries.push((definition, capability));
        Ok(())
    }

    /// Definitions of all capabilities in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.entries.iter().map(|(d, _)| d.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invoke a capability by name. Unknown names yield a message, not an error.
    #[instrument(skip(self, input))]
    pub async fn dispatch(&self, name: &str, input: &Value) -> CapabilityOutput {
        match self.entries.iter().find(|(d, _)| d.name == name) {
            Some((_, capability)) => {
                debug!("Dispatching {} with {}", name, input);
                capability.invoke(input).await
            }
            None => {
                warn!("Model requested unknown capability {}", name);
                CapabilityOutput::text(format!("Tool '{}' not found", name))
            }
        }
    }

    /// Invoke every call concurrently. Outputs are returned in call order.
    pub async fn dispatch_all(&self, calls: &[ToolUse]) -> Vec<CapabilityOutput> {
        let mut slots: Vec<Option<CapabilityOutput>> = vec![None; calls.len()];

        let futures: Vec<_> = calls
            .iter()
            .enumerate()
            .map(|(idx, call)| async move { (idx, self.dispatch(&call.name, &call.input).await) })
            .collect();
        let mut stream = stream::iter(futures).buffer_unordered(self.max_concurrent);

        while let Some((idx, output)) = stream.next().await {
            slots[idx] = Some(output);
        }

        slots.into_iter().map(Option::unwrap_or_default).collect()
    }
}
