//! Scripted model that replays queued responses.
//!
//! Useful for tests and offline demos: every request is recorded and answered
//! with the next queued response or error.

use super::{LanguageModel, LlmRequest, LlmResponse};
use crate::error::{KursError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

type Scripted = std::result::Result<LlmResponse, String>;

/// Model returning pre-programmed responses in order.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedModel {
    /// Create a model that will return `responses` in order.
    pub fn new(responses: impl IntoIterator<Item = LlmResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue another response.
    pub fn push(&self, response: LlmResponse) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Ok(response));
        }
    }

    /// Queue a transport failure.
    pub fn push_error(&self, message: impl Into<String>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Err(message.into()));
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of queued responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        self.requests
            .lock()
            .map_err(|e| KursError::Llm(format!("Lock poisoned: {}", e)))?
            .push(request.clone());

        let next = self
            .responses
            .lock()
            .map_err(|e| KursError::Llm(format!("Lock poisoned: {}", e)))?
            .pop_front();

        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(KursError::Llm(message)),
            None => Err(KursError::Llm("No scripted response left".to_string())),
        }
    }
}
