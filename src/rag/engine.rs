//! Query engine: one model call, at most one tool round, one final call.

use super::session::ConversationStore;
use crate::config::{LlmSettings, Prompts};
use crate::error::{KursError, Result};
use crate::llm::{
    ContentBlock, LanguageModel, LlmRequest, LlmResponse, Message, StopReason, ToolDefinition,
};
use crate::tools::{CapabilityRegistry, Source};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Answer to a query with the sources the capabilities drew on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<Source>,
    pub session_id: String,
}

/// Drives a query through the model and the capability registry.
pub struct QueryEngine {
    model: Arc<dyn LanguageModel>,
    registry: CapabilityRegistry,
    sessions: ConversationStore,
    prompts: Prompts,
    max_tokens: u32,
    temperature: f32,
}

impl QueryEngine {
    /// Create an engine. Sampling parameters come from `llm`.
    pub fn new(
        model: Arc<dyn LanguageModel>,
        registry: CapabilityRegistry,
        sessions: ConversationStore,
        prompts: Prompts,
        llm: &LlmSettings,
    ) -> Self {
        Self {
            model,
            registry,
            sessions,
            prompts,
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &ConversationStore {
        &self.sessions
    }

    /// Answer `query` within a session, creating one when `session_id` is absent.
    ///
    /// The session is locked for the whole round, so concurrent queries on one
    /// session are serialized. Model failures propagate and leave the session
    /// untouched.
    #[instrument(skip(self), fields(provider = self.model.provider_name()))]
    pub async fn answer(&self, query: &str, session_id: Option<&str>) -> Result<Answer> {
        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => self.sessions.create().await,
        };

        let session = self.sessions.session(&session_id).await;
        let mut session = session.lock().await;

        let history = session.formatted_history();
        let system = self.prompts.system_with_history(history.as_deref());
        let messages = vec![Message::user(query)];

        let first = self
            .complete(&system, messages.clone(), self.registry.definitions())
            .await?;

        let (answer, sources) = if first.stop_reason == StopReason::ToolUse {
            self.tool_round(&system, messages, first).await?
        } else {
            debug!("Answered directly ({:?})", first.stop_reason);
            (first.text(), Vec::new())
        };

        session.add_exchange(query, &answer);
        info!("Answered with {} sources", sources.len());

        Ok(Answer {
            answer,
            sources,
            session_id,
        })
    }

    async fn tool_round(
        &self,
        system: &str,
        mut messages: Vec<Message>,
        first: LlmResponse,
    ) -> Result<(String, Vec<Source>)> {
        let calls = first.tool_uses();
        if calls.is_empty() {
            return Err(KursError::Llm(
                "Model stopped for tool use without requesting a tool".to_string(),
            ));
        }

        info!("Executing {} tool calls", calls.len());
        let outputs = self.registry.dispatch_all(&calls).await;

        let mut sources = Vec::new();
        let mut results = Vec::with_capacity(calls.len());
        for (call, output) in calls.iter().zip(outputs) {
            sources.extend(output.sources);
            results.push(ContentBlock::tool_result(call.id.as_str(), output.content));
        }

        messages.push(Message::assistant(first.content));
        messages.push(Message::tool_results(results));

        let last = self.complete(system, messages, Vec::new()).await?;
        let ignored = last.tool_uses();
        if !ignored.is_empty() {
            warn!(
                "Ignoring {} tool requests in final response: only one tool round is allowed",
                ignored.len()
            );
        }

        Ok((last.text(), sources))
    }

    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
    ) -> Result<LlmResponse> {
        let request = LlmRequest {
            system: system.to_string(),
            messages,
            tools,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        self.model.complete(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{CourseIndex, CourseOutline, Lesson, SearchResults};
    use crate::index::{ChunkMetadata, SearchHit};
    use crate::llm::{Role, ScriptedModel};
    use crate::tools::{ContentSearchCapability, OutlineCapability};
    use async_trait::async_trait;
    use serde_json::json;

    struct StubIndex;

    #[async_trait]
    impl CourseIndex for StubIndex {
        async fn search(
            &self,
            query: &str,
            _course_name: Option<&str>,
            lesson_number: Option<u32>,
        ) -> SearchResults {
            if query == "nothing" {
                return SearchResults::default();
            }
            SearchResults::from_hits(vec![SearchHit {
                document: format!("Notes about {}", query),
                metadata: ChunkMetadata {
                    course_title: Some("Intro to RAG".to_string()),
                    lesson_number: Some(lesson_number.unwrap_or(1)),
                    chunk_index: Some(0),
                },
                distance: 0.1,
            }])
        }

        async fn get_lesson_link(&self, _course_title: &str, lesson_number: u32) -> Option<String> {
            Some(format!("https://example.com/rag/{}", lesson_number))
        }

        async fn get_course_outline(&self, _course_name: &str) -> Option<CourseOutline> {
            Some(CourseOutline {
                title: "Intro to RAG".to_string(),
                link: None,
                lessons: vec![Lesson {
                    number: 1,
                    title: "Embeddings".to_string(),
                    link: None,
                }],
            })
        }
    }

    fn engine(model: Arc<ScriptedModel>, max_history: usize) -> QueryEngine {
        let index: Arc<dyn CourseIndex> = Arc::new(StubIndex);
        let mut registry = CapabilityRegistry::new(4);
        registry
            .register(Arc::new(ContentSearchCapability::new(index.clone())))
            .unwrap();
        registry
            .register(Arc::new(OutlineCapability::new(index)))
            .unwrap();

        QueryEngine::new(
            model,
            registry,
            ConversationStore::new(max_history),
            Prompts::default(),
            &LlmSettings::default(),
        )
    }

    fn tool_call(id: &str, name: &str, input: serde_json::Value) -> ContentBlock {
        ContentBlock::tool_use(id, name, input)
    }

    #[tokio::test]
    async fn test_direct_answer_makes_one_call_without_sources() {
        let model = Arc::new(ScriptedModel::new(vec![LlmResponse::from_text(
            "Machine learning is learning from data.",
        )]));
        let engine = engine(model.clone(), 2);

        let answer = engine.answer("What is machine learning?", None).await.unwrap();

        assert_eq!(answer.answer, "Machine learning is learning from data.");
        assert!(answer.sources.is_empty());
        assert!(!answer.session_id.is_empty());

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages, vec![Message::user("What is machine learning?")]);
        assert_eq!(requests[0].tools.len(), 2);
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].max_tokens, 800);
        assert!(!requests[0].system.contains("Previous conversation"));
    }

    #[tokio::test]
    async fn test_tool_round_sends_results_and_returns_sources() {
        let model = Arc::new(ScriptedModel::new(vec![
            LlmResponse::new(
                vec![
                    ContentBlock::text("Let me search."),
                    tool_call("toolu_1", "search_course_content", json!({"query": "embeddings"})),
                ],
                StopReason::ToolUse,
            ),
            LlmResponse::from_text("Embeddings map text to vectors."),
        ]));
        let engine = engine(model.clone(), 2);

        let answer = engine.answer("Explain embeddings", None).await.unwrap();

        assert_eq!(answer.answer, "Embeddings map text to vectors.");
        assert_eq!(
            answer.sources,
            vec![Source {
                text: "Intro to RAG - Lesson 1".to_string(),
                link: Some("https://example.com/rag/1".to_string()),
            }]
        );

        let requests = model.requests();
        assert_eq!(requests.len(), 2);

        let second = &requests[1];
        assert!(second.tools.is_empty());
        assert_eq!(second.messages.len(), 3);
        assert_eq!(second.messages[0], Message::user("Explain embeddings"));
        assert_eq!(second.messages[1].role, Role::Assistant);
        assert_eq!(second.messages[1].content.len(), 2);
        assert_eq!(second.messages[2].role, Role::User);
        assert_eq!(
            second.messages[2].content,
            vec![ContentBlock::tool_result(
                "toolu_1",
                "[Intro to RAG - Lesson 1]\nNotes about embeddings"
            )]
        );
    }

    #[tokio::test]
    async fn test_multiple_tool_calls_share_one_result_message() {
        let model = Arc::new(ScriptedModel::new(vec![
            LlmResponse::new(
                vec![
                    tool_call("a", "get_course_outline", json!({"course_name": "RAG"})),
                    tool_call("b", "search_course_content", json!({"query": "vectors", "lesson_number": 2})),
                    tool_call("c", "delete_everything", json!({})),
                ],
                StopReason::ToolUse,
            ),
            LlmResponse::from_text("Done."),
        ]));
        let engine = engine(model.clone(), 2);

        let answer = engine.answer("Outline and search", None).await.unwrap();
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].text, "Intro to RAG - Lesson 2");

        let requests = model.requests();
        let results = &requests[1].messages[2].content;
        assert_eq!(results.len(), 3);

        let ids: Vec<&str> = results
            .iter()
            .map(|block| match block {
                ContentBlock::ToolResult { tool_use_id, .. } => tool_use_id.as_str(),
                _ => panic!("expected tool result"),
            })
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        match &results[2] {
            ContentBlock::ToolResult { content, .. } => {
                assert_eq!(content, "Tool 'delete_everything' not found")
            }
            _ => panic!("expected tool result"),
        }
    }

    #[tokio::test]
    async fn test_second_tool_request_is_not_executed() {
        let model = Arc::new(ScriptedModel::new(vec![
            LlmResponse::new(
                vec![tool_call("a", "search_course_content", json!({"query": "nothing"}))],
                StopReason::ToolUse,
            ),
            LlmResponse::new(
                vec![
                    ContentBlock::text("Nothing relevant was found."),
                    tool_call("b", "search_course_content", json!({"query": "again"})),
                ],
                StopReason::ToolUse,
            ),
        ]));
        let engine = engine(model.clone(), 2);

        let answer = engine.answer("Find nothing", None).await.unwrap();

        assert_eq!(answer.answer, "Nothing relevant was found.");
        assert!(answer.sources.is_empty());
        assert_eq!(model.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_history_is_folded_into_system_prompt() {
        let model = Arc::new(ScriptedModel::new(vec![
            LlmResponse::from_text("First answer"),
            LlmResponse::from_text("Second answer"),
        ]));
        let engine = engine(model.clone(), 2);

        let first = engine.answer("First question", None).await.unwrap();
        let second = engine
            .answer("Second question", Some(&first.session_id))
            .await
            .unwrap();
        assert_eq!(second.session_id, first.session_id);

        let requests = model.requests();
        assert!(requests[1]
            .system
            .ends_with("\n\nPrevious conversation:\nUser: First question\nAssistant: First answer"));
        assert_eq!(requests[1].messages, vec![Message::user("Second question")]);
    }

    #[tokio::test]
    async fn test_model_failure_leaves_session_untouched() {
        let model = Arc::new(ScriptedModel::new(Vec::new()));
        model.push_error("connection refused");
        let engine = engine(model.clone(), 2);

        let result = engine.answer("Hello?", Some("fixed-session")).await;
        assert!(matches!(result, Err(KursError::Llm(_))));
        assert!(engine.sessions().formatted_history("fixed-session").await.is_none());
    }

    #[tokio::test]
    async fn test_tool_stop_without_tool_blocks_is_an_error() {
        let model = Arc::new(ScriptedModel::new(vec![LlmResponse::new(
            vec![ContentBlock::text("I will use a tool")],
            StopReason::ToolUse,
        )]));
        let engine = engine(model.clone(), 2);

        let result = engine.answer("Hello?", None).await;
        assert!(matches!(result, Err(KursError::Llm(_))));
        assert_eq!(model.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_sources_do_not_leak_between_queries() {
        let model = Arc::new(ScriptedModel::new(vec![
            LlmResponse::new(
                vec![tool_call("a", "search_course_content", json!({"query": "vectors"}))],
                StopReason::ToolUse,
            ),
            LlmResponse::from_text("Vectors."),
            LlmResponse::from_text("Hi there."),
        ]));
        let engine = engine(model, 2);

        let first = engine.answer("Search vectors", None).await.unwrap();
        assert_eq!(first.sources.len(), 1);

        let second = engine.answer("Say hi", None).await.unwrap();
        assert!(second.sources.is_empty());
        assert_ne!(first.session_id, second.session_id);
    }

    #[tokio::test]
    async fn test_concurrent_queries_on_one_session_do_not_interleave() {
        let model = Arc::new(ScriptedModel::new(vec![
            LlmResponse::from_text("A1"),
            LlmResponse::from_text("A2"),
        ]));
        let engine = Arc::new(engine(model.clone(), 2));

        let (a, b) = tokio::join!(
            engine.answer("Q1", Some("shared")),
            engine.answer("Q2", Some("shared"))
        );
        a.unwrap();
        b.unwrap();

        let requests = model.requests();
        let with_history = requests
            .iter()
            .filter(|r| r.system.contains("Previous conversation"))
            .count();
        assert_eq!(with_history, 1);

        let history = engine.sessions().formatted_history("shared").await.unwrap();
        assert_eq!(history.matches("User: ").count(), 2);
    }
}
