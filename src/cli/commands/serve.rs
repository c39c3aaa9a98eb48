//! HTTP API server for the course assistant.
//!
//! Provides REST endpoints for querying and course statistics.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{CourseAnalytics, Orchestrator};
use crate::tools::Source;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, ingest_docs: bool, settings: Settings) -> anyhow::Result<()> {
    let docs_dir = settings.docs_dir();
    let orchestrator = Orchestrator::new(settings)?;

    if ingest_docs {
        if docs_dir.is_dir() {
            let spinner = Output::spinner("Loading course documents...");
            let result = orchestrator.add_course_folder(&docs_dir, false).await;
            spinner.finish_and_clear();
            match result {
                Ok((courses, chunks)) => {
                    info!("Loaded {} courses with {} chunks", courses, chunks);
                    Output::info(&format!("Loaded {} new courses from {}", courses, docs_dir.display()));
                }
                Err(e) => Output::warning(&format!("Could not load documents: {}", e)),
            }
        } else {
            warn!("Docs folder {} does not exist, skipping", docs_dir.display());
        }
    }

    let app = router(orchestrator);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Kurs API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Query", "POST /api/query");
    Output::kv("Courses", "GET  /api/courses");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(orchestrator: Orchestrator) -> Router {
    let state = Arc::new(AppState { orchestrator });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/query", post(query))
        .route("/api/courses", get(courses))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
    sources: Vec<Source>,
    session_id: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error })).into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> impl IntoResponse {
    if req.query.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Query must not be empty".to_string());
    }

    match state
        .orchestrator
        .query(&req.query, req.session_id.as_deref())
        .await
    {
        Ok(answer) => Json(QueryResponse {
            answer: answer.answer,
            sources: answer.sources,
            session_id: answer.session_id,
        })
        .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn courses(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.orchestrator.course_analytics().await {
        Ok(analytics) => Json::<CourseAnalytics>(analytics).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Prompts;
    use crate::embedding::TrigramEmbedder;
    use crate::index::{Course, MemoryVectorStore};
    use crate::llm::{LlmResponse, ScriptedModel};
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn state_with(model: ScriptedModel) -> Arc<AppState> {
        let orchestrator = Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(MemoryVectorStore::new()),
            Arc::new(TrigramEmbedder::new(64)),
            Arc::new(model),
        )
        .unwrap();
        orchestrator
            .index()
            .add_course(&Course::new("Introduction to MCP"))
            .await
            .unwrap();
        Arc::new(AppState { orchestrator })
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_query_returns_answer_and_session() {
        let state = state_with(ScriptedModel::new([LlmResponse::from_text("Hello there")])).await;

        let response = query(
            State(state),
            Json(QueryRequest {
                query: "Hi".to_string(),
                session_id: None,
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["answer"], "Hello there");
        assert_eq!(body["sources"], serde_json::json!([]));
        assert!(!body["session_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_failure_is_internal_error() {
        let model = ScriptedModel::default();
        model.push_error("upstream unavailable");
        let state = state_with(model).await;

        let response = query(
            State(state),
            Json(QueryRequest {
                query: "Hi".to_string(),
                session_id: Some("s1".to_string()),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("upstream unavailable"));
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected() {
        let state = state_with(ScriptedModel::default()).await;
        let response = query(
            State(state),
            Json(QueryRequest {
                query: "   ".to_string(),
                session_id: None,
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_courses_lists_titles() {
        let state = state_with(ScriptedModel::default()).await;
        let response = courses(State(state)).await.into_response();

        let body = body_json(response).await;
        assert_eq!(body["total_courses"], 1);
        assert_eq!(body["course_titles"][0], "Introduction to MCP");
    }
}
