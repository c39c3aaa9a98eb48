//! Kurs - Question answering over course materials
//!
//! Indexes course scripts into a semantic index and answers questions with a
//! language model that may call a search or outline capability once per query.
//!
//! # Overview
//!
//! Kurs allows you to:
//! - Index course scripts with lessons and links
//! - Ask questions and get answers with lesson citations
//! - Keep short conversations going across follow-up questions
//! - Serve the assistant over a small HTTP API
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `document` - Course script parsing and chunking
//! - `embedding` - Embedding generation
//! - `index` - Vector stores, course catalog and the semantic index
//! - `llm` - Language model adapters
//! - `tools` - Capabilities the model can call, and their registry
//! - `rag` - Query engine and conversation sessions
//! - `orchestrator` - Wiring and ingestion
//!
//! # Example
//!
//! ```rust,no_run
//! use kurs::config::Settings;
//! use kurs::orchestrator::Orchestrator;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     orchestrator.add_course_folder(Path::new("docs"), false).await?;
//!
//!     let answer = orchestrator.query("What is covered in lesson 1 of the MCP course?", None).await?;
//!     println!("{}", answer.answer);
//!     for source in &answer.sources {
//!         println!("- {}", source.text);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod tools;

pub use error::{KursError, Result};
