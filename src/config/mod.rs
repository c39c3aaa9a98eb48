//! Configuration module for Kurs.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, QueryPrompts};
pub use settings::{
    EmbeddingSettings, GeneralSettings, IndexSettings, IngestSettings, LlmProvider, LlmSettings,
    PromptSettings, SessionSettings, Settings, ToolSettings,
};
