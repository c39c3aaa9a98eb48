//! Pre-flight checks before expensive operations.
//!
//! Validates configuration and API keys before starting operations that would
//! otherwise fail midway.

use crate::config::{LlmProvider, Settings};
use crate::error::{KursError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering questions needs the model key and, for search, embeddings.
    Ask,
    /// Indexing needs embeddings.
    Ingest,
    /// Listing courses only reads the index.
    Browse,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    settings.validate()?;

    match operation {
        Operation::Ask => {
            check_model_key(settings)?;
            check_embedding_key(settings)?;
        }
        Operation::Ingest => {
            check_embedding_key(settings)?;
        }
        Operation::Browse => {}
    }
    Ok(())
}

fn check_model_key(settings: &Settings) -> Result<()> {
    match settings.llm.provider {
        LlmProvider::Anthropic => check_api_key(&settings.llm.api_key_env),
        // The OpenAI client falls back to OPENAI_API_KEY.
        LlmProvider::OpenAI => check_api_key(&settings.llm.api_key_env)
            .or_else(|_| check_api_key("OPENAI_API_KEY")),
    }
}

fn check_embedding_key(settings: &Settings) -> Result<()> {
    if settings.embedding.provider.eq_ignore_ascii_case("openai") {
        check_api_key("OPENAI_API_KEY")?;
    }
    Ok(())
}

/// Check if an API key environment variable is set.
fn check_api_key(var: &str) -> Result<()> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(()),
        Ok(_) => Err(KursError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            var, var
        ))),
        Err(_) => Err(KursError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            var, var
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browse_has_no_key_requirements() {
        assert!(check(Operation::Browse, &Settings::default()).is_ok());
    }

    #[test]
    fn test_invalid_settings_fail_preflight() {
        let mut settings = Settings::default();
        settings.index.max_results = 0;
        assert!(check(Operation::Browse, &settings).is_err());
    }

    #[test]
    fn test_missing_key_is_reported_by_name() {
        let err = check_api_key("KURS_TEST_KEY_THAT_IS_NEVER_SET").unwrap_err();
        assert!(err.to_string().contains("KURS_TEST_KEY_THAT_IS_NEVER_SET not set"));
    }
}
