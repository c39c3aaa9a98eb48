//! Prompt templates for Kurs.
//!
//! Prompts can be customized by placing a `prompts.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub query: QueryPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the question answering loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryPrompts {
    /// System instructions sent with every model call.
    pub system: String,
    /// Appended to the system instructions when the session has history.
    pub history: String,
}

impl Default for QueryPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an assistant for course materials and educational content. You can call two tools to look things up in the indexed courses.

Tools:
- search_course_content: search lesson text. Use it for questions about specific course content or detailed educational material. Pass course_name and/or lesson_number when the user names a course or lesson.
- get_course_outline: fetch a course's title, link and complete lesson list. Use it for questions about what a course covers, its structure or how many lessons it has.

Tool usage rules:
- One tool use per query maximum. Pick the single tool that best fits the question.
- General knowledge questions: answer from your own knowledge without calling a tool.
- Course-specific questions: call the tool first, then answer from its results.
- If a tool returns no results or an error, say so plainly instead of guessing.

Answers:
- Brief, concise and focused. Lead with the answer.
- Do not describe your search process or mention the tools.
- When returning an outline, include the course title, course link and every lesson with its number and title."#
                .to_string(),

            history: r#"

Previous conversation:
{{history}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts with an optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let query_path = custom_path.join("prompts.toml");
            if query_path.exists() {
                let content = std::fs::read_to_string(&query_path)?;
                prompts.query = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// Build the system instructions for one round, folding in session history if any.
    pub fn system_with_history(&self, history: Option<&str>) -> String {
        let system = self.render_with_custom(&self.query.system, &HashMap::new());
        match history {
            Some(history) => {
                // History goes in verbatim after the template variables are rendered.
                let mut vars = self.variables.clone();
                vars.remove("history");
                let suffix = Self::render(&self.query.history, &vars).replace("{{history}}", history);
                format!("{}{}", system, suffix)
            }
            None => system,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_names_tools_and_limits() {
        let prompts = Prompts::default();
        let system = prompts.query.system.to_lowercase();
        assert!(system.contains("course materials"));
        assert!(system.contains("one tool use per query maximum"));
        assert!(prompts.query.system.contains("search_course_content"));
        assert!(prompts.query.system.contains("get_course_outline"));
        assert!(system.contains("general knowledge"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_system_with_history() {
        let prompts = Prompts::default();
        let without = prompts.system_with_history(None);
        let with = prompts.system_with_history(Some("User: hi\nAssistant: hello"));

        assert!(!without.contains("Previous conversation"));
        assert!(with.starts_with(&without));
        assert!(with.ends_with("Previous conversation:\nUser: hi\nAssistant: hello"));
    }

    #[test]
    fn test_history_text_is_not_rendered() {
        let mut vars = HashMap::new();
        vars.insert("school".to_string(), "Evening".to_string());
        vars.insert("history".to_string(), "from config".to_string());
        let prompts = Prompts::load(None, Some(&vars)).unwrap();

        let with = prompts.system_with_history(Some("User: what is {{school}}?\nAssistant: no idea"));
        assert!(with.ends_with("Previous conversation:\nUser: what is {{school}}?\nAssistant: no idea"));
        assert!(!with.contains("from config"));
    }

    #[test]
    fn test_custom_prompts_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("prompts.toml"),
            "system = \"You answer questions about {{school}} courses.\"\n",
        )
        .unwrap();

        let mut vars = HashMap::new();
        vars.insert("school".to_string(), "Evening".to_string());
        let prompts = Prompts::load(dir.path().to_str(), Some(&vars)).unwrap();

        assert_eq!(
            prompts.system_with_history(None),
            "You answer questions about Evening courses."
        );
        // Missing keys in the override fall back to the defaults.
        assert!(prompts.query.history.contains("{{history}}"));
    }
}
