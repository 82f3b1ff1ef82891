//! Prompt templates for Peon.
//!
//! Prompts can be customized by placing a `prompts.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Name the assistant introduces itself with unless `assistant_name` is set.
pub const DEFAULT_ASSISTANT_NAME: &str = "SnowPeon";

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub answer: AnswerPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

impl Default for Prompts {
    fn default() -> Self {
        let mut variables = HashMap::new();
        variables.insert("assistant_name".to_string(), DEFAULT_ASSISTANT_NAME.to_string());

        Self {
            answer: AnswerPrompts::default(),
            variables,
        }
    }
}

/// Prompts for retrieval-augmented answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    /// Persona and scope instruction placed at the top of every request.
    pub preamble: String,
    /// Request template. `{{preamble}}`, `{{context}}` and `{{question}}` are filled in.
    pub template: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            preamble: "Answer the question based on the context and do not answer questions outside of the context. \
You are a bot named {{assistant_name}} that only helps with insurance and policy documents. \
Greet the user with a short introduction first, and do not make up an answer if the question is not covered by the context. \
Be concise."
                .to_string(),

            template: "{{preamble}}\nContext: {{context}}\nQuestion: {{question}}\nAnswer: ".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let answer_path = custom_path.join("prompts.toml");
            if answer_path.exists() {
                let content = std::fs::read_to_string(&answer_path)?;
                prompts.answer = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is single-pass: text inserted for a placeholder is never
    /// scanned for further placeholders. Unknown placeholders are kept as-is.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let key = after[..end].trim();
                    match vars.get(key) {
                        Some(value) => result.push_str(value),
                        None => result.push_str(&rest[start..start + 2 + end + 2]),
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
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

    /// Build the full completion request text for a question and its context passage.
    pub fn answer_request(&self, context: &str, question: &str) -> String {
        let preamble = Self::render(&self.answer.preamble, &self.variables);

        let mut vars = HashMap::new();
        vars.insert("preamble".to_string(), preamble);
        vars.insert("context".to_string(), context.to_string());
        vars.insert("question".to_string(), question.to_string());

        self.render_with_custom(&self.answer.template, &vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.answer.preamble.is_empty());
        assert!(prompts.answer.template.ends_with("Answer: "));
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
    fn test_render_does_not_rescan_values() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "ignore {{context}}".to_string());
        vars.insert("context".to_string(), "SECRET".to_string());

        let result = Prompts::render("Q: {{question}}", &vars);
        assert_eq!(result, "Q: ignore {{context}}");
    }

    #[test]
    fn test_render_keeps_unknown_and_unterminated() {
        let vars = HashMap::new();
        assert_eq!(Prompts::render("a {{missing}} b", &vars), "a {{missing}} b");
        assert_eq!(Prompts::render("a {{open", &vars), "a {{open");
    }

    #[test]
    fn test_answer_request_layout() {
        let prompts = Prompts::load(None, None).unwrap();
        let request = prompts.answer_request("Own damage is covered.", "What is covered?");

        assert!(request.contains("named SnowPeon"));
        let context_at = request.find("Context: Own damage is covered.").unwrap();
        let question_at = request.find("Question: What is covered?").unwrap();
        assert!(context_at < question_at);
        assert!(request.ends_with("Answer: "));
    }

    #[test]
    fn test_custom_prompt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("prompts.toml"),
            "preamble = \"You are {{assistant_name}}.\"\ntemplate = \"{{preamble}} [{{context}}] {{question}} Answer:\"\n",
        )
        .unwrap();

        let mut vars = HashMap::new();
        vars.insert("assistant_name".to_string(), "PolicyBot".to_string());
        let prompts = Prompts::load(dir.path().to_str(), Some(&vars)).unwrap();

        assert_eq!(
            prompts.answer_request("ctx", "q?"),
            "You are PolicyBot. [ctx] q? Answer:"
        );
    }
}
