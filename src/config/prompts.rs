//! Prompt templates for Syllabus.
//!
//! Prompts can be customized by placing an `assistant.toml` file in the custom
//! prompts directory.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Prompts used by the course assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    /// Static system instruction sent on every model call.
    pub system: String,
    /// Template wrapping the user's question, with `{{query}}`.
    pub query: String,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            system: r#"You are an AI assistant specialized in course materials and educational content with access to tools for searching course content and retrieving course outlines.

Tool Usage:
- **search_course_content**: Use for questions about specific course content, lessons, or detailed educational materials
- **get_course_outline**: Use for questions about course structure, outline, lesson list, or what a course covers
- **Sequential tool calling**: You can use tools in multiple rounds (up to {{max_tool_rounds}} rounds total) for complex queries
- Synthesize tool results into accurate, fact-based responses
- If a tool yields no results, state this clearly without offering alternatives

Multi-Round Tool Examples:
- "Find courses about X": first get_course_outline for candidate courses, then search_course_content to verify relevance
- "What does lesson 4 of Course X discuss, and which other courses cover it": first search_course_content for lesson 4, then search or outline based on findings

When to Use Each Tool:
- "What does the course cover?", "Show me the lessons", "What's the outline?": use get_course_outline
- "How do I...", "Explain...", "What is..." about course content: use search_course_content

For Outline Queries:
- Return the complete course information: course title, course link, instructor, and all lessons with their numbers and titles
- Present the information clearly and comprehensively

Response Protocol:
- **General knowledge questions**: Answer using existing knowledge without using tools
- **Course-specific questions**: Use the appropriate tool first, then answer
- **No meta-commentary**:
 - Provide direct answers only, without reasoning process, tool explanations, or question-type analysis
 - Do not mention "based on the search results" or "based on the outline"

All responses must be:
1. **Brief, concise and focused**: get to the point quickly
2. **Educational**: maintain instructional value
3. **Clear**: use accessible language
4. **Example-supported**: include relevant examples when they aid understanding
Provide only the direct answer to what was asked."#
                .to_string(),

            query: "Answer this question about course materials: {{query}}".to_string(),

            variables: HashMap::new(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let assistant_path = PathBuf::from(shellexpand::tilde(dir).to_string()).join("assistant.toml");
            if assistant_path.exists() {
                let content = std::fs::read_to_string(&assistant_path)?;
                prompts = toml::from_str(&content)?;
            }
        }

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Only `{{name}}` tokens in the template itself are replaced. Substituted
    /// values are never scanned again, and unknown tokens are left as written.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                rest = &rest[start..];
                break;
            };

            let name = &after[..end];
            match vars.get(name) {
                Some(value) => result.push_str(value),
                None => result.push_str(&rest[start..start + end + 4]),
            }
            rest = &after[end + 2..];
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

    /// System instruction for the given round limit.
    pub fn system_prompt(&self, max_tool_rounds: usize) -> String {
        let vars = HashMap::from([("max_tool_rounds".to_string(), max_tool_rounds.to_string())]);
        self.render_with_custom(&self.system, &vars)
    }

    /// Wrap a user question with the query template.
    pub fn query_prompt(&self, query: &str) -> String {
        let vars = HashMap::from([("query".to_string(), query.to_string())]);
        self.render_with_custom(&self.query, &vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.system.contains("search_course_content"));
        assert!(prompts.system.contains("get_course_outline"));
        assert_eq!(
            prompts.query_prompt("What is MCP?"),
            "Answer this question about course materials: What is MCP?"
        );
    }

    #[test]
    fn test_system_prompt_names_round_limit() {
        let prompts = Prompts::default();
        let system = prompts.system_prompt(2);
        assert!(system.contains("up to 2 rounds total"));
        assert!(!system.contains("{{"));
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
    fn test_render_leaves_unknown_and_unclosed_tokens() {
        let vars = HashMap::from([("name".to_string(), "Ada".to_string())]);
        assert_eq!(
            Prompts::render("{{name}} {{other}} {{name", &vars),
            "Ada {{other}} {{name"
        );
    }

    #[test]
    fn test_query_text_is_not_rendered_again() {
        let vars = HashMap::from([
            ("topic".to_string(), "REPLACED".to_string()),
            ("audience".to_string(), "beginners".to_string()),
        ]);

        // Fresh maps get fresh hash seeds, so repeat to cover iteration orders
        for _ in 0..32 {
            let prompts = Prompts {
                query: "[{{audience}}] {{query}}".to_string(),
                variables: vars.clone(),
                ..Prompts::default()
            };
            assert_eq!(
                prompts.query_prompt("what does {{topic}} mean?"),
                "[beginners] what does {{topic}} mean?"
            );
        }
    }

    #[test]
    fn test_custom_variables_fill_templates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("assistant.toml"),
            "query = \"[{{audience}}] {{query}}\"\n",
        )
        .unwrap();

        let vars = HashMap::from([("audience".to_string(), "beginners".to_string())]);
        let prompts = Prompts::load(dir.path().to_str(), Some(&vars)).unwrap();

        assert_eq!(prompts.query_prompt("What is a test?"), "[beginners] What is a test?");
        // Unspecified fields keep their defaults
        assert!(prompts.system.contains("course materials"));
    }
}
