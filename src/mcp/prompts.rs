//! MCP Prompt Templates
//!
//! Pre-defined prompts that guide AI assistants through design-to-code work.

use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// A prompt argument definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// A prompt template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// A prompt message (the actual content).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: PromptContent,
}

/// Prompt content types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PromptContent {
    Text { text: String },
    Resource { uri: String, mime_type: Option<String> },
}

/// Result of `prompt.list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPromptsResult {
    pub prompts: Vec<Prompt>,
}

/// Result of `prompt.get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptResult {
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

/// Template for generating prompt messages.
///
/// Supports `{{name}}` substitution and `{{#if name}}...{{/if}}` sections that
/// render only when the argument is present and non-empty.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub template: String,
}

fn conditional_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)\{\{#if (\w+)\}\}(.*?)\{\{/if\}\}").expect("static regex is valid")
    })
}

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("static regex is valid"))
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Render with the given arguments. Unknown variables render empty.
    pub fn render(&self, arguments: &HashMap<String, String>) -> String {
        let present = |name: &str| arguments.get(name).is_some_and(|v| !v.is_empty());

        let sections = conditional_pattern().replace_all(&self.template, |caps: &Captures| {
            if present(&caps[1]) {
                caps[2].to_string()
            } else {
                String::new()
            }
        });

        variable_pattern()
            .replace_all(&sections, |caps: &Captures| {
                arguments.get(&caps[1]).cloned().unwrap_or_default()
            })
            .into_owned()
    }
}

/// Prompt registry.
#[derive(Debug, Clone, Default)]
pub struct PromptRegistry {
    prompts: IndexMap<String, (Prompt, PromptTemplate)>,
}

impl PromptRegistry {
    /// Create a new registry with built-in prompts.
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.register_builtin_prompts();
        registry
    }

    /// Register built-in prompts.
    fn register_builtin_prompts(&mut self) {
        self.register(
            Prompt {
                name: "describe_design".to_string(),
                description: "Summarize the structure and visual language of a Figma file"
                    .to_string(),
                arguments: vec![
                    PromptArgument {
                        name: "fileKey".to_string(),
                        description: "Key of the Figma file".to_string(),
                        required: true,
                    },
                    PromptArgument {
                        name: "focus".to_string(),
                        description: "Aspect to emphasize (layout, color, typography)".to_string(),
                        required: false,
                    },
                ],
            },
            PromptTemplate::new(
                r#"Read the resource figma://file/{{fileKey}} and describe the design.

Cover:
1. The page and frame hierarchy
2. Reusable components and their variants
3. The color, text and effect styles in use
{{#if focus}}
Pay particular attention to: {{focus}}{{/if}}"#,
            ),
        );

        self.register(
            Prompt {
                name: "implement_component".to_string(),
                description: "Turn a Figma node into UI code".to_string(),
                arguments: vec![
                    PromptArgument {
                        name: "fileKey".to_string(),
                        description: "Key of the Figma file".to_string(),
                        required: true,
                    },
                    PromptArgument {
                        name: "nodeId".to_string(),
                        description: "Id of the node to implement".to_string(),
                        required: true,
                    },
                    PromptArgument {
                        name: "framework".to_string(),
                        description: "Target framework (react, swiftui, flutter, ...)".to_string(),
                        required: false,
                    },
                ],
            },
            PromptTemplate::new(
                r#"Read the resource figma://file/{{fileKey}}/node/{{nodeId}} and implement it as a component{{#if framework}} using {{framework}}{{/if}}.

Preserve:
1. The element hierarchy and auto-layout settings
2. Fills, strokes, effects and corner radii
3. Text content and typography
4. Constraints that affect responsive behavior"#,
            ),
        );
    }

    /// Register a prompt.
    pub fn register(&mut self, prompt: Prompt, template: PromptTemplate) {
        self.prompts.insert(prompt.name.clone(), (prompt, template));
    }

    /// List all prompts in registration order.
    pub fn list(&self) -> Vec<Prompt> {
        self.prompts.values().map(|(p, _)| p.clone()).collect()
    }

    /// Get a prompt by name with arguments substituted.
    pub fn get(&self, name: &str, arguments: &HashMap<String, String>) -> Result<GetPromptResult> {
        let (prompt, template) = self
            .prompts
            .get(name)
            .ok_or_else(|| Error::PromptNotFound(name.to_string()))?;

        if let Some(missing) = prompt
            .arguments
            .iter()
            .find(|arg| arg.required && !arguments.contains_key(&arg.name))
        {
            return Err(Error::InvalidParams(format!(
                "Missing required prompt argument: {}",
                missing.name
            )));
        }

        Ok(GetPromptResult {
            description: Some(prompt.description.clone()),
            messages: vec![PromptMessage {
                role: "user".to_string(),
                content: PromptContent::Text {
                    text: template.render(arguments),
                },
            }],
        })
    }
}
