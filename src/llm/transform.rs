//! HTML/CSS to framework component rewriting

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::capability::{TransformRequest, TransformResult, Transformer};
use crate::core::{ExtractError, Framework, Result, Styling};
use crate::llm::json::{parse_json_reply, strip_fence};
use crate::llm::traits::{GenerateOptions, LLMProvider, Message};

/// Markup beyond this many bytes is cut before prompting
const MAX_HTML_BYTES: usize = 60_000;
const MAX_CSS_BYTES: usize = 30_000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransformReply {
    code: String,
    #[serde(default)]
    styles: Option<String>,
    #[serde(default)]
    props_interface: Option<String>,
}

/// [`Transformer`] backed by a code model
pub struct LlmTransformer {
    llm: Arc<dyn LLMProvider>,
    model: String,
}

impl LlmTransformer {
    pub fn new(llm: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    fn system_prompt(framework: Framework, styling: Styling) -> String {
        let framework_rules = match framework {
            Framework::React => {
                "Write a React function component in TypeScript (.tsx). Export it as the default \
                 export and also as a named export. Describe configurable text and links as props \
                 with a `Props` interface."
            }
            Framework::Vue => {
                "Write a Vue 3 single-file component using <script setup lang=\"ts\">. Declare \
                 configurable text and links with defineProps."
            }
            Framework::Svelte => {
                "Write a Svelte component with <script lang=\"ts\">. Declare configurable text and \
                 links as exported props."
            }
        };

        let styling_rules = match styling {
            Styling::Tailwind => "Express all styles as Tailwind utility classes. Leave `styles` null.",
            Styling::Css => "Put styles in a plain CSS file returned in `styles`; use readable class names.",
            Styling::CssModules => {
                "Put styles in a CSS module returned in `styles` and reference classes through the \
                 imported `styles` object."
            }
            Styling::Inline => "Use inline style objects/attributes only. Leave `styles` null.",
        };

        format!(
            "You convert captured HTML and CSS into a clean, self-contained UI component.\n\
             {framework_rules}\n{styling_rules}\n\
             Keep the visual result identical. Drop tracking attributes, inline event handlers and \
             framework-generated ids.\n\n\
             Answer with JSON only:\n\
             {{\"code\": \"...\", \"styles\": \"...\" or null, \"propsInterface\": \"...\" or null}}"
        )
    }

    fn user_prompt(request: &TransformRequest) -> String {
        format!(
            "Component name: {}\n\nHTML:\n{}\n\nCSS:\n{}",
            request.component_name,
            truncate(&request.html, MAX_HTML_BYTES),
            truncate(&request.css, MAX_CSS_BYTES),
        )
    }
}

/// Cut at a char boundary at or below `max` bytes
fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Turn a model reply into code, accepting a bare fenced block as a fallback
fn interpret_reply(content: &str) -> Result<TransformReply> {
    if let Ok(reply) = parse_json_reply::<TransformReply>(content) {
        if !reply.code.trim().is_empty() {
            return Ok(reply);
        }
    }

    let code = strip_fence(content).trim();
    if code.is_empty() || code.starts_with('{') {
        return Err(ExtractError::Llm(
            "Transform answer contained no component code".to_string(),
        ));
    }

    warn!("transform answer was not JSON; using raw code block");
    Ok(TransformReply {
        code: code.to_string(),
        styles: None,
        props_interface: None,
    })
}

#[async_trait]
impl Transformer for LlmTransformer {
    async fn transform(&self, request: TransformRequest) -> Result<TransformResult> {
        let messages = vec![
            Message::system(Self::system_prompt(request.framework, request.styling)),
            Message::user(Self::user_prompt(&request)),
        ];

        let response = self
            .llm
            .chat(&self.model, &messages, Some(GenerateOptions::json()))
            .await?;

        if let Some(usage) = &response.usage {
            debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "transform usage"
            );
        }

        let reply = interpret_reply(&response.content)?;
        let styles = match request.styling {
            Styling::Tailwind | Styling::Inline => None,
            Styling::Css | Styling::CssModules => reply.styles.filter(|s| !s.trim().is_empty()),
        };

        Ok(TransformResult {
            code: reply.code,
            styles,
            filename: format!(
                "{}.{}",
                request.component_name,
                request.framework.extension()
            ),
            props_interface: reply.props_interface.filter(|p| !p.trim().is_empty()),
            styling: request.styling,
        })
    }
}
