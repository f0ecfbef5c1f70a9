//! Natural-language element location over an accessibility tree

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::capability::resolve::resolve_ref;
use crate::capability::{LocateResult, Locator, Page};
use crate::core::{ExtractError, Result};
use crate::llm::json::parse_json_reply;
use crate::llm::traits::{GenerateOptions, LLMProvider, Message};
use crate::selector::{SelectorSynthesizer, SynthesizerOptions};

const SYSTEM_PROMPT: &str = r#"You locate UI elements in an accessibility tree.
Each line of the tree describes one element and may carry a [ref=eN] marker.
Pick the single element that best matches the user's description. Prefer the
container of a whole component over one of its children when the description
names a component ("pricing card", "navbar").

Answer with JSON only:
{"ref": "eN" or null, "confidence": 0.0-1.0, "reasoning": "one sentence"}
Use null when nothing in the tree matches."#;

/// Raw model answer; `ref` may come back as a number or with an `@`
#[derive(Debug, Deserialize)]
struct LocateReply {
    #[serde(rename = "ref", default)]
    reference: Option<serde_json::Value>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// [`Locator`] backed by a chat model
pub struct LlmLocator {
    llm: Arc<dyn LLMProvider>,
    model: String,
    synthesizer: SelectorSynthesizer,
}

impl LlmLocator {
    pub fn new(llm: Arc<dyn LLMProvider>, model: impl Into<String>, options: SynthesizerOptions) -> Self {
        Self {
            llm,
            model: model.into(),
            synthesizer: SelectorSynthesizer::new(options),
        }
    }

    fn messages(tree: &str, query: &str) -> Vec<Message> {
        vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(format!(
                "Accessibility tree:\n{}\n\nFind: {}",
                tree.trim(),
                query.trim()
            )),
        ]
    }
}

/// Normalise the model's ref into `eN` form, dropping empty answers
fn clean_ref(value: Option<serde_json::Value>) -> Option<String> {
    let raw = match value? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => format!("e{}", n),
        _ => return None,
    };

    let trimmed = raw
        .trim()
        .trim_start_matches('@')
        .trim_start_matches("ref=")
        .trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[async_trait]
impl Locator for LlmLocator {
    async fn locate(&self, tree: &str, query: &str) -> Result<LocateResult> {
        let response = self
            .llm
            .chat(&self.model, &Self::messages(tree, query), Some(GenerateOptions::json()))
            .await?;

        let reply: LocateReply = parse_json_reply(&response.content)
            .map_err(|e| ExtractError::Llm(format!("Unusable locate answer: {}", e)))?;

        let result = LocateResult {
            reference: clean_ref(reply.reference),
            confidence: reply.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
            reasoning: reply.reasoning.unwrap_or_default(),
        };
        debug!(
            query,
            reference = ?result.reference,
            confidence = result.confidence,
            "locate answered"
        );
        Ok(result)
    }

    async fn resolve_ref(&self, page: &dyn Page, reference: &str) -> Result<Option<String>> {
        resolve_ref(page, reference, &self.synthesizer).await
    }
}
