//! Script-backed extract capability

use async_trait::async_trait;
use tracing::debug;

use crate::capability::scripts::{self, with_arg};
use crate::capability::{ExtractResult, Extractor, Page};
use crate::core::{ExtractError, Result};

/// Pulls markup, matched rules and assets by evaluating a script in the page
#[derive(Debug, Clone, Default)]
pub struct DomExtractor;

#[async_trait]
impl Extractor for DomExtractor {
    async fn extract(&self, page: &dyn Page, selector: &str) -> Result<ExtractResult> {
        let script = with_arg(scripts::EXTRACT, selector)?;
        let value = page.evaluate(&script).await?;

        if value.is_null() {
            return Err(ExtractError::not_found(selector));
        }

        let result: ExtractResult = serde_json::from_value(value)?;
        debug!(
            selector,
            assets = result.assets.len(),
            "extracted element"
        );
        Ok(result)
    }
}
