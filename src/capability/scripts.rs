//! Page scripts evaluated through [`Page::evaluate`](super::Page::evaluate)
//!
//! Each script is an IIFE returning `JSON.stringify(...)`. Scripts that take
//! an argument contain the `__ARG__` placeholder, filled by [`with_arg`].

use serde::Serialize;

use crate::core::{ExtractError, Result};

/// Every element in document order with its parent index
pub const CAPTURE_DOM: &str = include_str!("scripts/capture_dom.js");

/// outerHTML, matched CSS rules and referenced assets for one selector
pub const EXTRACT: &str = include_str!("scripts/extract.js");

pub const PICKER_INSTALL: &str = include_str!("scripts/picker_install.js");
pub const PICKER_DRAIN: &str = include_str!("scripts/picker_drain.js");
pub const PICKER_LABEL: &str = include_str!("scripts/picker_label.js");
pub const PICKER_TEARDOWN: &str = include_str!("scripts/picker_teardown.js");

const PLACEHOLDER: &str = "__ARG__";

/// Substitute the script argument as a JSON literal
pub fn with_arg<T: Serialize + ?Sized>(script: &str, arg: &T) -> Result<String> {
    let literal = serde_json::to_string(arg)?;
    Ok(script.replace(PLACEHOLDER, &literal))
}

/// Decode what a script evaluation printed.
///
/// Scripts stringify their result, and the CLI may wrap that string in quotes
/// once more, so a JSON string that itself holds JSON is unwrapped.
pub fn decode_eval_output(output: &str) -> Result<serde_json::Value> {
    let trimmed = output.trim();
    if trimmed.is_empty() || trimmed == "undefined" {
        return Ok(serde_json::Value::Null);
    }

    let value: serde_json::Value = serde_json::from_str(trimmed)
        .map_err(|e| ExtractError::browser(format!("Unreadable script output: {}", e)))?;

    match value {
        serde_json::Value::String(inner) => {
            Ok(serde_json::from_str(&inner).unwrap_or(serde_json::Value::String(inner)))
        }
        other => Ok(other),
    }
}
