//! Snapshot parsing for agent-browser output
//!
//! Parses the accessibility tree JSON from agent-browser.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::capability::RefTarget;

/// Parsed snapshot from agent-browser
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Snapshot {
    /// Whether the operation succeeded
    #[serde(default)]
    pub success: bool,
    /// Snapshot data
    #[serde(default)]
    pub data: Option<SnapshotData>,
}

/// Snapshot data content
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SnapshotData {
    /// Raw snapshot string (accessibility tree)
    #[serde(default)]
    pub snapshot: String,
    /// Element refs mapped to their info
    #[serde(default)]
    pub refs: HashMap<String, Element>,
}

/// An element in the snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    /// ARIA role
    #[serde(default)]
    pub role: String,
    /// Accessible name
    #[serde(default)]
    pub name: String,
    /// Element value (for inputs)
    #[serde(default)]
    pub value: Option<String>,
    /// Whether element is focused
    #[serde(default)]
    pub focused: bool,
    /// Additional properties
    #[serde(flatten)]
    pub properties: HashMap<String, serde_json::Value>,
}

impl Snapshot {
    /// Count the number of elements with refs
    pub fn count_elements(&self) -> usize {
        self.data.as_ref().map(|d| d.refs.len()).unwrap_or(0)
    }

    /// Get an element by ref
    pub fn get_element(&self, ref_id: &str) -> Option<&Element> {
        // Remove @ prefix if present
        let clean_ref = ref_id.strip_prefix('@').unwrap_or(ref_id);
        self.data.as_ref().and_then(|d| d.refs.get(clean_ref))
    }

    /// Role and name for a ref
    pub fn describe(&self, ref_id: &str) -> Option<RefTarget> {
        self.get_element(ref_id).map(|el| RefTarget {
            role: el.role.clone(),
            name: el.name.clone(),
        })
    }

    /// Get the raw accessibility tree string
    pub fn raw_tree(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.snapshot.as_str())
    }

    /// One line per ref, sorted by ref id
    pub fn format_for_display(&self) -> String {
        let Some(data) = &self.data else {
            return String::new();
        };

        let mut refs: Vec<(&String, &Element)> = data.refs.iter().collect();
        refs.sort_by(|a, b| natural_ref_order(a.0, b.0));

        let mut output = String::new();
        for (ref_id, element) in refs {
            let value_str = element
                .value
                .as_ref()
                .map(|v| format!(" = \"{}\"", v))
                .unwrap_or_default();

            output.push_str(&format!(
                "- {} \"{}\" [ref={}]{}",
                element.role, element.name, ref_id, value_str
            ));

            if element.focused {
                output.push_str(" [focused]");
            }

            output.push('\n');
        }

        output
    }
}

/// `e2` before `e10`
fn natural_ref_order(a: &str, b: &str) -> std::cmp::Ordering {
    let split = |s: &str| {
        let digits = s.trim_start_matches(|c: char| !c.is_ascii_digit());
        (
            s[..s.len() - digits.len()].to_string(),
            digits.parse::<u64>().unwrap_or(0),
        )
    };
    split(a).cmp(&split(b))
}
