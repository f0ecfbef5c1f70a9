//! Unique selector synthesis
//!
//! Tries, in order: id, tag + class combination, data attributes, aria label,
//! and finally a bounded ancestor path disambiguated with `:nth-of-type`.
//! The first candidate the oracle reports as unique wins.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::config::SelectorConfig;
use crate::selector::dom::{DomTree, NodeId};
use crate::selector::matcher::MatchOracle;

/// Which rule produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Id,
    Class,
    DataAttr,
    AriaLabel,
    Path,
}

/// A selector that was tried during synthesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorCandidate {
    pub strategy: Strategy,
    pub value: String,
    pub is_unique: bool,
}

/// Outcome of a synthesis run, with every candidate that was evaluated
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub selector: String,
    pub strategy: Strategy,
    pub candidates: Vec<SelectorCandidate>,
}

/// Tuning for [`SelectorSynthesizer`]
#[derive(Debug, Clone)]
pub struct SynthesizerOptions {
    /// Maximum ancestor levels for the path strategy
    pub max_depth: usize,
    /// Classes at or above this length are skipped in path segments
    pub max_class_len: usize,
    /// Ids, classes and attribute values containing this are never used
    pub reserved_prefix: String,
    /// Tags the path walk stops at
    pub boundary_tags: Vec<String>,
}

impl Default for SynthesizerOptions {
    fn default() -> Self {
        Self::from(&SelectorConfig::default())
    }
}

impl From<&SelectorConfig> for SynthesizerOptions {
    fn from(config: &SelectorConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_class_len: config.max_class_len,
            reserved_prefix: config.reserved_prefix.clone(),
            boundary_tags: vec!["body".to_string(), "html".to_string()],
        }
    }
}

/// Computes a selector intended to match exactly one node
#[derive(Debug, Clone, Default)]
pub struct SelectorSynthesizer {
    options: SynthesizerOptions,
}

impl SelectorSynthesizer {
    pub fn new(options: SynthesizerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SynthesizerOptions {
        &self.options
    }

    /// Selector for `node`, or `None` if the node is not in the tree
    pub fn synthesize<O>(&self, tree: &DomTree, node: NodeId, oracle: &O) -> Option<String>
    where
        O: MatchOracle + ?Sized,
    {
        self.synthesize_detailed(tree, node, oracle)
            .map(|s| s.selector)
    }

    /// Like [`synthesize`](Self::synthesize) but keeps the candidate trail
    pub fn synthesize_detailed<O>(
        &self,
        tree: &DomTree,
        node: NodeId,
        oracle: &O,
    ) -> Option<Synthesis>
    where
        O: MatchOracle + ?Sized,
    {
        let el = tree.node(node)?;
        let mut candidates = Vec::new();

        let mut attempt = |strategy: Strategy, value: String| -> Option<Synthesis> {
            let is_unique = oracle.count(&value) == 1;
            trace!(?strategy, selector = %value, is_unique, "selector candidate");
            candidates.push(SelectorCandidate {
                strategy,
                value: value.clone(),
                is_unique,
            });
            is_unique.then(|| Synthesis {
                selector: value,
                strategy,
                candidates: Vec::new(),
            })
        };

        // 1. id
        if let Some(id) = el.id.as_deref().filter(|id| self.usable(id)) {
            if let Some(found) = attempt(Strategy::Id, format!("#{}", css_escape(id))) {
                return Some(found.with_candidates(candidates));
            }
        }

        // 2. tag + every usable class
        let classes: Vec<&str> = el
            .classes
            .iter()
            .map(String::as_str)
            .filter(|c| self.usable(c))
            .collect();
        if !classes.is_empty() {
            let mut selector = css_escape(&el.tag);
            for class in &classes {
                selector.push('.');
                selector.push_str(&css_escape(class));
            }
            if let Some(found) = attempt(Strategy::Class, selector) {
                return Some(found.with_candidates(candidates));
            }
        }

        // 3. data attributes
        for (name, value) in el.data_attributes() {
            if value.is_empty() || !self.usable(name) || !self.usable(value) {
                continue;
            }
            let selector = format!("[{}=\"{}\"]", css_escape(name), escape_attr_value(value));
            if let Some(found) = attempt(Strategy::DataAttr, selector) {
                return Some(found.with_candidates(candidates));
            }
        }

        // 4. aria label
        if let Some(label) = el.aria_label().filter(|l| self.usable(l)) {
            let selector = format!("[aria-label=\"{}\"]", escape_attr_value(label));
            if let Some(found) = attempt(Strategy::AriaLabel, selector) {
                return Some(found.with_candidates(candidates));
            }
        }

        // 5. bounded ancestor path
        let mut path: Vec<String> = Vec::new();
        let mut current = Some(node);
        let mut depth = 0;

        while let Some(cur) = current {
            if depth >= self.options.max_depth {
                break;
            }
            let Some(level) = tree.node(cur) else { break };
            if self.options.boundary_tags.iter().any(|t| *t == level.tag) {
                break;
            }

            let mut segment = css_escape(&level.tag);
            if let Some(class) = level.classes.iter().find(|c| self.is_safe_class(c)) {
                segment.push('.');
                segment.push_str(&css_escape(class));
            }

            let candidate = join_path(&segment, &path);
            if let Some(found) = attempt(Strategy::Path, candidate) {
                return Some(found.with_candidates(candidates));
            }

            let (index, same_tag) = tree.nth_of_type(cur);
            if same_tag > 1 {
                segment.push_str(&format!(":nth-of-type({})", index));
            }
            path.insert(0, segment);

            current = tree.parent(cur);
            depth += 1;
        }

        // Best effort past the depth bound; the node's tag is the last resort.
        let selector = if path.is_empty() {
            css_escape(&el.tag)
        } else {
            path.join(" > ")
        };

        Some(Synthesis {
            selector,
            strategy: Strategy::Path,
            candidates,
        })
    }

    /// Not empty and outside the reserved namespace
    fn usable(&self, value: &str) -> bool {
        !value.is_empty() && !self.is_internal(value)
    }

    fn is_internal(&self, value: &str) -> bool {
        !self.options.reserved_prefix.is_empty() && value.contains(&self.options.reserved_prefix)
    }

    fn is_safe_class(&self, class: &str) -> bool {
        self.usable(class) && class.chars().count() < self.options.max_class_len
    }
}

impl Synthesis {
    fn with_candidates(mut self, candidates: Vec<SelectorCandidate>) -> Self {
        self.candidates = candidates;
        self
    }
}

fn join_path(head: &str, tail: &[String]) -> String {
    if tail.is_empty() {
        head.to_string()
    } else {
        format!("{} > {}", head, tail.join(" > "))
    }
}

/// Escape an identifier the way `CSS.escape` does
pub fn css_escape(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len());

    for (i, &c) in chars.iter().enumerate() {
        let code = c as u32;
        if code == 0 {
            out.push('\u{FFFD}');
        } else if (0x1..=0x1f).contains(&code)
            || code == 0x7f
            || (i == 0 && c.is_ascii_digit())
            || (i == 1 && c.is_ascii_digit() && chars[0] == '-')
        {
            out.push_str(&format!("\\{:x} ", code));
        } else if i == 0 && c == '-' && chars.len() == 1 {
            out.push_str("\\-");
        } else if code >= 0x80 || c == '-' || c == '_' || c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }

    out
}

/// Escape a value for use inside a double-quoted attribute selector
pub fn escape_attr_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\{:x} ", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::dom::DomNode;

    fn synth() -> SelectorSynthesizer {
        SelectorSynthesizer::default()
    }

    #[test]
    fn test_css_escape() {
        assert_eq!(css_escape("hero"), "hero");
        assert_eq!(css_escape("1col"), "\\31 col");
        assert_eq!(css_escape("-2x"), "-\\32 x");
        assert_eq!(css_escape("md:flex"), "md\\:flex");
        assert_eq!(css_escape("w-1/2"), "w-1\\/2");
        assert_eq!(css_escape("-"), "\\-");
    }

    #[test]
    fn test_escape_attr_value() {
        assert_eq!(escape_attr_value(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_attr_value("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_id_wins() {
        let mut tree = DomTree::new();
        let body = tree.push(DomNode::element("body"), None);
        let node = tree.push(
            DomNode::element("div").with_id("pricing").with_classes(&["card"]),
            Some(body),
        );

        let result = synth().synthesize_detailed(&tree, node, &tree).unwrap();
        assert_eq!(result.selector, "#pricing");
        assert_eq!(result.strategy, Strategy::Id);
        assert_eq!(result.candidates.len(), 1);
    }

    #[test]
    fn test_duplicate_id_falls_through_to_classes() {
        let mut tree = DomTree::new();
        let body = tree.push(DomNode::element("body"), None);
        tree.push(DomNode::element("span").with_id("dup"), Some(body));
        let node = tree.push(
            DomNode::element("div")
                .with_id("dup")
                .with_classes(&["card", "featured"]),
            Some(body),
        );

        let result = synth().synthesize_detailed(&tree, node, &tree).unwrap();
        assert_eq!(result.selector, "div.card.featured");
        assert_eq!(result.strategy, Strategy::Class);
        assert!(!result.candidates[0].is_unique);
    }

    #[test]
    fn test_data_attr_then_aria() {
        let mut tree = DomTree::new();
        let body = tree.push(DomNode::element("body"), None);
        tree.push(
            DomNode::element("button").with_attr("data-kind", "primary"),
            Some(body),
        );
        let node = tree.push(
            DomNode::element("button")
                .with_attr("data-kind", "primary")
                .with_attr("data-empty", "")
                .with_attr("data-testid", "checkout"),
            Some(body),
        );
        let labelled = tree.push(
            DomNode::element("button").with_attr("aria-label", "Close dialog"),
            Some(body),
        );

        assert_eq!(
            synth().synthesize(&tree, node, &tree).unwrap(),
            r#"[data-testid="checkout"]"#
        );
        assert_eq!(
            synth().synthesize(&tree, labelled, &tree).unwrap(),
            r#"[aria-label="Close dialog"]"#
        );
    }

    #[test]
    fn test_unknown_node() {
        let tree = DomTree::new();
        assert!(synth().synthesize(&tree, 3, &tree).is_none());
    }

    #[test]
    fn test_boundary_node_falls_back_to_tag() {
        let mut tree = DomTree::new();
        let html = tree.push(DomNode::element("html"), None);
        let body = tree.push(DomNode::element("body"), Some(html));
        let selector = synth().synthesize(&tree, body, &|_: &str| 0).unwrap();
        assert_eq!(selector, "body");
    }

    #[test]
    fn test_path_uses_one_safe_class() {
        let mut tree = DomTree::new();
        let body = tree.push(DomNode::element("body"), None);
        let main = tree.push(
            DomNode::element("main").with_classes(&["a-very-long-generated-class-name-xyz", "layout"]),
            Some(body),
        );
        let node = tree.push(DomNode::element("p"), Some(main));
        tree.push(DomNode::element("aside"), Some(body));
        let other = tree.push(DomNode::element("section"), Some(body));
        tree.push(DomNode::element("p"), Some(other));

        assert_eq!(
            synth().synthesize(&tree, node, &tree).unwrap(),
            "main.layout > p"
        );
    }
}
