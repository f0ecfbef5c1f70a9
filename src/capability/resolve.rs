//! Ref to selector resolution
//!
//! A snapshot ref only carries a role and an accessible name. We capture the
//! DOM, find the element those describe, and synthesize a selector for it.

use tracing::debug;

use crate::capability::scripts;
use crate::capability::{Page, RefTarget};
use crate::core::Result;
use crate::selector::{DomNode, DomTree, NodeId, SelectorSynthesizer};

/// Capture the page DOM into an arena
pub async fn capture_dom(page: &dyn Page) -> Result<DomTree> {
    let value = page.evaluate(scripts::CAPTURE_DOM).await?;
    DomTree::from_value(value)
}

/// Resolve a snapshot ref into a selector, or `None` if it can't be mapped
pub async fn resolve_ref(
    page: &dyn Page,
    reference: &str,
    synthesizer: &SelectorSynthesizer,
) -> Result<Option<String>> {
    let Some(target) = page.describe_ref(reference).await? else {
        debug!(reference, "ref not present in snapshot");
        return Ok(None);
    };

    let tree = capture_dom(page).await?;
    let Some(node) = find_target(&tree, &target) else {
        debug!(reference, role = %target.role, name = %target.name, "no DOM match for ref");
        return Ok(None);
    };

    Ok(synthesizer.synthesize(&tree, node, &tree))
}

/// Best DOM match for a role/name pair.
///
/// An exact accessible-name match beats a containment match, a matching role
/// adds weight, and among equals the deepest node wins (ancestors share text).
pub fn find_target(tree: &DomTree, target: &RefTarget) -> Option<NodeId> {
    let want_name = normalize(&target.name);
    let want_role = target.role.to_lowercase();

    let mut best: Option<(u8, usize, NodeId)> = None;
    for id in tree.ids() {
        let Some(node) = tree.node(id) else { continue };

        let role_hit = !want_role.is_empty() && role_of(node).as_deref() == Some(&want_role);
        let name = normalize(&accessible_name(node));

        let name_score = if want_name.is_empty() {
            1
        } else if name == want_name {
            3
        } else if !name.is_empty() && name.contains(&want_name) {
            1
        } else {
            0
        };
        if name_score == 0 {
            continue;
        }
        if want_name.is_empty() && !role_hit {
            continue;
        }

        let score = name_score + if role_hit { 2 } else { 0 };
        let depth = tree.ancestors(id).count();
        let better = match best {
            None => true,
            Some((s, d, _)) => score > s || (score == s && depth > d),
        };
        if better {
            best = Some((score, depth, id));
        }
    }

    best.map(|(_, _, id)| id)
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn accessible_name(node: &DomNode) -> String {
    ["aria-label", "alt", "title", "placeholder"]
        .iter()
        .find_map(|attr| node.attr(attr).filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| node.text.clone())
}

/// Explicit role, or the implicit ARIA role of common tags
fn role_of(node: &DomNode) -> Option<String> {
    if let Some(role) = node.attr("role") {
        return Some(role.to_lowercase());
    }

    let role = match node.tag.as_str() {
        "a" if node.attr("href").is_some() => "link",
        "button" | "summary" => "button",
        "input" => match node.attr("type").as_deref().unwrap_or("text") {
            "checkbox" => "checkbox",
            "radio" => "radio",
            "button" | "submit" | "reset" | "image" => "button",
            "search" => "searchbox",
            "range" => "slider",
            "number" => "spinbutton",
            _ => "textbox",
        },
        "textarea" => "textbox",
        "select" => "combobox",
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
        "nav" => "navigation",
        "main" => "main",
        "header" => "banner",
        "footer" => "contentinfo",
        "aside" => "complementary",
        "section" => "region",
        "form" => "form",
        "ul" | "ol" => "list",
        "li" => "listitem",
        "img" => "img",
        "table" => "table",
        "tr" => "row",
        "td" => "cell",
        "th" => "columnheader",
        "dialog" => "dialog",
        "article" => "article",
        "p" => "paragraph",
        _ => return None,
    };
    Some(role.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(role: &str, name: &str) -> RefTarget {
        RefTarget {
            role: role.to_string(),
            name: name.to_string(),
        }
    }

    fn page_tree() -> DomTree {
        let mut tree = DomTree::new();
        let body = tree.push(DomNode::element("body").with_text("Pricing Buy now Search"), None);
        let section = tree.push(
            DomNode::element("section").with_text("Pricing Buy now"),
            Some(body),
        );
        tree.push(DomNode::element("h2").with_text("Pricing"), Some(section));
        tree.push(
            DomNode::element("button").with_text("  Buy   now "),
            Some(section),
        );
        tree.push(
            DomNode::element("input").with_attr("placeholder", "Search"),
            Some(body),
        );
        tree
    }

    #[test]
    fn test_exact_name_and_role() {
        let tree = page_tree();
        assert_eq!(find_target(&tree, &target("button", "Buy now")), Some(3));
        assert_eq!(find_target(&tree, &target("heading", "Pricing")), Some(2));
    }

    #[test]
    fn test_name_from_placeholder() {
        let tree = page_tree();
        assert_eq!(find_target(&tree, &target("textbox", "search")), Some(4));
    }

    #[test]
    fn test_role_only_match() {
        let tree = page_tree();
        assert_eq!(find_target(&tree, &target("region", "")), Some(1));
    }

    #[test]
    fn test_no_match() {
        let tree = page_tree();
        assert_eq!(find_target(&tree, &target("link", "Checkout")), None);
    }
}
