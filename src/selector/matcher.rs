//! Match counting over a [`DomTree`]
//!
//! Selectors are parsed with scraper's CSS parser and matched by the
//! `selectors` engine against arena nodes, so the local count agrees with
//! what `document.querySelectorAll` would report for the same tree. Input
//! that does not parse counts as zero matches.

use cssparser::ParserInput;
use scraper::selector::{CssLocalName, CssString, NonTSPseudoClass, Parser, PseudoElement, Simple};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::matching::{
    self, ElementSelectorFlags, IgnoreNthChildForInvalidation, MatchingContext, MatchingMode,
    NeedsSelectorFlags, QuirksMode,
};
use selectors::parser::{ParseRelative, SelectorImpl, SelectorList};
use selectors::{Element, NthIndexCache, OpaqueElement};

use crate::selector::dom::{DomNode, DomTree, NodeId};

/// Answers "how many elements does this selector match?"
pub trait MatchOracle {
    fn count(&self, selector: &str) -> usize;
}

impl<F> MatchOracle for F
where
    F: Fn(&str) -> usize,
{
    fn count(&self, selector: &str) -> usize {
        self(selector)
    }
}

impl MatchOracle for DomTree {
    fn count(&self, selector: &str) -> usize {
        let Some(list) = parse(selector) else {
            return 0;
        };

        let mut nth_cache = NthIndexCache::default();
        let mut context = MatchingContext::new(
            MatchingMode::Normal,
            None,
            &mut nth_cache,
            QuirksMode::NoQuirks,
            NeedsSelectorFlags::No,
            IgnoreNthChildForInvalidation::No,
        );

        self.ids()
            .filter_map(|id| NodeRef::new(self, id))
            .filter(|element| {
                list.0
                    .iter()
                    .any(|s| matching::matches_selector(s, 0, None, element, &mut context))
            })
            .count()
    }
}

fn parse(selector: &str) -> Option<SelectorList<Simple>> {
    let mut input = ParserInput::new(selector);
    let mut parser = cssparser::Parser::new(&mut input);
    SelectorList::parse(&Parser, &mut parser, ParseRelative::No).ok()
}

/// A node handle the selector engine can walk
#[derive(Clone, Copy)]
struct NodeRef<'a> {
    tree: &'a DomTree,
    id: NodeId,
    node: &'a DomNode,
}

impl<'a> NodeRef<'a> {
    fn new(tree: &'a DomTree, id: NodeId) -> Option<Self> {
        tree.node(id).map(|node| Self { tree, id, node })
    }

    fn sibling(&self, offset: isize) -> Option<Self> {
        let siblings = self.tree.siblings(self.id);
        let pos = siblings.iter().position(|s| *s == self.id)?;
        let target = pos.checked_add_signed(offset)?;
        siblings
            .get(target)
            .and_then(|id| NodeRef::new(self.tree, *id))
    }
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}> #{}", self.node.tag, self.id)
    }
}

impl Element for NodeRef<'_> {
    type Impl = Simple;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(self.node)
    }

    fn parent_element(&self) -> Option<Self> {
        self.tree
            .parent(self.id)
            .and_then(|p| NodeRef::new(self.tree, p))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.sibling(-1)
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.sibling(1)
    }

    fn first_element_child(&self) -> Option<Self> {
        self.tree
            .children(self.id)
            .first()
            .and_then(|c| NodeRef::new(self.tree, *c))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, name: &CssLocalName) -> bool {
        self.node.tag.as_str() == &*name.0
    }

    fn has_namespace(&self, _ns: &<Simple as SelectorImpl>::BorrowedNamespaceUrl) -> bool {
        true
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.node.tag == other.node.tag
    }

    fn attr_matches(
        &self,
        _ns: &NamespaceConstraint<&<Simple as SelectorImpl>::NamespaceUrl>,
        local_name: &CssLocalName,
        operation: &AttrSelectorOperation<&CssString>,
    ) -> bool {
        self.node
            .attr(&local_name.0)
            .is_some_and(|value| operation.eval_str(&value))
    }

    fn match_non_ts_pseudo_class(
        &self,
        _pc: &NonTSPseudoClass,
        _context: &mut MatchingContext<Self::Impl>,
    ) -> bool {
        false
    }

    fn match_pseudo_element(
        &self,
        _pe: &PseudoElement,
        _context: &mut MatchingContext<Self::Impl>,
    ) -> bool {
        false
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        self.node.tag == "a" && self.node.attr("href").is_some()
    }

    fn is_html_slot_element(&self) -> bool {
        self.node.tag == "slot"
    }

    fn has_id(&self, id: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.node
            .id
            .as_deref()
            .is_some_and(|own| case_sensitivity.eq(own.as_bytes(), id.0.as_bytes()))
    }

    fn has_class(&self, name: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.node
            .classes
            .iter()
            .any(|class| case_sensitivity.eq(class.as_bytes(), name.0.as_bytes()))
    }

    fn imported_part(&self, _name: &CssLocalName) -> Option<CssLocalName> {
        None
    }

    fn is_part(&self, _name: &CssLocalName) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        self.tree.children(self.id).is_empty() && self.node.text.is_empty()
    }

    fn is_root(&self) -> bool {
        self.tree.parent(self.id).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DomTree {
        let mut tree = DomTree::new();
        let body = tree.push(DomNode::element("body"), None);
        let nav = tree.push(
            DomNode::element("nav").with_classes(&["top", "sticky"]),
            Some(body),
        );
        tree.push(
            DomNode::element("a")
                .with_id("home")
                .with_attr("data-testid", "home \"link\""),
            Some(nav),
        );
        tree.push(DomNode::element("a").with_attr("aria-label", "Cart"), Some(nav));
        tree.push(DomNode::element("a").with_id("123"), Some(body));
        tree
    }

    #[test]
    fn test_count_simple_forms() {
        let tree = sample();
        assert_eq!(tree.count("a"), 3);
        assert_eq!(tree.count("#home"), 1);
        assert_eq!(tree.count("nav.top.sticky"), 1);
        assert_eq!(tree.count(".sticky"), 1);
        assert_eq!(tree.count(r#"[aria-label="Cart"]"#), 1);
        assert_eq!(tree.count(r#"[data-testid="home \"link\""]"#), 1);
    }

    #[test]
    fn test_count_child_chain_and_nth() {
        let tree = sample();
        assert_eq!(tree.count("nav > a"), 2);
        assert_eq!(tree.count("body > nav.top > a:nth-of-type(2)"), 1);
        assert_eq!(tree.count("body > a"), 1);
        assert_eq!(tree.count("nav > a:nth-of-type(3)"), 0);
    }

    #[test]
    fn test_escaped_identifiers() {
        let tree = sample();
        assert_eq!(tree.count(r"#\31 23"), 1);
        assert_eq!(tree.count(r"#\31 24"), 0);
    }

    #[test]
    fn test_descendant_and_list_selectors() {
        let tree = sample();
        assert_eq!(tree.count("body a"), 3);
        assert_eq!(tree.count("#home, #\\31 23"), 2);
        assert_eq!(tree.count("a:first-child"), 1);
    }

    #[test]
    fn test_invalid_selectors_count_zero() {
        let tree = sample();
        assert_eq!(tree.count("a:hover"), 0);
        assert_eq!(tree.count(""), 0);
        assert_eq!(tree.count("[data-x="), 0);
        assert_eq!(tree.count("nav >"), 0);
    }

    #[test]
    fn test_closure_oracle() {
        let oracle = |s: &str| if s.starts_with('#') { 1 } else { 2 };
        assert_eq!(oracle.count("#x"), 1);
        assert_eq!(MatchOracle::count(&oracle, "div"), 2);
    }
}
