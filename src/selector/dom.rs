//! Arena-backed DOM snapshot
//!
//! Nodes are addressed by index. Parent links live in a separate table and
//! child lists are derived from it, so there are no back-references to manage.

use serde::{Deserialize, Serialize};

use crate::core::{ExtractError, Result};

/// Index of a node inside a [`DomTree`]
pub type NodeId = usize;

/// A single element as captured from the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomNode {
    /// Lowercase tag name
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    /// Attributes in document order (data-*, aria-*, role, title, ...)
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
    /// Trimmed text content sample
    #[serde(default)]
    pub text: String,
}

impl DomNode {
    /// Create an element with only a tag name
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_lowercase(),
            id: None,
            classes: Vec::new(),
            attributes: Vec::new(),
            text: String::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_classes(mut self, classes: &[&str]) -> Self {
        self.classes = classes.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Look up an attribute by name; `id` and `class` map to their fields
    pub fn attr(&self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.clone(),
            "class" if !self.classes.is_empty() => Some(self.classes.join(" ")),
            _ => self
                .attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone()),
        }
    }

    /// All `data-*` attributes in document order
    pub fn data_attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .filter(|(name, _)| name.starts_with("data-"))
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn aria_label(&self) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == "aria-label")
            .map(|(_, v)| v.as_str())
    }
}

/// Wire format emitted by the DOM capture script
#[derive(Debug, Deserialize)]
struct CapturedNode {
    #[serde(flatten)]
    node: DomNode,
    #[serde(default)]
    parent: Option<NodeId>,
}

/// Arena of captured nodes
#[derive(Debug, Clone, Default)]
pub struct DomTree {
    nodes: Vec<DomNode>,
    parents: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
}

impl DomTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node. A parent index that does not exist yet makes it a root.
    pub fn push(&mut self, node: DomNode, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        let parent = parent.filter(|p| *p < id);

        self.nodes.push(node);
        self.parents.push(parent);
        self.children.push(Vec::new());

        if let Some(p) = parent {
            self.children[p].push(id);
        }

        id
    }

    /// Parse the capture script's JSON (nodes in document order)
    pub fn from_json(json: &str) -> Result<Self> {
        let captured: Vec<CapturedNode> = serde_json::from_str(json)
            .map_err(|e| ExtractError::browser(format!("Invalid DOM capture: {}", e)))?;
        Ok(Self::from_captured(captured))
    }

    /// Build from an already-parsed JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let captured: Vec<CapturedNode> = serde_json::from_value(value)
            .map_err(|e| ExtractError::browser(format!("Invalid DOM capture: {}", e)))?;
        Ok(Self::from_captured(captured))
    }

    fn from_captured(captured: Vec<CapturedNode>) -> Self {
        let mut tree = Self::new();
        for entry in captured {
            tree.push(entry.node, entry.parent);
        }
        tree
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&DomNode> {
        self.nodes.get(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(id).copied().flatten()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate all node ids in document order
    pub fn ids(&self) -> std::ops::Range<NodeId> {
        0..self.nodes.len()
    }

    /// Ancestors from the parent upwards
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    /// The node and its siblings in document order. Roots are siblings of
    /// each other.
    pub fn siblings(&self, id: NodeId) -> Vec<NodeId> {
        match self.parent(id) {
            Some(p) => self.children(p).to_vec(),
            None => self
                .ids()
                .filter(|candidate| self.parent(*candidate).is_none())
                .collect(),
        }
    }

    /// 1-based position among same-tag siblings, and how many there are
    pub fn nth_of_type(&self, id: NodeId) -> (usize, usize) {
        let Some(node) = self.node(id) else {
            return (1, 1);
        };

        let same_tag: Vec<NodeId> = self
            .siblings(id)
            .into_iter()
            .filter(|s| self.nodes[*s].tag == node.tag)
            .collect();

        let index = same_tag.iter().position(|s| *s == id).unwrap_or(0) + 1;
        (index, same_tag.len().max(1))
    }

    /// First node carrying the given id attribute
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.id.as_deref() == Some(id))
    }
}
