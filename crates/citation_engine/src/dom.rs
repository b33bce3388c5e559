//! Minimal read-only view over a parsed document.
//!
//! The citation extractor only needs a handful of tree queries, so it is
//! written against [`DocumentTree`] instead of a concrete parser. [`HtmlDocument`]
//! backs the trait with `scraper`; tests can back it with hand-built trees.

use std::hash::Hash;

use ego_tree::{NodeId, NodeRef};
use scraper::node::Node;
use scraper::Html;

pub trait DocumentTree {
    type Node: Copy + Eq + Hash;

    /// Every element node, in document order.
    fn elements(&self) -> Vec<Self::Node>;

    fn tag_name(&self, node: Self::Node) -> Option<&str>;

    fn attr(&self, node: Self::Node, name: &str) -> Option<&str>;

    /// Descendant text with each fragment trimmed and blank fragments dropped,
    /// concatenated without separators.
    fn stripped_text(&self, node: Self::Node) -> String;

    fn parent_element(&self, node: Self::Node) -> Option<Self::Node>;

    /// Element descendants of `node` (excluding itself), lazily in document order.
    fn descendant_elements(&self, node: Self::Node) -> impl Iterator<Item = Self::Node> + '_;

    /// First non-blank text node after the subtree rooted at `node`.
    fn next_text(&self, node: Self::Node) -> Option<String>;
}

/// HTML parsed with the html5ever-based `scraper` crate. Malformed markup is
/// repaired by the parser rather than rejected.
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    fn node(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.html.tree.get(id)
    }
}

impl DocumentTree for HtmlDocument {
    type Node = NodeId;

    fn elements(&self) -> Vec<NodeId> {
        self.html
            .tree
            .root()
            .descendants()
            .filter(|node| node.value().is_element())
            .map(|node| node.id())
            .collect()
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.node(node)
            .and_then(|n| n.value().as_element())
            .map(|element| element.name())
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)
            .and_then(|n| n.value().as_element())
            .and_then(|element| element.attr(name))
    }

    fn stripped_text(&self, node: NodeId) -> String {
        let Some(node) = self.node(node) else {
            return String::new();
        };
        node.descendants()
            .filter_map(|n| n.value().as_text())
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .collect()
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?
            .parent()
            .filter(|parent| parent.value().is_element())
            .map(|parent| parent.id())
    }

    fn descendant_elements(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(node)
            .into_iter()
            .flat_map(|n| n.descendants().skip(1))
            .filter(|n| n.value().is_element())
            .map(|n| n.id())
    }

    fn next_text(&self, node: NodeId) -> Option<String> {
        let mut cursor = following(self.node(node)?);
        while let Some(candidate) = cursor {
            let found = candidate
                .descendants()
                .filter_map(|n| n.value().as_text())
                .find(|text| !text.trim().is_empty());
            if let Some(text) = found {
                return Some(String::from(&**text));
            }
            cursor = following(candidate);
        }
        None
    }
}

/// The node that comes right after `node`'s subtree in document order.
fn following(node: NodeRef<'_, Node>) -> Option<NodeRef<'_, Node>> {
    let mut current = Some(node);
    while let Some(n) = current {
        if let Some(sibling) = n.next_sibling() {
            return Some(sibling);
        }
        current = n.parent();
    }
    None
}
