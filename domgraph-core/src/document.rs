// Parsed document tree consumed by the graph builder.
//
// The tree is produced by a `Preprocessor` (or constructed directly in
// tests) and is never mutated by the core.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Collapse runs of whitespace into single spaces and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
    Comment(String),
}

impl DomNode {
    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            DomNode::Element(el) => Some(el),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub tag: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push(Attribute {
            name: name.to_ascii_lowercase(),
            value: value.to_string(),
        });
        self
    }

    pub fn with_child(mut self, child: ElementNode) -> Self {
        self.children.push(DomNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(DomNode::Text(text.to_string()));
        self
    }

    pub fn with_comment(mut self, text: &str) -> Self {
        self.children.push(DomNode::Comment(text.to_string()));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn element_children(&self) -> impl Iterator<Item = &ElementNode> {
        self.children.iter().filter_map(DomNode::as_element)
    }

    /// Text the element owns directly: its only non-comment child is a
    /// non-blank text node.
    pub fn direct_text(&self) -> Option<&str> {
        let mut owned = self
            .children
            .iter()
            .filter(|c| !matches!(c, DomNode::Comment(_)));
        match (owned.next(), owned.next()) {
            (Some(DomNode::Text(text)), None) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            _ => None,
        }
    }

    /// All descendant text, trimmed per node, joined by single spaces and
    /// whitespace-collapsed. Comments are excluded.
    pub fn full_text(&self) -> String {
        let mut parts = Vec::new();
        self.collect_text(&mut parts);
        normalize_whitespace(&parts.join(" "))
    }

    fn collect_text<'a>(&'a self, parts: &mut Vec<&'a str>) {
        for child in &self.children {
            match child {
                DomNode::Text(text) => {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        parts.push(trimmed);
                    }
                }
                DomNode::Element(el) => el.collect_text(parts),
                DomNode::Comment(_) => {}
            }
        }
    }

    /// First descendant-or-self element with the given tag, preorder.
    /// Uses an explicit stack so nesting depth never touches the call stack.
    pub fn find_first(&self, tag: &str) -> Option<&ElementNode> {
        let mut stack = vec![self];
        while let Some(element) = stack.pop() {
            if element.tag == tag {
                return Some(element);
            }
            let first = stack.len();
            stack.extend(element.element_children());
            stack[first..].reverse();
        }
        None
    }
}

// Flatten before dropping; the derived drop recurses once per nesting level.
impl Drop for ElementNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(node) = pending.pop() {
            if let DomNode::Element(mut element) = node {
                pending.append(&mut element.children);
            }
        }
    }
}

/// Ordered top-level nodes of one parsed document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentTree {
    pub nodes: Vec<DomNode>,
}

impl DocumentTree {
    pub fn new(nodes: Vec<DomNode>) -> Self {
        Self { nodes }
    }

    pub fn from_root(root: ElementNode) -> Self {
        Self {
            nodes: vec![DomNode::Element(root)],
        }
    }

    pub fn top_level_elements(&self) -> impl Iterator<Item = &ElementNode> {
        self.nodes.iter().filter_map(DomNode::as_element)
    }

    pub fn find_first(&self, tag: &str) -> Option<&ElementNode> {
        self.top_level_elements().find_map(|el| el.find_first(tag))
    }

    /// Traversal roots: the `<html>` element if there is one, otherwise every
    /// top-level element in document order.
    pub fn roots(&self) -> Vec<&ElementNode> {
        match self.find_first("html") {
            Some(html) => vec![html],
            None => self.top_level_elements().collect(),
        }
    }

    /// Text of the first `<title>` element, if non-empty
    pub fn title(&self) -> Option<String> {
        self.find_first("title")
            .map(|t| t.full_text())
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_text_requires_single_text_child() {
        let leaf = ElementNode::new("p").with_text("  Hello  ");
        assert_eq!(leaf.direct_text(), Some("Hello"));

        let commented = ElementNode::new("p").with_comment("note").with_text("Hi");
        assert_eq!(commented.direct_text(), Some("Hi"));

        let mixed = ElementNode::new("p")
            .with_text("Hello ")
            .with_child(ElementNode::new("b").with_text("world"));
        assert_eq!(mixed.direct_text(), None);

        let blank = ElementNode::new("p").with_text("   ");
        assert_eq!(blank.direct_text(), None);
    }

    #[test]
    fn full_text_joins_and_collapses() {
        let el = ElementNode::new("div")
            .with_text("  Price:\n")
            .with_child(ElementNode::new("span").with_text("$10   today"))
            .with_comment("hidden");
        assert_eq!(el.full_text(), "Price: $10 today");
    }

    #[test]
    fn roots_prefer_html_element() {
        let tree = DocumentTree::new(vec![
            DomNode::Comment("doctype".into()),
            DomNode::Element(ElementNode::new("html").with_child(ElementNode::new("body"))),
        ]);
        assert_eq!(tree.roots().len(), 1);
        assert_eq!(tree.roots()[0].tag, "html");

        let fragment = DocumentTree::new(vec![
            DomNode::Element(ElementNode::new("div")),
            DomNode::Text("loose".into()),
            DomNode::Element(ElementNode::new("p")),
        ]);
        let tags: Vec<_> = fragment.roots().iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(tags, vec!["div", "p"]);
    }

    #[test]
    fn find_first_walks_in_document_order() {
        let el = ElementNode::new("div")
            .with_child(ElementNode::new("section").with_child(ElementNode::new("p").with_attr("id", "inner")))
            .with_child(ElementNode::new("p").with_attr("id", "outer"));
        assert_eq!(el.find_first("p").and_then(|p| p.attribute("id")), Some("inner"));
        assert_eq!(el.find_first("div").map(|d| d.tag.as_str()), Some("div"));
        assert!(el.find_first("span").is_none());
    }

    #[test]
    fn deep_chains_are_searched_and_dropped_on_a_small_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                let mut chain = ElementNode::new("b");
                for _ in 0..100_000 {
                    chain = ElementNode::new("div").with_child(chain);
                }
                let tree = DocumentTree::from_root(chain);
                assert_eq!(tree.roots().len(), 1);
                tree.find_first("b").is_some()
            })
            .unwrap();
        assert!(handle.join().unwrap());
    }
}
