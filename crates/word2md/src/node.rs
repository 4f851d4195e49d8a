//! Owned DOM node structure.
//!
//! The normalizer, the semantic passes and the Markdown converter all work on
//! this tree. It is built from scraper's parse tree (see [`crate::html`]) and
//! can be mutated freely, which the scraper tree does not allow.

use crate::utilities::is_void;

/// Node types matching DOM nodeType values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// Element node (nodeType = 1)
    Element = 1,
    /// Text node (nodeType = 3)
    Text = 3,
    /// Comment node (nodeType = 8)
    Comment = 8,
    /// Document node (nodeType = 9)
    Document = 9,
}

/// A DOM node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node type
    pub node_type: NodeType,

    /// Lowercase tag name for elements, `#text`, `#comment` or `#document`
    pub node_name: String,

    /// Text content for text and comment nodes
    pub node_value: Option<String>,

    /// Attributes in source order
    pub attributes: Vec<(String, String)>,

    /// Child nodes
    pub children: Vec<Node>,
}

impl Node {
    /// Create a new element node
    pub fn element(tag_name: &str) -> Self {
        Self {
            node_type: NodeType::Element,
            node_name: tag_name.to_lowercase(),
            node_value: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a new element node with attributes
    pub fn element_with_attrs(tag_name: &str, attrs: Vec<(&str, &str)>) -> Self {
        let mut node = Self::element(tag_name);
        node.attributes = attrs
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v.to_string()))
            .collect();
        node
    }

    /// Create a new text node
    pub fn text(content: &str) -> Self {
        Self {
            node_type: NodeType::Text,
            node_name: "#text".to_string(),
            node_value: Some(content.to_string()),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a new comment node
    pub fn comment(content: &str) -> Self {
        Self {
            node_type: NodeType::Comment,
            node_name: "#comment".to_string(),
            node_value: Some(content.to_string()),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a document root node
    pub fn document() -> Self {
        Self {
            node_type: NodeType::Document,
            node_name: "#document".to_string(),
            node_value: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Check if this is an element node
    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    /// Check if this is a text node
    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }

    /// Check if this element has the given tag name
    pub fn is(&self, tag: &str) -> bool {
        self.is_element() && self.node_name == tag
    }

    /// Get the tag name (lowercase)
    pub fn tag_name(&self) -> &str {
        &self.node_name
    }

    /// Rename this element, keeping attributes and children
    pub fn rename(&mut self, tag_name: &str) {
        if self.is_element() {
            self.node_name = tag_name.to_lowercase();
        }
    }

    /// Get an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Check if an attribute exists
    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Set an attribute, replacing an existing value
    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self
            .attributes
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value.to_string(),
            None => self
                .attributes
                .push((name.to_lowercase(), value.to_string())),
        }
    }

    /// Parse the inline `style` attribute into (property, value) pairs.
    ///
    /// Property names are lowercased; later declarations of the same property
    /// win, as in CSS.
    pub fn styles(&self) -> Vec<(String, String)> {
        self.attr("style").map(parse_declarations).unwrap_or_default()
    }

    /// Look up one inline style property
    pub fn style(&self, property: &str) -> Option<String> {
        self.styles()
            .into_iter()
            .rev()
            .find(|(k, _)| k == property)
            .map(|(_, v)| v)
    }

    /// Get all child nodes
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.iter()
    }

    /// Get only element children
    pub fn element_children(&self) -> impl Iterator<Item = &Node> {
        self.children().filter(|n| n.is_element())
    }

    /// Add a child node
    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Remove every descendant element with the given tag name
    pub fn remove_elements(&mut self, tag: &str) {
        self.children.retain(|c| !c.is(tag));
        for child in &mut self.children {
            child.remove_elements(tag);
        }
    }

    /// Visit this node and all descendants, parents before children
    pub fn walk_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut Node),
    {
        f(self);
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }

    /// Find the first descendant element (or self) with the given tag name
    pub fn find(&self, tag: &str) -> Option<&Node> {
        if self.is(tag) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(tag))
    }

    /// Get all text content from this node and descendants
    pub fn text_content(&self) -> String {
        match self.node_type {
            NodeType::Text => self.node_value.clone().unwrap_or_default(),
            NodeType::Comment => String::new(),
            _ => self.children().map(|child| child.text_content()).collect(),
        }
    }

    /// Reconstruct outer HTML
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out, false);
        out
    }

    fn write_html(&self, out: &mut String, raw_text: bool) {
        match self.node_type {
            NodeType::Text => {
                let text = self.node_value.as_deref().unwrap_or("");
                if raw_text {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_html_text(text));
                }
            }
            NodeType::Comment => {
                out.push_str("<!--");
                out.push_str(self.node_value.as_deref().unwrap_or(""));
                out.push_str("-->");
            }
            NodeType::Document => {
                for child in self.children() {
                    child.write_html(out, false);
                }
            }
            NodeType::Element => {
                let tag = self.tag_name();
                out.push('<');
                out.push_str(tag);
                for (name, value) in &self.attributes {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape_html_attr(value));
                        out.push('"');
                    }
                }
                out.push('>');

                if is_void(tag) {
                    return;
                }

                let raw = is_raw_text(tag);
                for child in self.children() {
                    child.write_html(out, raw);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

/// Parse a CSS declaration block (`color: red; font-weight: bold`)
pub fn parse_declarations(block: &str) -> Vec<(String, String)> {
    block
        .split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim().to_lowercase();
            let value = value.trim();
            if property.is_empty() || value.is_empty() {
                None
            } else {
                Some((property, value.to_string()))
            }
        })
        .collect()
}

/// Format (property, value) pairs back into a declaration block
pub fn format_declarations(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join("; ")
}

fn is_raw_text(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

/// Escape HTML text content
fn escape_html_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape HTML attribute value
fn escape_html_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A reference to a node with parent context.
/// This allows navigation up the tree without storing parent pointers.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    /// The node itself
    pub node: &'a Node,
    parent_tag: Option<&'a str>,
}

impl<'a> NodeRef<'a> {
    /// Create a new NodeRef without parent context
    pub fn new(node: &'a Node) -> Self {
        Self {
            node,
            parent_tag: None,
        }
    }

    /// Create a new NodeRef with parent tag context
    pub fn with_parent(node: &'a Node, parent_tag: &'a str) -> Self {
        Self {
            node,
            parent_tag: Some(parent_tag),
        }
    }

    /// Get the parent tag name if known
    pub fn parent_tag(&self) -> Option<&'a str> {
        self.parent_tag
    }

    pub fn tag_name(&self) -> &'a str {
        self.node.tag_name()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.node.attr(name)
    }

    pub fn style(&self, property: &str) -> Option<String> {
        self.node.style(property)
    }

    pub fn children(&self) -> impl Iterator<Item = &'a Node> {
        self.node.children.iter()
    }

    pub fn text_content(&self) -> String {
        self.node.text_content()
    }
}
