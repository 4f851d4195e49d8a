//! HTML parsing support.
//!
//! This module parses HTML strings with scraper (html5ever) and converts the
//! result into the owned [`Node`] tree used by the rest of the pipeline.

use scraper::{ElementRef, Html, Node as ScraperNode};

use crate::node::{format_declarations, parse_declarations, Node};

/// Parse a complete HTML document into a Node tree.
///
/// The returned node is a [`NodeType::Document`](crate::NodeType::Document)
/// whose element child is the `html` root. Doctypes are dropped.
///
/// # Example
///
/// ```rust
/// use word2md::parse_document;
///
/// let root = parse_document("<title>x</title><p>Hello</p>");
/// assert!(root.find("p").is_some());
/// ```
pub fn parse_document(html: &str) -> Node {
    let document = Html::parse_document(html);
    document_to_node(&document, &|_| None)
}

/// Parse an HTML fragment into a Node tree rooted at an `html` element.
pub fn parse_fragment(html: &str) -> Node {
    let document = Html::parse_fragment(html);
    scraper_to_node(document.root_element(), &|_| None)
}

/// Convert a parsed scraper document to our Node structure.
///
/// `style_for` may supply a replacement `style` attribute per element; the
/// CSS inliner uses it to attach resolved declarations.
pub(crate) fn document_to_node(
    document: &Html,
    style_for: &dyn Fn(ElementRef) -> Option<String>,
) -> Node {
    let mut root = Node::document();

    for child in document.tree.root().children() {
        match child.value() {
            ScraperNode::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    root.add_child(scraper_to_node(element, style_for));
                }
            }
            ScraperNode::Comment(comment) => root.add_child(Node::comment(&comment.comment)),
            _ => {}
        }
    }

    root
}

/// Convert a scraper ElementRef to our Node structure
fn scraper_to_node(element: ElementRef, style_for: &dyn Fn(ElementRef) -> Option<String>) -> Node {
    let tag = element.value().name();

    // Collect attributes
    let attrs: Vec<(&str, &str)> = element.value().attrs().collect();
    let mut node = Node::element_with_attrs(tag, attrs);

    if let Some(style) = style_for(element) {
        if style.is_empty() {
            node.attributes.retain(|(k, _)| k != "style");
        } else {
            node.set_attr("style", &style);
        }
    }

    // Process children
    for child in element.children() {
        match child.value() {
            ScraperNode::Text(text) => {
                node.add_child(Node::text(&text.text));
            }
            ScraperNode::Comment(comment) => {
                node.add_child(Node::comment(&comment.comment));
            }
            ScraperNode::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    node.add_child(scraper_to_node(child_element, style_for));
                }
            }
            _ => {}
        }
    }

    node
}

/// Merge `incoming` declarations over `base`; a repeated property moves to the
/// end with its new value.
pub(crate) fn merge_declarations(base: &mut Vec<(String, String)>, incoming: &[(String, String)]) {
    for (property, value) in incoming {
        base.retain(|(k, _)| k != property);
        base.push((property.clone(), value.clone()));
    }
}

/// Merge CSS-derived declarations with an element's own inline style.
pub(crate) fn resolve_style(css: &[(String, String)], inline: Option<&str>) -> String {
    let mut declarations = css.to_vec();
    if let Some(inline) = inline {
        merge_declarations(&mut declarations, &parse_declarations(inline));
    }
    format_declarations(&declarations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_fragment() {
        let node = parse_fragment("<p>Hello World</p>");
        assert!(node.is_element());
        assert_eq!(node.tag_name(), "html");
        assert_eq!(node.text_content(), "Hello World");
    }

    #[test]
    fn test_parse_document_has_html_root() {
        let root = parse_document("<!DOCTYPE html><p>Hi</p>");
        let html: Vec<&Node> = root.element_children().collect();
        assert_eq!(html.len(), 1);
        assert_eq!(html[0].tag_name(), "html");
        assert!(root.find("body").is_some());
    }

    #[test]
    fn test_parse_document_keeps_attributes() {
        let root = parse_document(r#"<p class="x" style="color: red">Hi</p>"#);
        let p = root.find("p").unwrap();
        assert_eq!(p.attr("class"), Some("x"));
        assert_eq!(p.style("color").as_deref(), Some("red"));
    }

    #[test]
    fn test_entities_are_decoded() {
        let root = parse_document("<p>a &amp; b&nbsp;c</p>");
        assert_eq!(root.find("p").unwrap().text_content(), "a & b\u{00A0}c");
    }

    #[test]
    fn test_resolve_style_inline_wins() {
        let css = vec![
            ("color".to_string(), "red".to_string()),
            ("margin".to_string(), "0".to_string()),
        ];
        assert_eq!(
            resolve_style(&css, Some("color: blue")),
            "margin: 0; color: blue"
        );
        assert_eq!(resolve_style(&css, None), "color: red; margin: 0");
    }
}
