//! HTML normalization: the cleanup pass between the renderer's HTML export
//! and the Markdown converter.
//!
//! Order matters. The text transforms after CSS inlining assume that the
//! stylesheet is already gone and that the markup has been re-serialized.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::css::inline_css;
use crate::encoding::transcode;
use crate::html::parse_document;
use crate::node::Node;
use crate::{Error, Result};

/// A named, pure text transform
pub type Step = (&'static str, fn(&str) -> String);

/// The text transforms applied after transcoding, in order
pub const NORMALIZE_STEPS: &[Step] = &[
    ("inline_css", inline_css),
    ("collapse_line_breaks", collapse_line_breaks),
    ("straighten_quotes", straighten_quotes),
    ("remove_inter_tag_whitespace", remove_inter_tag_whitespace),
];

static RE_LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n|\r").unwrap());
static RE_DOUBLE_QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new("\u{201C}|\u{201D}").unwrap());
static RE_SINGLE_QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new("\u{2018}|\u{2019}").unwrap());
static RE_INTER_TAG_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r">[ \t\n\x0B\x0C\r]+<").unwrap());

/// Normalize a raw HTML export into clean UTF-8 markup.
pub fn normalize(raw: &[u8], encoding: &str) -> String {
    let mut html = transcode(raw, encoding);
    for (name, step) in NORMALIZE_STEPS {
        html = step(&html);
        debug!(step = name, len = html.len(), "normalized html");
    }
    html
}

/// Every line break becomes a single space
pub fn collapse_line_breaks(html: &str) -> String {
    RE_LINE_BREAKS.replace_all(html, " ").into_owned()
}

/// Curly quotes become their ASCII counterparts
pub fn straighten_quotes(html: &str) -> String {
    let html = RE_DOUBLE_QUOTES.replace_all(html, "\"");
    RE_SINGLE_QUOTES.replace_all(&html, "'").into_owned()
}

/// Whitespace that sits only between two tags is dropped
pub fn remove_inter_tag_whitespace(html: &str) -> String {
    RE_INTER_TAG_WHITESPACE.replace_all(html, "><").into_owned()
}

/// Parse normalized markup and drop `title` elements.
///
/// Fails with [`Error::StructuralParse`] when the result has no `html` root.
pub fn parse_tree(html: &str) -> Result<Node> {
    let mut tree = parse_document(html);
    if tree.find("html").is_none() {
        return Err(Error::StructuralParse(
            "normalized HTML has no root element".to_string(),
        ));
    }
    tree.remove_elements("title");
    Ok(tree)
}
