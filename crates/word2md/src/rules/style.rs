//! Emphasis inferred from inline styles.
//!
//! LibreOffice exports direct character formatting as
//! `<span style="font-weight: bold">`. After CSS inlining the same holds for
//! class-based formatting. When a span is both bold and italic the result is
//! strong wrapping emphasis (`**_text_**`).

use super::{Emission, Filter, Rule};
use crate::node::NodeRef;

/// Does the element's inline style make it bold?
pub fn is_bold(node: &NodeRef) -> bool {
    match node.style("font-weight") {
        Some(weight) => {
            let weight = weight.trim().to_lowercase();
            weight == "bold"
                || weight == "bolder"
                || weight.parse::<u16>().map(|w| w >= 600).unwrap_or(false)
        }
        None => false,
    }
}

/// Does the element's inline style make it italic?
pub fn is_italic(node: &NodeRef) -> bool {
    matches!(
        node.style("font-style").map(|s| s.trim().to_lowercase()).as_deref(),
        Some("italic") | Some("oblique")
    )
}

/// Rules for `span` elements whose style implies emphasis, most specific first
pub fn style_emphasis_rules() -> Vec<(&'static str, Rule)> {
    vec![
        (
            "span-bold-italic",
            Rule::new(
                Filter::predicate(|tag, node| tag == "span" && is_bold(node) && is_italic(node)),
                Emission::StrongEmphasis,
            ),
        ),
        (
            "span-bold",
            Rule::new(
                Filter::predicate(|tag, node| tag == "span" && is_bold(node)),
                Emission::Strong,
            ),
        ),
        (
            "span-italic",
            Rule::new(
                Filter::predicate(|tag, node| tag == "span" && is_italic(node)),
                Emission::Emphasis,
            ),
        ),
    ]
}
