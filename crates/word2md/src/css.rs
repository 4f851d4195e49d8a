//! Embedded stylesheet resolution.
//!
//! LibreOffice puts paragraph and character formatting into a `<style>`
//! block keyed by tag and class. The converter only looks at inline `style`
//! attributes, so every rule is copied onto the elements it selects and the
//! `<style>` elements are dropped.
//!
//! Rules apply in source order (a later rule overrides an earlier one for the
//! same property) and an element's own inline declarations always win.
//! Selector specificity is not considered.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use crate::html::{document_to_node, merge_declarations, resolve_style};
use crate::node::parse_declarations;

static RE_COMMENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

static STYLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("style").unwrap());

/// One `selector { declarations }` rule of a stylesheet
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    /// Selector list as written, e.g. `p.western, h1`
    pub selector: String,
    pub declarations: Vec<(String, String)>,
}

/// Parse a stylesheet into its plain rules.
///
/// At-rules (`@page`, `@media`, `@font-face`, ...) are skipped with their
/// blocks, as are HTML comment markers wrapped around the CSS.
pub fn parse_stylesheet(css: &str) -> Vec<StyleRule> {
    let css = RE_COMMENTS.replace_all(css, "");
    let css = css.replace("<!--", "").replace("-->", "");

    let mut rules = Vec::new();
    let mut rest = css.as_str();

    while let Some(open) = rest.find('{') {
        let prelude = rest[..open].trim();
        let body_start = open + 1;

        if prelude.starts_with('@') {
            rest = &rest[skip_block(rest, body_start)..];
            continue;
        }

        let Some(close) = rest[body_start..].find('}') else {
            break;
        };
        let body = &rest[body_start..body_start + close];
        if !prelude.is_empty() {
            rules.push(StyleRule {
                selector: prelude.to_string(),
                declarations: parse_declarations(body),
            });
        }
        rest = &rest[body_start + close + 1..];
    }

    rules
}

/// Return the offset just past the block whose body starts at `body_start`,
/// honouring nested braces.
fn skip_block(s: &str, body_start: usize) -> usize {
    let mut depth = 1usize;
    for (i, c) in s[body_start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return body_start + i + 1;
                }
            }
            _ => {}
        }
    }
    s.len()
}

/// Inline every embedded stylesheet rule onto the elements it matches.
pub fn inline_css(html: &str) -> String {
    let document = Html::parse_document(html);

    let css = document
        .select(&STYLE_SELECTOR)
        .map(|style| style.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");
    let rules = parse_stylesheet(&css);

    let mut matched: HashMap<_, Vec<(String, String)>> = HashMap::new();
    for rule in &rules {
        for selector in rule.selector.split(',').map(str::trim) {
            // Pseudo-classes never match a static document
            if selector.is_empty() || selector.contains(':') {
                continue;
            }
            let Ok(parsed) = Selector::parse(selector) else {
                debug!(selector, "skipping unparseable CSS selector");
                continue;
            };
            for element in document.select(&parsed) {
                merge_declarations(matched.entry(element.id()).or_default(), &rule.declarations);
            }
        }
    }
    debug!(rules = rules.len(), elements = matched.len(), "inlined stylesheet rules");

    let mut root = document_to_node(&document, &|element| {
        matched
            .get(&element.id())
            .map(|css| resolve_style(css, element.value().attr("style")))
    });
    root.remove_elements("style");
    root.outer_html()
}
