//! Presentation-to-structure rewrites on the parsed tree.
//!
//! Word documents often express structure only through formatting: a
//! "heading" is a large bold paragraph, a list is a run of paragraphs
//! starting with bullet glyphs, a table header is just the first row. These
//! passes turn such formatting back into tags the converter understands.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::node::Node;

/// Number of heading levels that can be guessed from font sizes
const HEADING_DEPTH: usize = 6;

/// Percentile distance between two guessed heading levels
const HEADING_STEP: usize = 100 / HEADING_DEPTH;

/// Paragraphs smaller than this (in points) are never headings
const MIN_HEADING_SIZE: f64 = 20.0;

static RE_FONT_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([0-9]*\.?[0-9]+)\s*(pt|px)?\s*$").unwrap());

static RE_BULLETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[\u{2022}\u{25CF}\u{25CB}\u{25AA}\u{00B7}\p{Cc}\p{Cf}]+|o\s+)\s*").unwrap());

static RE_NUMBERING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+|[A-Za-z]|[ivxlcdmIVXLCDM]+)\.\s+").unwrap());

/// Apply every semantic pass, in order.
pub fn semanticize(tree: &mut Node) {
    semanticize_headings(tree);
    remove_paragraphs_from_tables(tree);
    semanticize_table_headers(tree);
    remove_paragraphs_from_list_items(tree);
    remove_unicode_bullets_from_list_items(tree);
    remove_numbering_from_list_items(tree);
    remove_whitespace_from_list_items(tree);
}

/// Font size of an element in points, from its inline style.
pub fn font_size(node: &Node) -> Option<f64> {
    let value = node.style("font-size")?;
    let caps = RE_FONT_SIZE.captures(&value)?;
    let size: f64 = caps[1].parse().ok()?;
    match caps.get(2).map(|m| m.as_str()) {
        Some("px") => Some(size * 0.75),
        _ => Some(size),
    }
}

/// A paragraph's size is its own, or that of its only child element.
fn paragraph_font_size(node: &Node) -> Option<f64> {
    font_size(node).or_else(|| {
        let mut children = node.element_children();
        match (children.next(), children.next()) {
            (Some(only), None) if only.text_content().trim() == node.text_content().trim() => {
                font_size(only)
            }
            _ => None,
        }
    })
}

fn collect_font_sizes(node: &Node, sizes: &mut Vec<f64>) {
    if node.is_element() {
        if let Some(size) = font_size(node) {
            sizes.push(size);
        }
    }
    for child in node.children() {
        collect_font_sizes(child, sizes);
    }
}

/// Linear-interpolated percentile of sorted values
fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            sorted[lower] + (rank - lower as f64) * (sorted[upper] - sorted[lower])
        }
    }
}

/// Guess a heading level for a font size given the document's distinct sizes
pub fn guess_heading(size: f64, sizes: &[f64]) -> Option<u8> {
    if size < MIN_HEADING_SIZE {
        return None;
    }
    (1..HEADING_DEPTH)
        .find(|&level| {
            let threshold = percentile(sizes, ((HEADING_DEPTH - 1 - level) * HEADING_STEP) as f64);
            size >= threshold
        })
        .map(|level| level as u8)
}

/// Large-font paragraphs become `h1`..`h5`.
pub fn semanticize_headings(tree: &mut Node) {
    let mut sizes = Vec::new();
    collect_font_sizes(tree, &mut sizes);
    sizes.sort_by(|a, b| a.total_cmp(b));
    sizes.dedup();

    let mut guessed = 0usize;
    tree.walk_mut(&mut |node: &mut Node| {
        if !node.is("p") {
            return;
        }
        let Some(size) = paragraph_font_size(node) else {
            return;
        };
        if let Some(level) = guess_heading(size, &sizes) {
            node.rename(&format!("h{}", level));
            guessed += 1;
        }
    });
    debug!(guessed, sizes = sizes.len(), "guessed headings from font sizes");
}

/// Rename `from` elements found anywhere inside one of `containers`.
fn rename_within(node: &mut Node, containers: &[&str], from: &str, to: &str, inside: bool) {
    let inside = inside || containers.contains(&node.tag_name());
    for child in &mut node.children {
        if inside && child.is(from) {
            child.rename(to);
        }
        rename_within(child, containers, from, to, inside);
    }
}

/// Paragraphs inside table cells become spans so cells stay single-line.
pub fn remove_paragraphs_from_tables(tree: &mut Node) {
    rename_within(tree, &["td", "th"], "p", "span", false);
}

/// Paragraphs inside list items become spans.
pub fn remove_paragraphs_from_list_items(tree: &mut Node) {
    rename_within(tree, &["li"], "p", "span", false);
}

/// The cells of each table's first row become header cells.
pub fn semanticize_table_headers(tree: &mut Node) {
    tree.walk_mut(&mut |node: &mut Node| {
        if !node.is("table") {
            return;
        }
        if let Some(row) = first_row_mut(node) {
            for cell in row.children.iter_mut().filter(|c| c.is("td")) {
                cell.rename("th");
            }
        }
    });
}

/// First `tr` of a table, without descending into nested tables
fn first_row_mut(table: &mut Node) -> Option<&mut Node> {
    table.children.iter_mut().find_map(|child| {
        if child.is("tr") {
            Some(child)
        } else if child.is("thead") || child.is("tbody") || child.is("tfoot") {
            child.children.iter_mut().find(|c| c.is("tr"))
        } else {
            None
        }
    })
}

fn first_text_mut(node: &mut Node) -> Option<&mut String> {
    if node.is_text() {
        return node.node_value.as_mut().filter(|t| !t.trim().is_empty());
    }
    node.children.iter_mut().find_map(first_text_mut)
}

fn last_text_mut(node: &mut Node) -> Option<&mut String> {
    if node.is_text() {
        return node.node_value.as_mut().filter(|t| !t.trim().is_empty());
    }
    node.children.iter_mut().rev().find_map(last_text_mut)
}

/// Rewrite the leading text of every list item
fn rewrite_list_item_text<F>(tree: &mut Node, rewrite: F)
where
    F: Fn(&str) -> String,
{
    tree.walk_mut(&mut |node: &mut Node| {
        if node.is("li") {
            if let Some(text) = first_text_mut(node) {
                *text = rewrite(text);
            }
        }
    });
}

/// Bullet glyphs typed into list item text are dropped.
pub fn remove_unicode_bullets_from_list_items(tree: &mut Node) {
    rewrite_list_item_text(tree, |text| RE_BULLETS.replace(text, "").into_owned());
}

/// Hand-typed numbering (`1.`, `a.`, `iv.`) is dropped from list items.
pub fn remove_numbering_from_list_items(tree: &mut Node) {
    rewrite_list_item_text(tree, |text| RE_NUMBERING.replace(text, "").into_owned());
}

/// List item text is trimmed at both ends.
pub fn remove_whitespace_from_list_items(tree: &mut Node) {
    tree.walk_mut(&mut |node: &mut Node| {
        if !node.is("li") {
            return;
        }
        if let Some(text) = first_text_mut(node) {
            *text = text.trim_start().to_string();
        }
        if let Some(text) = last_text_mut(node) {
            *text = text.trim_end().to_string();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_document;

    #[test]
    fn test_font_size() {
        let pt = Node::element_with_attrs("p", vec![("style", "font-size: 24pt")]);
        let px = Node::element_with_attrs("p", vec![("style", "font-size: 32px")]);
        let em = Node::element_with_attrs("p", vec![("style", "font-size: 1.5em")]);
        assert_eq!(font_size(&pt), Some(24.0));
        assert_eq!(font_size(&px), Some(24.0));
        assert_eq!(font_size(&em), None);
    }

    #[test]
    fn test_guess_heading() {
        let sizes = [12.0, 20.0, 28.0];
        assert_eq!(guess_heading(28.0, &sizes), Some(1));
        assert_eq!(guess_heading(20.0, &sizes), Some(2));
        assert_eq!(guess_heading(12.0, &sizes), None);
    }

    #[test]
    fn test_semanticize_headings() {
        let mut tree = parse_document(
            r#"<p style="font-size: 28pt">Big</p>
               <p><span style="font-size: 20pt">Medium</span></p>
               <p style="font-size: 12pt">Body</p>"#,
        );
        semanticize_headings(&mut tree);
        assert_eq!(tree.find("h1").unwrap().text_content(), "Big");
        assert_eq!(tree.find("h2").unwrap().text_content(), "Medium");
        assert_eq!(tree.find("p").unwrap().text_content(), "Body");
    }

    #[test]
    fn test_table_passes() {
        let mut tree = parse_document(
            "<table><tr><td><p>A</p></td><td>B</td></tr><tr><td>1</td><td>2</td></tr></table>",
        );
        remove_paragraphs_from_tables(&mut tree);
        semanticize_table_headers(&mut tree);

        assert!(tree.find("p").is_none());
        let html = tree.outer_html();
        assert!(html.contains("<tr><th><span>A</span></th><th>B</th></tr>"));
        assert!(html.contains("<tr><td>1</td><td>2</td></tr>"));
    }

    #[test]
    fn test_list_item_cleanup() {
        let mut tree = parse_document(
            "<ul><li><p>\u{2022} First </p></li><li><p>2. Second</p></li><li><p>1.5 litres</p></li></ul>",
        );
        semanticize(&mut tree);

        let items: Vec<String> = tree
            .find("ul")
            .unwrap()
            .element_children()
            .map(|li| li.text_content())
            .collect();
        assert_eq!(items, vec!["First", "Second", "1.5 litres"]);
        assert!(tree.find("p").is_none());
    }
}
