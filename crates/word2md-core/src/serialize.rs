//! Markdown AST serialization
//!
//! Converts Markdown AST nodes into GitHub-flavored Markdown text.

use crate::ast::{inlines_text_len, Block, Inline, ListItem};
use crate::options::{CodeBlockStyle, HeadingStyle, Options};

/// Serialize a block to Markdown string
pub fn serialize(block: &Block, options: &Options) -> String {
    let mut output = String::with_capacity(4096);
    serialize_block(block, options, &mut output);

    // Post-process: collapse multiple newlines and trim
    collapse_and_trim(&mut output);
    output
}

fn serialize_block(block: &Block, options: &Options, out: &mut String) {
    match block {
        Block::Document(blocks) => serialize_blocks(blocks, options, out),

        Block::Heading { level, content } => serialize_heading(*level, content, options, out),

        Block::Paragraph(inlines) => {
            let start_len = out.len();
            serialize_inlines(inlines, options, out);
            if out[start_len..].trim().is_empty() {
                out.truncate(start_len);
            } else {
                out.push_str("\n\n");
            }
        }

        Block::BlockQuote(blocks) => {
            let start_len = out.len();
            serialize_blocks(blocks, options, out);

            // Rewrite the content we just wrote with > prefixes
            let content = out[start_len..].trim_end().to_string();
            out.truncate(start_len);

            for (i, line) in content.lines().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                out.push('>');
                if !line.is_empty() {
                    out.push(' ');
                    out.push_str(line);
                }
            }
            out.push_str("\n\n");
        }

        Block::List {
            ordered,
            start,
            items,
        } => serialize_list(*ordered, *start, items, options, out),

        Block::CodeBlock {
            language,
            code,
            fenced,
        } => serialize_code_block(language.as_deref(), code, *fenced, options, out),

        Block::ThematicBreak => {
            out.push_str(&options.hr);
            out.push_str("\n\n");
        }

        Block::Table { headers, rows } => serialize_table(headers, rows, options, out),
    }
}

fn serialize_blocks(blocks: &[Block], options: &Options, out: &mut String) {
    for block in blocks {
        if !block.is_blank() {
            serialize_block(block, options, out);
        }
    }
}

fn serialize_heading(level: u8, content: &[Inline], options: &Options, out: &mut String) {
    let start_len = out.len();
    serialize_inlines(content, options, out);

    let text = out[start_len..].trim().to_string();
    out.truncate(start_len);
    if text.is_empty() {
        return;
    }

    match options.heading_style {
        HeadingStyle::Setext if level <= 2 => {
            let underline = if level == 1 { "=" } else { "-" };
            out.push_str(&text);
            out.push('\n');
            out.push_str(&underline.repeat(text.chars().count()));
            out.push_str("\n\n");
        }
        _ => {
            out.push_str(&"#".repeat(usize::from(level.clamp(1, 6))));
            out.push(' ');
            out.push_str(&text);
            out.push_str("\n\n");
        }
    }
}

fn serialize_list(ordered: bool, start: u32, items: &[ListItem], options: &Options, out: &mut String) {
    let mut number = start;

    for item in items.iter().filter(|item| !item.is_blank()) {
        let marker = if ordered {
            format!("{}. ", number)
        } else {
            format!("{} ", options.bullet_list_marker)
        };
        number += 1;

        out.push_str(&marker);
        match item.checked {
            Some(true) => out.push_str("[x] "),
            Some(false) => out.push_str("[ ] "),
            None => {}
        }

        serialize_list_item(item, options, marker.len(), out);
    }

    out.push('\n');
}

fn serialize_list_item(item: &ListItem, options: &Options, prefix_len: usize, out: &mut String) {
    let mut content = String::new();
    let blocks: Vec<&Block> = item.content.iter().filter(|b| !b.is_blank()).collect();

    for (i, block) in blocks.iter().enumerate() {
        match block {
            Block::Paragraph(inlines) => {
                serialize_inlines(inlines, options, &mut content);
                if i + 1 < blocks.len() {
                    let next_is_list = matches!(blocks[i + 1], Block::List { .. });
                    content.push_str(if next_is_list { "\n" } else { "\n\n" });
                }
            }
            _ => serialize_block(block, options, &mut content),
        }
    }

    // Indent continuation lines under the marker
    let continuation_indent = " ".repeat(prefix_len);

    for (i, line) in content.trim_end().lines().enumerate() {
        if i > 0 && !line.is_empty() {
            out.push_str(&continuation_indent);
        }
        out.push_str(if i == 0 { line.trim_start() } else { line });
        out.push('\n');
    }
    if content.trim().is_empty() {
        out.push('\n');
    }
}

fn serialize_code_block(
    language: Option<&str>,
    code: &str,
    fenced: bool,
    options: &Options,
    out: &mut String,
) {
    let use_fenced = fenced || options.code_block_style == CodeBlockStyle::Fenced;

    if use_fenced {
        out.push_str(&options.fence);
        out.push_str(language.unwrap_or(""));
        out.push('\n');
        out.push_str(code.trim_end_matches('\n'));
        out.push('\n');
        out.push_str(&options.fence);
        out.push_str("\n\n");
    } else {
        for line in code.lines() {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
}

fn serialize_table(
    headers: &[Vec<Inline>],
    rows: &[Vec<Vec<Inline>>],
    options: &Options,
    out: &mut String,
) {
    if headers.is_empty() {
        return;
    }

    // Rows may be wider than the header row
    let col_count = rows
        .iter()
        .map(|r| r.len())
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);

    let mut widths = vec![3usize; col_count];
    for (i, header) in headers.iter().enumerate() {
        widths[i] = widths[i].max(inlines_text_len(header));
    }
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(inlines_text_len(cell));
        }
    }

    serialize_table_row(headers, &widths, options, out);

    // Separator row
    out.push('|');
    for &width in &widths {
        out.push(' ');
        out.push_str(&"-".repeat(width));
        out.push_str(" |");
    }
    out.push('\n');

    for row in rows {
        serialize_table_row(row, &widths, options, out);
    }

    out.push('\n');
}

fn serialize_table_row(cells: &[Vec<Inline>], widths: &[usize], options: &Options, out: &mut String) {
    out.push('|');
    for (i, width) in widths.iter().enumerate() {
        let mut cell = String::new();
        if let Some(inlines) = cells.get(i) {
            serialize_inlines(inlines, options, &mut cell);
        }
        // Cells are single-line
        let cell = cell.replace("  \n", " ").replace('\n', " ");
        let cell = cell.trim();
        out.push(' ');
        out.push_str(cell);
        out.push_str(&" ".repeat(width.saturating_sub(cell.chars().count())));
        out.push_str(" |");
    }
    out.push('\n');
}

fn serialize_inlines(inlines: &[Inline], options: &Options, out: &mut String) {
    for inline in inlines {
        serialize_inline(inline, options, out);
    }
}

/// Serialize `content` between delimiters, keeping surrounding whitespace
/// outside of them so `**word **` never appears.
fn serialize_delimited(content: &[Inline], delimiter: &str, options: &Options, out: &mut String) {
    let mut inner = String::new();
    serialize_inlines(content, options, &mut inner);

    let trimmed = inner.trim();
    if trimmed.is_empty() {
        out.push_str(&inner);
        return;
    }

    let leading = &inner[..inner.len() - inner.trim_start().len()];
    let trailing = &inner[inner.trim_end().len()..];
    out.push_str(leading);
    out.push_str(delimiter);
    out.push_str(trimmed);
    out.push_str(delimiter);
    out.push_str(trailing);
}

fn serialize_inline(inline: &Inline, options: &Options, out: &mut String) {
    match inline {
        Inline::Text(text) => out.push_str(text),

        Inline::Strong(content) => {
            serialize_delimited(content, &options.strong_delimiter, options, out)
        }

        Inline::Emphasis(content) => {
            let delimiter = options.em_delimiter.to_string();
            serialize_delimited(content, &delimiter, options, out)
        }

        Inline::Strikethrough(content) => {
            serialize_delimited(content, &options.strikethrough_delimiter, options, out)
        }

        Inline::Code(code) => {
            if !code.is_empty() {
                let backticks = if code.contains('`') { "``" } else { "`" };
                let space = if code.starts_with('`') || code.ends_with('`') {
                    " "
                } else {
                    ""
                };
                out.push_str(backticks);
                out.push_str(space);
                out.push_str(code);
                out.push_str(space);
                out.push_str(backticks);
            }
        }

        Inline::Link {
            content,
            url,
            title,
        } => {
            out.push('[');
            serialize_inlines(content, options, out);
            out.push_str("](");
            push_destination(url, out);
            if let Some(t) = title {
                out.push_str(" \"");
                out.push_str(t);
                out.push('"');
            }
            out.push(')');
        }

        Inline::Image { alt, url, title } => {
            out.push_str("![");
            out.push_str(alt);
            out.push_str("](");
            push_destination(url, out);
            if let Some(t) = title {
                out.push_str(" \"");
                out.push_str(t);
                out.push('"');
            }
            out.push(')');
        }

        Inline::LineBreak => out.push_str("  \n"),
    }
}

/// Link destinations with spaces or parentheses go in angle brackets
fn push_destination(url: &str, out: &mut String) {
    if !url.contains(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '<' | '>')) {
        out.push_str(url);
        return;
    }
    out.push('<');
    for c in url.chars() {
        match c {
            '<' | '>' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("%0A"),
            _ => out.push(c),
        }
    }
    out.push('>');
}

/// Collapse runs of three or more newlines into two and trim newlines at
/// both ends, in place
fn collapse_and_trim(s: &mut String) {
    let mut result = String::with_capacity(s.len());
    let mut newline_count = 0;

    for c in s.trim_matches('\n').chars() {
        if c == '\n' {
            newline_count += 1;
            if newline_count <= 2 {
                result.push(c);
            }
        } else {
            newline_count = 0;
            result.push(c);
        }
    }

    *s = result;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_options() -> Options {
        Options::default()
    }

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn test_paragraph() {
        let block = Block::Paragraph(vec![text("Hello World")]);
        let result = serialize(&block, &default_options());
        assert_eq!(result, "Hello World");
    }

    #[test]
    fn test_heading_atx_default() {
        let block = Block::Document(vec![
            Block::Heading {
                level: 1,
                content: vec![text("Title")],
            },
            Block::Paragraph(vec![
                text("Hello "),
                Inline::Strong(vec![text("world")]),
            ]),
        ]);
        let result = serialize(&block, &default_options());
        assert_eq!(result, "# Title\n\nHello **world**");
    }

    #[test]
    fn test_heading_setext_h1() {
        let mut options = default_options();
        options.heading_style = HeadingStyle::Setext;

        let block = Block::Heading {
            level: 1,
            content: vec![text("Title")],
        };
        let result = serialize(&block, &options);
        assert_eq!(result, "Title\n=====");
    }

    #[test]
    fn test_heading_setext_falls_back_to_atx() {
        let mut options = default_options();
        options.heading_style = HeadingStyle::Setext;

        let block = Block::Heading {
            level: 3,
            content: vec![text("Section")],
        };
        let result = serialize(&block, &options);
        assert_eq!(result, "### Section");
    }

    #[test]
    fn test_emphasis() {
        let block = Block::Paragraph(vec![Inline::Emphasis(vec![text("italic")])]);
        let result = serialize(&block, &default_options());
        assert_eq!(result, "_italic_");
    }

    #[test]
    fn test_delimiters_keep_whitespace_outside() {
        let block = Block::Paragraph(vec![
            text("a"),
            Inline::Strong(vec![text(" bold ")]),
            text("b"),
        ]);
        let result = serialize(&block, &default_options());
        assert_eq!(result, "a **bold** b");
    }

    #[test]
    fn test_strikethrough() {
        let block = Block::Paragraph(vec![Inline::Strikethrough(vec![text("gone")])]);
        let result = serialize(&block, &default_options());
        assert_eq!(result, "~~gone~~");
    }

    #[test]
    fn test_inline_code() {
        let block = Block::Paragraph(vec![Inline::Code("code".to_string())]);
        let result = serialize(&block, &default_options());
        assert_eq!(result, "`code`");
    }

    #[test]
    fn test_link() {
        let block = Block::Paragraph(vec![Inline::Link {
            content: vec![text("Example")],
            url: "https://example.com".to_string(),
            title: None,
        }]);
        let result = serialize(&block, &default_options());
        assert_eq!(result, "[Example](https://example.com)");
    }

    #[test]
    fn test_link_destination_with_spaces_and_parens() {
        let block = Block::Paragraph(vec![Inline::Link {
            content: vec![text("l")],
            url: "http://x.org/a b)".to_string(),
            title: None,
        }]);
        assert_eq!(serialize(&block, &default_options()), "[l](<http://x.org/a b)>)");

        let block = Block::Paragraph(vec![Inline::Image {
            alt: "pic".to_string(),
            url: "img (1).png".to_string(),
            title: Some("T".to_string()),
        }]);
        assert_eq!(
            serialize(&block, &default_options()),
            "![pic](<img (1).png> \"T\")"
        );
    }

    #[test]
    fn test_image() {
        let block = Block::Paragraph(vec![Inline::Image {
            alt: "Alt text".to_string(),
            url: "image.png".to_string(),
            title: None,
        }]);
        let result = serialize(&block, &default_options());
        assert_eq!(result, "![Alt text](image.png)");
    }

    #[test]
    fn test_code_block_indented() {
        let mut options = default_options();
        options.code_block_style = CodeBlockStyle::Indented;

        let block = Block::CodeBlock {
            language: None,
            code: "let x = 1;".to_string(),
            fenced: false,
        };
        let result = serialize(&block, &options);
        assert_eq!(result, "    let x = 1;");
    }

    #[test]
    fn test_code_block_fenced() {
        let block = Block::CodeBlock {
            language: Some("rust".to_string()),
            code: "let x = 1;".to_string(),
            fenced: true,
        };
        let result = serialize(&block, &default_options());
        assert_eq!(result, "```rust\nlet x = 1;\n```");
    }

    #[test]
    fn test_blockquote() {
        let block = Block::BlockQuote(vec![Block::Paragraph(vec![text("Quote")])]);
        let result = serialize(&block, &default_options());
        assert_eq!(result, "> Quote");
    }

    #[test]
    fn test_unordered_list() {
        let block = Block::List {
            ordered: false,
            start: 1,
            items: vec![
                ListItem::from_inlines(vec![text("One")]),
                ListItem::from_inlines(vec![text("Two")]),
            ],
        };
        let result = serialize(&block, &default_options());
        assert_eq!(result, "- One\n- Two");
    }

    #[test]
    fn test_ordered_list_skips_blank_items() {
        let block = Block::List {
            ordered: true,
            start: 3,
            items: vec![
                ListItem::from_inlines(vec![text("First")]),
                ListItem::from_inlines(vec![text(" ")]),
                ListItem::from_inlines(vec![text("Second")]),
            ],
        };
        let result = serialize(&block, &default_options());
        assert_eq!(result, "3. First\n4. Second");
    }

    #[test]
    fn test_nested_list() {
        let nested = Block::List {
            ordered: false,
            start: 1,
            items: vec![ListItem::from_inlines(vec![text("Inner")])],
        };
        let block = Block::List {
            ordered: false,
            start: 1,
            items: vec![ListItem::new(vec![
                Block::Paragraph(vec![text("Outer")]),
                nested,
            ])],
        };
        let result = serialize(&block, &default_options());
        assert_eq!(result, "- Outer\n  - Inner");
    }

    #[test]
    fn test_task_list() {
        let block = Block::List {
            ordered: false,
            start: 1,
            items: vec![
                ListItem::from_inlines(vec![text("done")]).task(true),
                ListItem::from_inlines(vec![text("todo")]).task(false),
            ],
        };
        let result = serialize(&block, &default_options());
        assert_eq!(result, "- [x] done\n- [ ] todo");
    }

    #[test]
    fn test_thematic_break() {
        let result = serialize(&Block::ThematicBreak, &default_options());
        assert_eq!(result, "* * *");
    }

    #[test]
    fn test_table() {
        let block = Block::Table {
            headers: vec![vec![text("A")], vec![text("B")]],
            rows: vec![vec![vec![text("1")], vec![text("2")]]],
        };
        let result = serialize(&block, &default_options());
        assert_eq!(result, "| A   | B   |\n| --- | --- |\n| 1   | 2   |");
    }

    #[test]
    fn test_table_row_wider_than_header() {
        let block = Block::Table {
            headers: vec![vec![text("A")]],
            rows: vec![vec![vec![text("1")], vec![text("2")]]],
        };
        let result = serialize(&block, &default_options());
        assert_eq!(result, "| A   |     |\n| --- | --- |\n| 1   | 2   |");
    }

    #[test]
    fn test_collapse_newlines() {
        let block = Block::Document(vec![
            Block::Paragraph(vec![text("a")]),
            Block::Paragraph(vec![text("")]),
            Block::Paragraph(vec![text("b")]),
        ]);
        let result = serialize(&block, &default_options());
        assert_eq!(result, "a\n\nb");
    }
}
