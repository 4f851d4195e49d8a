//! Convert the normalized DOM tree to Markdown.
//!
//! The tree is first turned into the Markdown AST from `word2md-core`, then
//! serialized as GitHub-flavored Markdown. Element rules are consulted before
//! the built-in tag mapping. Tags with no Markdown counterpart are bypassed:
//! the tag goes, its content stays.

use word2md_core::{inlines_are_blank, serialize, Block, CodeBlockStyle, Inline, ListItem, Options};

use crate::html::parse_document;
use crate::node::{Node, NodeRef, NodeType};
use crate::rules::{Emission, Rule, Rules};
use crate::utilities::{
    clean_attribute, collapse_whitespace, escape_line_start, escape_markdown, is_block,
};
use crate::{Error, Result};

/// Elements dropped together with their content
const REMOVED_ELEMENTS: &[&str] = &[
    "head", "title", "meta", "link", "script", "style", "noscript", "template",
];

/// Known elements without a Markdown counterpart
const CONTAINER_ELEMENTS: &[&str] = &[
    "html", "body", "div", "section", "article", "main", "aside", "header", "footer", "nav",
    "figure", "figcaption", "address", "form", "fieldset", "center", "dl", "dt", "dd", "li",
    "thead", "tbody", "tfoot", "tr", "td", "th", "caption", "colgroup", "col", "span", "font",
    "u", "ins", "small", "big", "mark", "abbr", "cite", "q", "sub", "sup", "time", "label",
    "sdfield", "sdendnote", "sdfootnote",
];

/// What to do with tags that are neither mapped nor known containers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTags {
    /// Drop the tag, convert its content
    #[default]
    Bypass,
    /// Fail with [`Error::UnknownTag`]
    Raise,
}

/// Converter options
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Emit tables, strikethrough and task list items
    pub github_flavored: bool,
    pub unknown_tags: UnknownTags,
    /// Markdown serialization options
    pub markdown: Options,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            github_flavored: true,
            unknown_tags: UnknownTags::default(),
            markdown: Options::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Wrap {
    Strong,
    Emphasis,
    StrongEmphasis,
    Strikethrough,
}

impl Wrap {
    fn apply(self, content: Vec<Inline>) -> Inline {
        match self {
            Wrap::Strong => Inline::Strong(content),
            Wrap::Emphasis => Inline::Emphasis(content),
            Wrap::StrongEmphasis => Inline::Strong(vec![Inline::Emphasis(content)]),
            Wrap::Strikethrough => Inline::Strikethrough(content),
        }
    }
}

/// How a single element is converted
#[derive(Debug, Clone, Copy)]
enum Action<'a> {
    Remove,
    Bypass,
    Wrap(Wrap),
    Block(&'a str),
    Inline(&'a str),
}

#[derive(Debug, Default, Clone, Copy)]
struct Context {
    in_table: bool,
}

/// DOM to Markdown converter
pub struct Converter {
    options: ConvertOptions,
    rules: Rules,
}

impl Converter {
    /// Create a converter with default options and the style emphasis rules
    pub fn new() -> Self {
        Self::with_options(ConvertOptions::default())
    }

    /// Create a converter with custom options
    pub fn with_options(options: ConvertOptions) -> Self {
        Self::with_rules(options, Rules::with_style_emphasis())
    }

    /// Create a converter with custom options and rules
    pub fn with_rules(options: ConvertOptions, rules: Rules) -> Self {
        Self { options, rules }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Add a rule, consulted before the built-in tag mapping
    pub fn add_rule(&mut self, key: &str, rule: Rule) -> &mut Self {
        self.rules.add(key, rule);
        self
    }

    /// Convert a tree to Markdown
    pub fn convert(&self, tree: &Node) -> Result<String> {
        let ast = self.to_ast(tree)?;
        Ok(serialize(&ast, &self.options.markdown))
    }

    /// Parse an HTML string and convert it to Markdown
    pub fn convert_html(&self, html: &str) -> Result<String> {
        self.convert(&parse_document(html))
    }

    /// Convert a tree to the Markdown AST
    pub fn to_ast(&self, tree: &Node) -> Result<Block> {
        let mut blocks = Vec::new();
        let ctx = Context::default();
        if tree.is_element() {
            self.convert_sequence(std::slice::from_ref(tree), "", ctx, &mut blocks)?;
        } else {
            self.convert_sequence(&tree.children, tree.tag_name(), ctx, &mut blocks)?;
        }
        Ok(Block::Document(blocks))
    }

    fn action<'a>(&'a self, node: &NodeRef<'a>) -> Result<Action<'a>> {
        match self.rules.for_node(node) {
            Some(Emission::Strong) => Ok(Action::Wrap(Wrap::Strong)),
            Some(Emission::Emphasis) => Ok(Action::Wrap(Wrap::Emphasis)),
            Some(Emission::StrongEmphasis) => Ok(Action::Wrap(Wrap::StrongEmphasis)),
            Some(Emission::Strikethrough) => Ok(Action::Wrap(Wrap::Strikethrough)),
            Some(Emission::Bypass) => Ok(Action::Bypass),
            Some(Emission::Remove) => Ok(Action::Remove),
            Some(Emission::Rename(tag)) => self.tag_action(tag),
            None => self.tag_action(node.tag_name()),
        }
    }

    /// The built-in mapping from tag names to Markdown constructs
    fn tag_action<'a>(&self, tag: &'a str) -> Result<Action<'a>> {
        let gfm = self.options.github_flavored;
        let action = match tag {
            t if REMOVED_ELEMENTS.contains(&t) => Action::Remove,
            "strong" | "b" => Action::Wrap(Wrap::Strong),
            "em" | "i" => Action::Wrap(Wrap::Emphasis),
            "del" | "s" | "strike" if gfm => Action::Wrap(Wrap::Strikethrough),
            "table" if gfm => Action::Block(tag),
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "blockquote" | "ul" | "ol" | "pre"
            | "hr" => Action::Block(tag),
            "code" | "tt" | "kbd" | "samp" | "a" | "img" | "br" | "input" => Action::Inline(tag),
            "del" | "s" | "strike" | "table" => Action::Bypass,
            t if CONTAINER_ELEMENTS.contains(&t) => Action::Bypass,
            _ => match self.options.unknown_tags {
                UnknownTags::Bypass => Action::Bypass,
                UnknownTags::Raise => {
                    return Err(Error::UnknownTag {
                        tag: tag.to_string(),
                    })
                }
            },
        };
        Ok(action)
    }

    /// Convert sibling nodes at block level. Consecutive inline content is
    /// gathered into paragraphs.
    fn convert_sequence(
        &self,
        nodes: &[Node],
        parent: &str,
        ctx: Context,
        out: &mut Vec<Block>,
    ) -> Result<()> {
        let mut pending: Vec<Inline> = Vec::new();

        for node in nodes {
            match node.node_type {
                NodeType::Text => {
                    let text = node.node_value.as_deref().unwrap_or("");
                    if !pending.is_empty() || !text.trim().is_empty() {
                        push_text(text, ctx, &mut pending);
                    }
                }
                NodeType::Element => {
                    let node_ref = NodeRef::with_parent(node, parent);
                    match self.action(&node_ref)? {
                        Action::Remove => {}
                        Action::Block(tag) => {
                            flush_paragraph(&mut pending, out);
                            self.convert_block(node, tag, ctx, out)?;
                        }
                        Action::Bypass if has_block_content(node) => {
                            flush_paragraph(&mut pending, out);
                            self.convert_sequence(&node.children, node.tag_name(), ctx, out)?;
                        }
                        action => self.convert_inline(node, action, ctx, &mut pending)?,
                    }
                }
                _ => {}
            }
        }

        flush_paragraph(&mut pending, out);
        Ok(())
    }

    fn convert_block(&self, node: &Node, tag: &str, ctx: Context, out: &mut Vec<Block>) -> Result<()> {
        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse().unwrap_or(1);
                let mut content = self.collect_inlines(node, ctx)?;
                // Headings are single-line
                for inline in content.iter_mut() {
                    if matches!(inline, Inline::LineBreak) {
                        *inline = Inline::Text(" ".to_string());
                    }
                }
                trim_inlines(&mut content);
                if !inlines_are_blank(&content) {
                    out.push(Block::Heading { level, content });
                }
            }

            "blockquote" => {
                let mut blocks = Vec::new();
                self.convert_sequence(&node.children, node.tag_name(), ctx, &mut blocks)?;
                if !blocks.is_empty() {
                    out.push(Block::BlockQuote(blocks));
                }
            }

            "ul" | "ol" => {
                let items = self.collect_list_items(node, ctx)?;
                if !items.is_empty() {
                    let start = node
                        .attr("start")
                        .and_then(|s| s.trim().parse().ok())
                        .unwrap_or(1);
                    out.push(Block::List {
                        ordered: tag == "ol",
                        start,
                        items,
                    });
                }
            }

            "pre" => {
                let code = node.text_content();
                if !code.trim().is_empty() {
                    out.push(Block::CodeBlock {
                        language: code_language(node),
                        code,
                        fenced: self.options.markdown.code_block_style == CodeBlockStyle::Fenced,
                    });
                }
            }

            "hr" => out.push(Block::ThematicBreak),

            "table" => self.convert_table(node, ctx, out)?,

            // p, and anything renamed to a block we do not map
            _ => self.convert_sequence(&node.children, node.tag_name(), ctx, out)?,
        }
        Ok(())
    }

    /// Collect the inline content of an element. Block descendants are
    /// flattened into the run.
    fn collect_inlines(&self, node: &Node, ctx: Context) -> Result<Vec<Inline>> {
        let mut inlines = Vec::new();
        for child in node.children() {
            match child.node_type {
                NodeType::Text => {
                    push_text(child.node_value.as_deref().unwrap_or(""), ctx, &mut inlines)
                }
                NodeType::Element => {
                    let node_ref = NodeRef::with_parent(child, node.tag_name());
                    let action = self.action(&node_ref)?;
                    self.convert_inline(child, action, ctx, &mut inlines)?;
                }
                _ => {}
            }
        }
        Ok(inlines)
    }

    fn convert_inline(
        &self,
        node: &Node,
        action: Action,
        ctx: Context,
        out: &mut Vec<Inline>,
    ) -> Result<()> {
        match action {
            Action::Remove => {}
            Action::Bypass => out.extend(self.collect_inlines(node, ctx)?),
            Action::Wrap(wrap) => {
                let content = self.collect_inlines(node, ctx)?;
                if inlines_are_blank(&content) {
                    out.extend(content);
                } else {
                    out.push(wrap.apply(content));
                }
            }
            Action::Inline(tag) => self.convert_inline_element(node, tag, ctx, out)?,
            Action::Block(_) => {
                let content = self.collect_inlines(node, ctx)?;
                if !inlines_are_blank(&content) {
                    if !out.is_empty() && !ends_with_space(out) {
                        out.push(Inline::Text(" ".to_string()));
                    }
                    out.extend(content);
                }
            }
        }
        Ok(())
    }

    fn convert_inline_element(
        &self,
        node: &Node,
        tag: &str,
        ctx: Context,
        out: &mut Vec<Inline>,
    ) -> Result<()> {
        match tag {
            "code" | "tt" | "kbd" | "samp" => {
                let code = collapse_whitespace(&node.text_content());
                if !code.trim().is_empty() {
                    out.push(Inline::Code(code));
                }
            }

            "a" => {
                let href = clean_attribute(node.attr("href"));
                let content = self.collect_inlines(node, ctx)?;
                // Bookmarks and empty anchors keep only their content
                if href.is_empty() || inlines_are_blank(&content) {
                    out.extend(content);
                } else {
                    out.push(Inline::Link {
                        content,
                        url: href,
                        title: title_attribute(node),
                    });
                }
            }

            "img" => {
                let src = clean_attribute(node.attr("src"));
                let alt = clean_attribute(node.attr("alt"));
                if src.is_empty() {
                    push_text(&alt, ctx, out);
                } else {
                    out.push(Inline::Image {
                        alt: escape_markdown(&alt),
                        url: src,
                        title: title_attribute(node),
                    });
                }
            }

            "br" => out.push(Inline::LineBreak),

            // Checkboxes are read by the enclosing list item
            "input" => {}

            _ => out.extend(self.collect_inlines(node, ctx)?),
        }
        Ok(())
    }

    fn collect_list_items(&self, list: &Node, ctx: Context) -> Result<Vec<ListItem>> {
        let mut items: Vec<ListItem> = Vec::new();

        for child in list.children() {
            if child.is_element() {
                let node_ref = NodeRef::with_parent(child, list.tag_name());
                match self.action(&node_ref)? {
                    Action::Remove => continue,
                    // A list nested directly in a list belongs to the previous item
                    Action::Block(tag @ ("ul" | "ol")) => {
                        let mut nested = Vec::new();
                        self.convert_block(child, tag, ctx, &mut nested)?;
                        match items.last_mut() {
                            Some(item) => item.content.extend(nested),
                            None => items.push(ListItem::new(nested)),
                        }
                        continue;
                    }
                    _ if child.is("li") => {
                        items.push(self.convert_list_item(child, ctx)?);
                        continue;
                    }
                    _ => {}
                }
            }

            // Stray content between items becomes an item of its own
            let mut blocks = Vec::new();
            self.convert_sequence(std::slice::from_ref(child), list.tag_name(), ctx, &mut blocks)?;
            if !blocks.is_empty() {
                items.push(ListItem::new(blocks));
            }
        }

        Ok(items)
    }

    fn convert_list_item(&self, li: &Node, ctx: Context) -> Result<ListItem> {
        let mut content = Vec::new();
        self.convert_sequence(&li.children, li.tag_name(), ctx, &mut content)?;
        let item = ListItem::new(content);

        let checked = if self.options.github_flavored {
            task_checkbox(li)
        } else {
            None
        };
        Ok(match checked {
            Some(done) => item.task(done),
            None => item,
        })
    }

    fn convert_table(&self, table: &Node, ctx: Context, out: &mut Vec<Block>) -> Result<()> {
        let cell_ctx = Context {
            in_table: true,
            ..ctx
        };

        if let Some(caption) = table.element_children().find(|c| c.is("caption")) {
            let mut content = self.collect_inlines(caption, ctx)?;
            flush_paragraph(&mut content, out);
        }

        let mut headers: Option<Vec<Vec<Inline>>> = None;
        let mut rows: Vec<Vec<Vec<Inline>>> = Vec::new();

        for (tr, in_head) in table_rows(table) {
            let mut is_header = in_head;
            let mut cells = Vec::new();
            for cell in tr.element_children().filter(|c| c.is("td") || c.is("th")) {
                is_header |= cell.is("th");
                let mut content = self.collect_inlines(cell, cell_ctx)?;
                trim_inlines(&mut content);
                cells.push(content);
            }

            if cells.is_empty() {
                continue;
            }
            if is_header && headers.is_none() && rows.is_empty() {
                headers = Some(cells);
            } else {
                rows.push(cells);
            }
        }

        // Without a header row the first row is used as headers
        let headers = match headers {
            Some(headers) => headers,
            None if !rows.is_empty() => rows.remove(0),
            None => return Ok(()),
        };

        out.push(Block::Table { headers, rows });
        Ok(())
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

/// Treat `</li>` followed by a line break as a bare `</li>`
pub fn canonicalize_list_items(html: &str) -> String {
    html.replace("</li>\n", "</li>")
}

fn push_text(text: &str, ctx: Context, out: &mut Vec<Inline>) {
    let mut text = escape_markdown(&collapse_whitespace(text));
    if ctx.in_table {
        text = text.replace('|', "\\|");
    }
    if text.starts_with(' ') && ends_with_space(out) {
        text.remove(0);
    }
    if !text.is_empty() {
        out.push(Inline::Text(text));
    }
}

fn ends_with_space(inlines: &[Inline]) -> bool {
    matches!(inlines.last(), Some(Inline::Text(text)) if text.ends_with(' '))
}

fn flush_paragraph(pending: &mut Vec<Inline>, out: &mut Vec<Block>) {
    let mut inlines = std::mem::take(pending);
    trim_inlines(&mut inlines);
    escape_line_starts(&mut inlines);
    if !inlines_are_blank(&inlines) {
        out.push(Block::Paragraph(inlines));
    }
}

/// Keep text at the start of each paragraph line from reading as structure
fn escape_line_starts(inlines: &mut [Inline]) {
    let mut line_start = true;
    for inline in inlines.iter_mut() {
        if line_start {
            if let Inline::Text(text) = inline {
                *text = escape_line_start(text);
            }
        }
        line_start = matches!(inline, Inline::LineBreak);
    }
}

/// Strip whitespace and line breaks at both ends of an inline run
fn trim_inlines(inlines: &mut Vec<Inline>) {
    loop {
        let drop_first = match inlines.first_mut() {
            Some(Inline::Text(text)) => {
                let trimmed = text.trim_start();
                if trimmed.is_empty() {
                    true
                } else {
                    *text = trimmed.to_string();
                    false
                }
            }
            Some(Inline::LineBreak) => true,
            _ => false,
        };
        if !drop_first {
            break;
        }
        inlines.remove(0);
    }

    loop {
        let drop_last = match inlines.last_mut() {
            Some(Inline::Text(text)) => {
                let trimmed = text.trim_end();
                if trimmed.is_empty() {
                    true
                } else {
                    *text = trimmed.to_string();
                    false
                }
            }
            Some(Inline::LineBreak) => true,
            _ => false,
        };
        if !drop_last {
            break;
        }
        inlines.pop();
    }
}

fn has_block_content(node: &Node) -> bool {
    node.children()
        .any(|child| child.is_element() && (is_block(child.tag_name()) || has_block_content(child)))
}

fn title_attribute(node: &Node) -> Option<String> {
    Some(clean_attribute(node.attr("title"))).filter(|title| !title.is_empty())
}

/// Language of a code block, from a `language-*` class on `pre` or `code`
fn code_language(pre: &Node) -> Option<String> {
    std::iter::once(pre)
        .chain(pre.element_children().filter(|c| c.is("code")))
        .filter_map(|node| node.attr("class"))
        .flat_map(|class| class.split_whitespace())
        .find_map(|class| class.strip_prefix("language-"))
        .map(str::to_string)
}

/// Rows of a table, each flagged when it sits in `thead`
fn table_rows(table: &Node) -> Vec<(&Node, bool)> {
    let mut rows = Vec::new();
    for child in table.element_children() {
        match child.tag_name() {
            "tr" => rows.push((child, false)),
            "thead" | "tbody" | "tfoot" => {
                let in_head = child.is("thead");
                rows.extend(
                    child
                        .element_children()
                        .filter(|row| row.is("tr"))
                        .map(|row| (row, in_head)),
                );
            }
            _ => {}
        }
    }
    rows
}

/// State of a checkbox leading a list item's content
fn task_checkbox(node: &Node) -> Option<bool> {
    for child in node.children() {
        match child.node_type {
            NodeType::Comment => continue,
            NodeType::Text => {
                if child.node_value.as_deref().unwrap_or("").trim().is_empty() {
                    continue;
                }
                return None;
            }
            NodeType::Element if child.is("input") => {
                return child
                    .attr("type")
                    .filter(|t| t.eq_ignore_ascii_case("checkbox"))
                    .map(|_| child.has_attr("checked"));
            }
            NodeType::Element if !child.is("ul") && !child.is("ol") => {
                return task_checkbox(child);
            }
            _ => return None,
        }
    }
    None
}
