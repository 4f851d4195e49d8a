//! Markdown Abstract Syntax Tree
//!
//! This module defines the AST nodes for representing Markdown documents,
//! including the GitHub-flavored additions (tables, strikethrough, task
//! list items). The DOM converter in `word2md` builds this tree and
//! [`crate::serialize`] turns it into text.

/// A block-level Markdown node
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Root document container
    Document(Vec<Block>),

    /// Heading with level (1-6) and inline content
    Heading {
        level: u8,
        content: Vec<Inline>,
    },

    /// Paragraph containing inline content
    Paragraph(Vec<Inline>),

    /// Block quote containing nested blocks
    BlockQuote(Vec<Block>),

    /// List (ordered or unordered)
    List {
        ordered: bool,
        start: u32,
        items: Vec<ListItem>,
    },

    /// Fenced or indented code block
    CodeBlock {
        language: Option<String>,
        code: String,
        fenced: bool,
    },

    /// Thematic break (horizontal rule)
    ThematicBreak,

    /// Pipe table with headers and rows
    Table {
        headers: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
}

/// A list item containing blocks
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub content: Vec<Block>,
    /// Task list state: `None` for a plain item, `Some(done)` for `[ ]`/`[x]`
    pub checked: Option<bool>,
}

impl ListItem {
    pub fn new(content: Vec<Block>) -> Self {
        Self {
            content,
            checked: None,
        }
    }

    pub fn from_inlines(inlines: Vec<Inline>) -> Self {
        Self::new(vec![Block::Paragraph(inlines)])
    }

    /// Mark this item as a task list entry
    pub fn task(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }
}

/// An inline Markdown node
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    /// Plain text
    Text(String),

    /// Strong emphasis (bold)
    Strong(Vec<Inline>),

    /// Emphasis (italic)
    Emphasis(Vec<Inline>),

    /// Strikethrough (GFM)
    Strikethrough(Vec<Inline>),

    /// Inline code
    Code(String),

    /// Link with text, URL, and optional title
    Link {
        content: Vec<Inline>,
        url: String,
        title: Option<String>,
    },

    /// Image with alt text, URL, and optional title
    Image {
        alt: String,
        url: String,
        title: Option<String>,
    },

    /// Hard line break
    LineBreak,
}

impl Block {
    /// Check if this block is empty/blank
    pub fn is_blank(&self) -> bool {
        match self {
            Block::Document(blocks) => blocks.iter().all(|b| b.is_blank()),
            Block::Paragraph(inlines) => inlines_are_blank(inlines),
            Block::Heading { content, .. } => inlines_are_blank(content),
            Block::BlockQuote(blocks) => blocks.iter().all(|b| b.is_blank()),
            Block::List { items, .. } => items.iter().all(|i| i.is_blank()),
            Block::CodeBlock { code, .. } => code.trim().is_empty(),
            Block::Table { headers, rows } => {
                headers.iter().all(|h| inlines_are_blank(h))
                    && rows.iter().all(|r| r.iter().all(|c| inlines_are_blank(c)))
            }
            Block::ThematicBreak => false,
        }
    }
}

impl ListItem {
    /// A task item is never blank: its checkbox carries meaning on its own.
    pub fn is_blank(&self) -> bool {
        self.checked.is_none() && self.content.iter().all(|b| b.is_blank())
    }
}

impl Inline {
    /// Check if this inline is empty/blank
    pub fn is_blank(&self) -> bool {
        match self {
            Inline::Text(text) => text.trim().is_empty(),
            Inline::Strong(inlines) | Inline::Emphasis(inlines) | Inline::Strikethrough(inlines) => {
                inlines_are_blank(inlines)
            }
            Inline::Code(code) => code.is_empty(),
            Inline::Link { content, .. } => inlines_are_blank(content),
            Inline::Image { .. } => false,
            Inline::LineBreak => false,
        }
    }

    /// Get the text content of this inline (for measuring table column widths)
    pub fn text_len(&self) -> usize {
        match self {
            Inline::Text(text) => text.chars().count(),
            Inline::Strong(inlines) | Inline::Strikethrough(inlines) => {
                inlines_text_len(inlines) + 4 // ** or ~~
            }
            Inline::Emphasis(inlines) => inlines_text_len(inlines) + 2,
            Inline::Code(code) => code.chars().count() + 2, // backticks
            Inline::Link { content, url, .. } => {
                inlines_text_len(content) + url.chars().count() + 4 // []()
            }
            Inline::Image { alt, url, .. } => alt.chars().count() + url.chars().count() + 5, // ![]()
            Inline::LineBreak => 0,
        }
    }
}

/// Check if every inline in the slice is blank
pub fn inlines_are_blank(inlines: &[Inline]) -> bool {
    inlines.iter().all(|i| i.is_blank())
}

/// Helper to calculate text length of inline vec
pub fn inlines_text_len(inlines: &[Inline]) -> usize {
    inlines.iter().map(|i| i.text_len()).sum()
}
