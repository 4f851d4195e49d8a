//! word2md-core - Markdown AST and serialization
//!
//! This crate provides the core data structures and GitHub-flavored
//! serialization for Markdown. The `word2md` crate converts normalized HTML
//! into this AST.
//!
//! # Architecture
//!
//! ```text
//! Normalized HTML ──▶ DOM tree ──▶ ┌──────────────┐
//!                                  │ Markdown AST │ ──▶ Markdown String
//!                                  └──────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use word2md_core::{Block, Inline, Options, serialize};
//!
//! let ast = Block::Document(vec![
//!     Block::Heading {
//!         level: 1,
//!         content: vec![Inline::Text("Title".to_string())],
//!     },
//!     Block::Paragraph(vec![
//!         Inline::Text("Hello ".to_string()),
//!         Inline::Strong(vec![Inline::Text("world".to_string())]),
//!     ]),
//! ]);
//!
//! let markdown = serialize(&ast, &Options::default());
//! assert_eq!(markdown, "# Title\n\nHello **world**");
//! ```

mod ast;
mod options;
mod serialize;

pub use ast::{inlines_are_blank, inlines_text_len, Block, Inline, ListItem};
pub use options::{CodeBlockStyle, HeadingStyle, Options};
pub use serialize::serialize;
