//! # word2md
//!
//! Convert Word and other office documents to Markdown.
//!
//! A headless LibreOffice (`soffice`) renders the document to HTML. The HTML
//! is cleaned up (encoding repair, CSS inlining, whitespace and quote
//! normalization), parsed into a [`Node`] tree, rewritten so that formatting
//! such as large fonts becomes structure such as headings, converted to
//! GitHub-flavored Markdown and finally scrubbed of renderer artifacts.
//!
//! ## Example (document)
//!
//! ```rust,no_run
//! use word2md::{Config, Document, Renderer};
//!
//! let renderer = Renderer::locate()?;
//! let mut document = Document::new("report.docx", &renderer, Config::default())?;
//! println!("{}", document.to_markdown()?);
//! # Ok::<(), word2md::Error>(())
//! ```
//!
//! ## Example (HTML string)
//!
//! ```rust
//! use word2md::Converter;
//!
//! let converter = Converter::new();
//! let markdown = converter.convert_html("<h1>Title</h1><p>Hello <b>world</b></p>").unwrap();
//! assert_eq!(markdown, "# Title\n\nHello **world**");
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod config;
pub mod convert;
pub mod css;
pub mod document;
pub mod encoding;
pub mod html;
mod memo;
pub mod node;
pub mod normalize;
pub mod renderer;
pub mod rules;
pub mod runner;
pub mod scrub;
pub mod semantic;
mod utilities;

pub use config::Config;
pub use convert::{ConvertOptions, Converter, UnknownTags};
pub use document::Document;
pub use html::{parse_document, parse_fragment};
pub use memo::Memo;
pub use node::{Node, NodeRef, NodeType};
pub use renderer::{ProcFsTable, ProcessTable, Renderer};
pub use rules::{Emission, Filter, Rule, Rules};
pub use runner::CommandRunner;
pub use scrub::scrub;
pub use utilities::*;
pub use word2md_core::{Block, CodeBlockStyle, HeadingStyle, Inline, ListItem, Options};

/// Error type for word2md operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("File {path:?} does not exist")]
    NotFound { path: PathBuf },

    #[error("LibreOffice executable not found: {path:?}")]
    ExecutableNotFound { path: PathBuf },

    #[error("LibreOffice already running: {path:?}")]
    AlreadyRunning { path: PathBuf },

    #[error("Command `{command}` failed: {output}")]
    CommandFailed { command: String, output: String },

    #[error("Command `{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("Structural parse error: {0}")]
    StructuralParse(String),

    #[error("Unknown tag <{tag}>")]
    UnknownTag { tag: String },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} was left half-computed by an earlier failure")]
    Poisoned(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Convert the file at `path` with the renderer found on this machine.
pub fn convert_file(path: impl AsRef<Path>, config: Config) -> Result<String> {
    let renderer = Renderer::locate()?;
    let mut document = Document::new(path, &renderer, config)?;
    Ok(document.to_markdown()?.to_string())
}
