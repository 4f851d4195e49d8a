//! A source document and the artifacts derived from it.

use std::env;
use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::convert::{canonicalize_list_items, Converter};
use crate::encoding::{detect, transcode};
use crate::memo::Memo;
use crate::node::Node;
use crate::normalize::{normalize, parse_tree};
use crate::renderer::Renderer;
use crate::runner::CommandRunner;
use crate::scrub::scrub;
use crate::semantic::semanticize;
use crate::{Error, Result};

/// Renderer filter for UTF-8 plain text export
pub const PLAIN_TEXT_FORMAT: &str = "txt:Text (encoded):UTF8";

enum Workdir {
    Owned(TempDir),
    External(PathBuf),
}

impl Workdir {
    fn path(&self) -> &Path {
        match self {
            Workdir::Owned(dir) => dir.path(),
            Workdir::External(path) => path,
        }
    }
}

/// One source file being converted.
///
/// Every artifact is computed on first access and kept for the lifetime of
/// the document. The private working directory, when one was created, is
/// removed on drop.
pub struct Document {
    path: PathBuf,
    config: Config,
    workdir: Workdir,
    runner: CommandRunner,
    converter: Converter,
    raw_html: Memo<Vec<u8>>,
    encoding: Memo<String>,
    tree: Memo<Node>,
    markdown: Memo<String>,
    plain_text: Memo<String>,
}

impl Document {
    /// Open `path` for conversion with `renderer`.
    ///
    /// Fails with [`Error::NotFound`] when the file does not exist, before
    /// any working directory is created.
    pub fn new(path: impl AsRef<Path>, renderer: &Renderer, config: Config) -> Result<Self> {
        let path = absolute(path.as_ref())?;
        if !path.exists() {
            return Err(Error::NotFound { path });
        }

        let workdir = match &config.tmpdir {
            Some(dir) => Workdir::External(dir.clone()),
            None => Workdir::Owned(tempfile::tempdir().map_err(|source| Error::Io {
                path: env::temp_dir(),
                source,
            })?),
        };
        debug!(path = %path.display(), workdir = %workdir.path().display(), "opened document");

        let runner = CommandRunner::new(renderer.clone()).with_timeout(config.timeout);
        let converter = Converter::with_options(config.convert.clone());

        Ok(Self {
            path,
            config,
            workdir,
            runner,
            converter,
            raw_html: Memo::new(),
            encoding: Memo::new(),
            tree: Memo::new(),
            markdown: Memo::new(),
            plain_text: Memo::new(),
        })
    }

    /// Replace the command runner
    pub fn with_runner(mut self, runner: CommandRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Replace the Markdown converter
    pub fn with_converter(mut self, converter: Converter) -> Self {
        self.converter = converter;
        self
    }

    /// Absolute path of the source file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extension of the source file, with the leading dot (`.docx`)
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default()
    }

    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The renderer's HTML export, as raw bytes
    pub fn raw_html(&mut self) -> Result<&[u8]> {
        let runner = &self.runner;
        let source = &self.path;
        let workdir = self.workdir.path();
        self.raw_html
            .get_or_try_init("raw_html", || export(runner, source, workdir, "html", "html"))
            .map(Vec::as_slice)
    }

    /// Character encoding declared by the HTML export
    pub fn encoding(&mut self) -> Result<&str> {
        self.raw_html()?;
        let raw = self.raw_html.cached("raw_html")?;
        self.encoding
            .get_or_try_init("encoding", || Ok(detect(raw)))
            .map(String::as_str)
    }

    /// The parsed, normalized HTML tree
    pub fn tree(&mut self) -> Result<&Node> {
        if !self.tree.is_cached() {
            self.encoding()?;
            let raw = self.raw_html.cached("raw_html")?;
            let encoding = self.encoding.cached("encoding")?;
            let config = &self.config;
            self.tree
                .get_or_try_init("tree", || build_tree(raw, encoding, config))?;
        }
        self.tree.cached("tree")
    }

    /// The tree serialized back to HTML
    pub fn html(&mut self) -> Result<String> {
        let html = self.tree()?.outer_html();
        Ok(canonicalize_list_items(&html))
    }

    /// The document as scrubbed Markdown
    pub fn to_markdown(&mut self) -> Result<&str> {
        if !self.markdown.is_cached() {
            let html = self.html()?;
            let converter = &self.converter;
            let markdown = self
                .markdown
                .get_or_try_init("markdown", || Ok(scrub(&converter.convert_html(&html)?)))?;
            info!(path = %self.path.display(), len = markdown.len(), "converted document");
        }
        self.markdown.cached("markdown").map(String::as_str)
    }

    /// The renderer's own plain-text export
    pub fn plain_text(&mut self) -> Result<&str> {
        let runner = &self.runner;
        let source = &self.path;
        let workdir = self.workdir.path();
        self.plain_text
            .get_or_try_init("plain_text", || {
                let bytes = export(runner, source, workdir, PLAIN_TEXT_FORMAT, "txt")?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            })
            .map(String::as_str)
    }

    /// Remove the private working directory now, reporting failures.
    ///
    /// An externally supplied directory is left alone.
    pub fn close(self) -> Result<()> {
        match self.workdir {
            Workdir::Owned(dir) => {
                let path = dir.path().to_path_buf();
                dir.close().map_err(|source| Error::Io { path, source })
            }
            Workdir::External(_) => Ok(()),
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("path", &self.path)
            .field("workdir", &self.workdir.path())
            .finish_non_exhaustive()
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(cwd.join(path))
}

/// Where the renderer writes `source` converted to `extension`
fn output_path(source: &Path, workdir: &Path, extension: &str) -> PathBuf {
    let name = source.file_name().unwrap_or(source.as_os_str());
    workdir.join(Path::new(name).with_extension(extension))
}

/// Have the renderer convert `source` and take the result out of `workdir`
fn export(
    runner: &CommandRunner,
    source: &Path,
    workdir: &Path,
    format: &str,
    extension: &str,
) -> Result<Vec<u8>> {
    runner.run([
        OsStr::new("--headless"),
        OsStr::new("--convert-to"),
        OsStr::new(format),
        source.as_os_str(),
        OsStr::new("--outdir"),
        workdir.as_os_str(),
    ])?;

    let dest = output_path(source, workdir, extension);
    let bytes = fs::read(&dest).map_err(|source| Error::Io {
        path: dest.clone(),
        source,
    })?;
    if let Err(err) = fs::remove_file(&dest) {
        warn!(path = %dest.display(), error = %err, "failed to remove renderer output");
    }
    debug!(path = %dest.display(), bytes = bytes.len(), "read renderer output");
    Ok(bytes)
}

fn build_tree(raw: &[u8], encoding: &str, config: &Config) -> Result<Node> {
    let html = if config.normalize {
        normalize(raw, encoding)
    } else {
        transcode(raw, encoding)
    };
    let mut tree = parse_tree(&html)?;
    if config.semantic {
        semanticize(&mut tree);
    }
    Ok(tree)
}
