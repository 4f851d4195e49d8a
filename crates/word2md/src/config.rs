//! Document conversion settings.

use std::path::PathBuf;
use std::time::Duration;

use crate::convert::ConvertOptions;

/// Settings for converting one [`Document`](crate::Document).
///
/// ```rust
/// use std::time::Duration;
/// use word2md::Config;
///
/// let config = Config {
///     timeout: Some(Duration::from_secs(120)),
///     ..Default::default()
/// };
/// assert!(config.normalize);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Clean up the renderer's HTML before conversion
    pub normalize: bool,

    /// Working directory for renderer output. A private temporary directory
    /// is created when unset.
    pub tmpdir: Option<PathBuf>,

    /// Recover headings, table headers and list items from formatting
    pub semantic: bool,

    /// Kill the renderer after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,

    pub convert: ConvertOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            normalize: true,
            tmpdir: None,
            semantic: true,
            timeout: None,
            convert: ConvertOptions::default(),
        }
    }
}
