//! Pipeline configuration
//!
//! Settings are read once at startup, usually from `texpress.toml`:
//!
//! ```toml
//! compiler_path = "/usr/bin/pdflatex"
//! bibliography_tool_path = "bibtex"
//! temp_root = "/var/tmp/texpress"
//! teardown = true
//! pass_timeout_secs = 120
//! cleanup_extensions = ["aux", "log", "out", "bbl", "blg", "toc", "tex"]
//! ```
//!
//! The resulting [`Config`] is handed to the compiler by value; nothing in
//! the pipeline reads ambient configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Extensions removed from a workspace stem after compilation
pub const DEFAULT_CLEANUP_EXTENSIONS: &[&str] = &["aux", "log", "out", "bbl", "blg", "toc", "tex"];

/// Settings for the compilation pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Typesetting binary invoked for every pass
    pub compiler_path: String,
    /// Bibliography resolver run before the second pass
    pub bibliography_tool_path: String,
    /// Directory holding workspace stems and their artifacts
    pub temp_root: PathBuf,
    /// Delete intermediate artifacts once a compilation finishes
    pub teardown: bool,
    /// Per-invocation timeout in seconds (0 disables the timeout)
    pub pass_timeout_secs: u64,
    /// Artifact extensions deleted on teardown
    pub cleanup_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compiler_path: "pdflatex".to_string(),
            bibliography_tool_path: "bibtex".to_string(),
            temp_root: std::env::temp_dir().join("texpress"),
            teardown: true,
            pass_timeout_secs: 120,
            cleanup_extensions: DEFAULT_CLEANUP_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Parse settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?)
    }

    /// Timeout applied to each external invocation
    pub fn pass_timeout(&self) -> Option<Duration> {
        (self.pass_timeout_secs > 0).then(|| Duration::from_secs(self.pass_timeout_secs))
    }

    /// Set the typesetting binary
    pub fn with_compiler_path(mut self, path: impl Into<String>) -> Self {
        self.compiler_path = path.into();
        self
    }

    /// Set the bibliography binary
    pub fn with_bibliography_tool_path(mut self, path: impl Into<String>) -> Self {
        self.bibliography_tool_path = path.into();
        self
    }

    /// Set the directory holding workspaces
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = root.into();
        self
    }

    /// Enable or disable removal of intermediate artifacts
    pub fn with_teardown(mut self, teardown: bool) -> Self {
        self.teardown = teardown;
        self
    }

    /// Set the per-pass timeout in seconds (0 disables it)
    pub fn with_pass_timeout_secs(mut self, secs: u64) -> Self {
        self.pass_timeout_secs = secs;
        self
    }
}
