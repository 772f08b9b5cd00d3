//! Compiler failure diagnostics
//!
//! When a typesetting pass fails, [`diagnose`] assembles a
//! [`CompilationError`] from whatever the compiler left behind: the full
//! `.log` artifact and a snapshot of the submitted source. If the compiler
//! never produced a log (the binary is missing or could not start), the
//! captured stderr and stdout take its place.
//!
//! The log is also scanned for `! ...` error lines and LaTeX warnings so
//! callers get a short, located summary on top of the raw log.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::process::ProcessResult;
use crate::workspace::artifact_path;

/// Snapshot text used when neither source file survives
pub const SOURCE_UNAVAILABLE: &str = "<source unavailable>";

/// How far after a `!` line to look for its `l.<n>` context line
const CONTEXT_WINDOW: usize = 12;

static CONTEXT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^l\.(\d+)\s?(.*)$").expect("static pattern"));
static WARNING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:LaTeX|Package \S+|Class \S+) Warning:\s*(.*)$").expect("static pattern")
});
static INPUT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"on input line (\d+)").expect("static pattern"));

/// A terminal compiler failure with everything needed to reproduce it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationError {
    /// Full compiler log, or captured stderr/stdout when no log exists
    pub diagnostic_log: String,
    /// The source exactly as submitted (empty when no log exists)
    pub source_snapshot: String,
    /// Errors and warnings extracted from the log
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl CompilationError {
    pub fn new(diagnostic_log: impl Into<String>, source_snapshot: impl Into<String>) -> Self {
        let diagnostic_log = diagnostic_log.into();
        let diagnostics = parse_log(&diagnostic_log);
        Self {
            diagnostic_log,
            source_snapshot: source_snapshot.into(),
            diagnostics,
        }
    }

    /// First error-level diagnostic found in the log
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.diagnostics.iter().find(|d| d.is_error())
    }

    /// One-line description of the failure
    pub fn summary(&self) -> String {
        if let Some(err) = self.first_error() {
            return match err.line {
                Some(line) => format!("{} (line {})", err.message, line),
                None => err.message.clone(),
            };
        }
        self.diagnostic_log
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("compiler exited unsuccessfully")
            .to_string()
    }
}

impl std::fmt::Display for CompilationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary())
    }
}

/// Build the failure report for a failed pass against `stem`
pub fn diagnose(stem: &Path, failed: &ProcessResult) -> CompilationError {
    let log_path = artifact_path(stem, "log");
    let Ok(log) = read_lossy(&log_path) else {
        let mut output = failed.stderr_lossy();
        let stdout = failed.stdout_lossy();
        if !stdout.is_empty() {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(&stdout);
        }
        return CompilationError::new(output, String::new());
    };

    let snapshot = [stem.to_path_buf(), artifact_path(stem, "tex")]
        .iter()
        .find_map(|candidate| read_lossy(candidate).ok())
        .unwrap_or_else(|| SOURCE_UNAVAILABLE.to_string());

    CompilationError::new(log, snapshot)
}

fn read_lossy(path: &Path) -> std::io::Result<String> {
    fs::read(path).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// One located message extracted from a compiler log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,

    /// Source line (1-indexed) reported by the compiler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    /// Source excerpt the compiler printed next to the line number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            line: None,
            context: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if let Some(line) = self.line {
            write!(f, "\n  --> line {}", line)?;
        }
        if let Some(ref context) = self.context {
            write!(f, "\n  = note: {}", context)?;
        }
        Ok(())
    }
}

/// Extract errors and warnings from a TeX log
pub fn parse_log(log: &str) -> Vec<Diagnostic> {
    let lines: Vec<&str> = log.lines().collect();
    let mut diagnostics = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if let Some(message) = line.strip_prefix("! ") {
            let mut diag = Diagnostic::error(message.trim());
            let located = lines
                .iter()
                .skip(i + 1)
                .take(CONTEXT_WINDOW)
                .take_while(|l| !l.starts_with("! "))
                .find_map(|l| CONTEXT_LINE.captures(l));
            if let Some(caps) = located {
                if let Ok(n) = caps[1].parse() {
                    diag = diag.with_line(n);
                }
                let context = caps[2].trim();
                if !context.is_empty() {
                    diag = diag.with_context(context);
                }
            }
            diagnostics.push(diag);
        } else if let Some(caps) = WARNING_LINE.captures(line) {
            let message = caps[1].trim();
            let mut diag = Diagnostic::warning(message);
            if let Some(n) = INPUT_LINE
                .captures(message)
                .and_then(|c| c[1].parse().ok())
            {
                diag = diag.with_line(n);
            }
            diagnostics.push(diag);
        }
    }

    diagnostics
}
