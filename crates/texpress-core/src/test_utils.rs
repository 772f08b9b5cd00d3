//! Shared test utilities for texpress crates
//!
//! [`ScriptedRunner`] stands in for a TeX installation: it writes the same
//! artifacts `pdflatex` would (`.aux`, `.log`, `.pdf`) next to the stem it
//! is given, and fails like `pdflatex` when the source contains
//! [`FAIL_MARKER`].

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::notify::{Notification, NotificationSink};
use crate::process::{Invocation, ProcessResult, ProcessRunner};
use crate::workspace::artifact_path;

/// Source containing this command fails to compile
pub const FAIL_MARKER: &str = "\\texpressfail";

/// Bytes written as the "compiled" PDF
pub const FAKE_PDF: &[u8] = b"%PDF-1.5\n%texpress scripted output\n%%EOF\n";

/// Process runner that imitates pdflatex and bibtex
#[derive(Debug)]
pub struct ScriptedRunner {
    compiler: String,
    compiler_available: bool,
    bibliography_available: bool,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    /// Runner answering to `compiler` as the typesetting binary
    ///
    /// Any other program is treated as the bibliography tool.
    pub fn new(compiler: impl Into<String>) -> Self {
        Self {
            compiler: compiler.into(),
            compiler_available: true,
            bibliography_available: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Behave as if the compiler binary is not installed
    pub fn without_compiler(mut self) -> Self {
        self.compiler_available = false;
        self
    }

    /// Behave as if the bibliography tool is not installed
    pub fn without_bibliography(mut self) -> Self {
        self.bibliography_available = false;
        self
    }

    /// Every invocation received so far, in order
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Invocations of the typesetting binary only
    pub fn typeset_calls(&self) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == self.compiler)
            .collect()
    }

    fn missing(program: &str) -> ProcessResult {
        ProcessResult::failed(format!(
            "failed to start `{}`: No such file or directory (os error 2)",
            program
        ))
    }

    fn bibliography(&self, invocation: &Invocation) -> ProcessResult {
        if !self.bibliography_available {
            return Self::missing(&invocation.program);
        }
        if let (Some(dir), Some(name)) = (&invocation.current_dir, invocation.args.first()) {
            let stem = dir.join(name);
            let _ = fs::write(artifact_path(&stem, "bbl"), "\\begin{thebibliography}{1}\n");
            let _ = fs::write(artifact_path(&stem, "blg"), "bibtex log\n");
        }
        ProcessResult::succeeded("Database file #1: refs.bib\n")
    }

    fn typeset(&self, invocation: &Invocation) -> ProcessResult {
        if !self.compiler_available {
            return Self::missing(&invocation.program);
        }
        let Some(stem) = invocation.args.last().map(PathBuf::from) else {
            return ProcessResult::failed("no input file");
        };
        let Ok(source) = fs::read_to_string(&stem) else {
            return ProcessResult::failed("input file not readable");
        };

        if source.contains(FAIL_MARKER) {
            let log = format!(
                "This is pdfTeX (scripted)\n! Undefined control sequence.\nl.1 {}\n",
                FAIL_MARKER
            );
            let _ = fs::write(artifact_path(&stem, "log"), log);
            return ProcessResult {
                success: false,
                timed_out: false,
                stdout: b"! Undefined control sequence.\n".to_vec(),
                stderr: Vec::new(),
            };
        }

        let _ = fs::write(artifact_path(&stem, "aux"), "\\relax\n");
        let _ = fs::write(artifact_path(&stem, "log"), "This is pdfTeX (scripted)\n");
        let _ = fs::write(artifact_path(&stem, "pdf"), FAKE_PDF);
        ProcessResult::succeeded("Output written\n")
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> ProcessResult {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }
        if invocation.program == self.compiler {
            self.typeset(invocation)
        } else {
            self.bibliography(invocation)
        }
    }
}

/// Sink that keeps every notification for later inspection
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Notification> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Metadata of every recorded event, in order
    pub fn metadata(&self) -> Vec<Value> {
        self.events().into_iter().map(|e| e.metadata).collect()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: &Notification) {
        if let Ok(mut events) = self.events.lock() {
            events.push(notification.clone());
        }
    }
}
