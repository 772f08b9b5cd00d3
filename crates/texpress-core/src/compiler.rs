//! Multi-pass LaTeX to PDF compiler
//!
//! Typesetting is not idempotent in one pass once cross-references, a
//! table of contents or a bibliography are involved: each of those is read
//! back from artifacts (`.aux`, `.bbl`) written by the previous pass. The
//! caller decides how many passes to run; the compiler runs them strictly
//! in order and resolves the bibliography before the second one.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::diagnostics::diagnose;
use crate::document::{Document, TemplateHost};
use crate::error::{PdfError, Result};
use crate::notify::{Action, Notification, NotificationKind, NotificationSink, TracingSink};
use crate::process::{Invocation, ProcessRunner, SystemRunner};
use crate::workspace::{PdfFile, Workspace};

/// Prefix of every workspace stem
const STEM_PREFIX: &str = "tex";

/// Minimal document used to check that the toolchain works
pub const DRY_RUN_SOURCE: &str = r"\documentclass{article}
\begin{document}
texpress dry run: the toolchain is working.
\end{document}
";

/// Settings for one compilation, fixed before the first pass
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationJob {
    passes: u32,
    bibliography: bool,
    action: Action,
    metadata: serde_json::Value,
}

impl Default for CompilationJob {
    fn default() -> Self {
        Self::new(false, false)
    }
}

impl CompilationJob {
    /// Job with the pass count the flags require
    ///
    /// One pass for a plain document, a second for the table of contents,
    /// and three when a bibliography has to be resolved in between.
    pub fn new(bibliography: bool, toc: bool) -> Self {
        let passes = 1 + u32::from(bibliography) + u32::from(toc || bibliography);
        Self {
            passes,
            bibliography,
            action: Action::default(),
            metadata: serde_json::Value::Null,
        }
    }

    /// Override the pass count (at least one pass always runs)
    pub fn with_passes(mut self, passes: u32) -> Self {
        self.passes = passes.max(1);
        self
    }

    /// Resolve the bibliography before the second pass
    pub fn with_bibliography(mut self, bibliography: bool) -> Self {
        self.bibliography = bibliography;
        self
    }

    /// Set the action reported with notifications
    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    /// Attach opaque caller data to notifications
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Number of typesetting passes
    pub fn passes(&self) -> u32 {
        self.passes
    }

    /// Whether the bibliography tool runs
    pub fn bibliography(&self) -> bool {
        self.bibliography
    }

    /// Action reported with notifications
    pub fn action(&self) -> Action {
        self.action
    }

    /// Caller data passed through to notifications
    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }
}

/// Drives the external compiler over a temporary workspace
#[derive(Clone)]
pub struct Compiler {
    config: Config,
    runner: Arc<dyn ProcessRunner>,
    sink: Arc<dyn NotificationSink>,
}

impl Compiler {
    /// Compiler spawning real processes and logging notifications
    pub fn new(config: Config) -> Self {
        Self {
            config,
            runner: Arc::new(SystemRunner::new()),
            sink: Arc::new(TracingSink),
        }
    }

    /// Replace the process runner
    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replace the notification sink
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Settings this compiler was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compile markup to a PDF
    ///
    /// The returned handle owns the PDF file and deletes it when dropped;
    /// use [`PdfFile::persist`] to keep it.
    pub fn compile(&self, markup: &str, job: &CompilationJob) -> Result<PdfFile> {
        let workspace = Workspace::allocate(&self.config.temp_root, STEM_PREFIX)?;
        // Armed before any pass so a failed run also removes a partial PDF.
        let pdf = workspace.pdf_file();

        let result = self.run_passes(&workspace, markup, job);
        workspace.cleanup(&self.config.cleanup_extensions, self.config.teardown);
        result?;

        self.sink.notify(&Notification {
            kind: NotificationKind::Success,
            identifier: pdf.file_name(),
            action: job.action(),
            metadata: job.metadata().clone(),
        });
        info!(
            "Compiled {} in {} pass(es)",
            pdf.path().display(),
            job.passes()
        );
        Ok(pdf)
    }

    /// Render a document (memoized) and compile it with its own flags
    pub fn compile_document(&self, doc: &Document, host: &dyn TemplateHost) -> Result<PdfFile> {
        let markup = doc.render(host)?;
        self.compile(markup, &doc.job())
    }

    /// Compile a built-in minimal document to verify the toolchain
    pub fn dry_run(&self) -> Result<PdfFile> {
        self.compile(DRY_RUN_SOURCE, &CompilationJob::default())
    }

    fn run_passes(&self, workspace: &Workspace, markup: &str, job: &CompilationJob) -> Result<()> {
        workspace.write_source(markup)?;
        let typeset = self.typeset_invocation(workspace);

        for pass in 1..=job.passes() {
            if pass == 2 && job.bibliography() {
                self.resolve_bibliography(workspace);
            }

            debug!("Pass {}/{} for {}", pass, job.passes(), workspace.name());
            let result = self.runner.run(&typeset);
            if !result.success {
                self.sink.notify(&Notification {
                    kind: NotificationKind::Failure,
                    identifier: workspace.name(),
                    action: job.action(),
                    metadata: job.metadata().clone(),
                });
                let error = diagnose(workspace.stem(), &result);
                warn!(
                    "Pass {} of {} failed: {}",
                    pass,
                    workspace.name(),
                    error.summary()
                );
                return Err(PdfError::CompilerInvocationFailed(Box::new(error)));
            }
        }
        Ok(())
    }

    fn typeset_invocation(&self, workspace: &Workspace) -> Invocation {
        Invocation::new(&self.config.compiler_path)
            .arg("-interaction=nonstopmode")
            .arg("-output-directory")
            .arg(workspace.root())
            .arg(workspace.stem())
            .timeout(self.config.pass_timeout())
    }

    /// Best effort: a missing bibliography must not abort the document
    fn resolve_bibliography(&self, workspace: &Workspace) {
        let invocation = Invocation::new(&self.config.bibliography_tool_path)
            .arg(workspace.name())
            .current_dir(workspace.root())
            .timeout(self.config.pass_timeout());
        let result = self.runner.run(&invocation);
        if result.success {
            debug!("Bibliography resolved for {}", workspace.name());
        } else {
            warn!(
                "Bibliography pass for {} failed, continuing: {}",
                workspace.name(),
                result.stderr_lossy().trim()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_pass_counts() {
        assert_eq!(CompilationJob::new(false, false).passes(), 1);
        assert_eq!(CompilationJob::new(false, true).passes(), 2);
        assert_eq!(CompilationJob::new(true, false).passes(), 3);
        assert_eq!(CompilationJob::new(true, true).passes(), 3);
    }

    #[test]
    fn test_job_passes_clamped() {
        assert_eq!(CompilationJob::default().with_passes(0).passes(), 1);
        assert_eq!(CompilationJob::default().with_passes(4).passes(), 4);
    }

    #[test]
    fn test_job_defaults() {
        let job = CompilationJob::default();
        assert!(!job.bibliography());
        assert_eq!(job.action(), Action::Compile);
        assert!(job.metadata().is_null());
    }
}
