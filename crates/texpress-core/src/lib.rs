//! texpress-core - LaTeX to PDF compilation pipeline
//!
//! This crate drives an external LaTeX toolchain (`pdflatex`, `bibtex`)
//! over a temporary workspace and hands back the produced PDF.
//!
//! # Architecture
//!
//! 1. **Workspace** - allocates a unique, extension-free file stem and
//!    removes intermediate artifacts afterwards
//! 2. **Compiler** - writes the markup and runs 1..N passes, resolving the
//!    bibliography before the second one
//! 3. **Diagnostics** - turns a failed pass into a [`CompilationError`]
//!    carrying the compiler log and the submitted source
//!
//! # Example
//!
//! ```no_run
//! use texpress_core::{CompilationJob, Compiler, Config};
//!
//! let compiler = Compiler::new(Config::default());
//! let job = CompilationJob::new(false, true);
//! let pdf = compiler.compile("\\documentclass{article}\\begin{document}Hi\\end{document}", &job)?;
//! pdf.persist(std::path::Path::new("hello.pdf"))?;
//! # Ok::<(), texpress_core::PdfError>(())
//! ```

pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod escape;
pub mod notify;
pub mod process;
pub mod test_utils;
pub mod workspace;

pub use compiler::{CompilationJob, Compiler, DRY_RUN_SOURCE};
pub use config::{Config, DEFAULT_CLEANUP_EXTENSIONS};
pub use diagnostics::{diagnose, parse_log, CompilationError, Diagnostic, Severity};
pub use document::{DirectoryTemplates, Document, DocumentSource, NoTemplates, TemplateHost};
pub use error::{PdfError, Result};
pub use escape::escape_latex;
pub use notify::{Action, Notification, NotificationKind, NotificationSink, NullSink, TracingSink};
pub use process::{Invocation, ProcessResult, ProcessRunner, SystemRunner};
pub use workspace::{PdfFile, Workspace};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
