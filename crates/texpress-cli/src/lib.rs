//! texpress CLI - Command-line interface library
//!
//! This library provides the CLI functionality for texpress:
//! - Compile: LaTeX or HTML to PDF
//! - Content: PDF bytes or base64 on stdout
//! - Convert: HTML fragment to LaTeX
//! - Pack: several documents into one zip
//! - Render: template plus JSON data to PDF
//!
//! # Binary Usage
//!
//! ```bash
//! # Compile with bibliography and table of contents
//! texpress compile thesis.tex --bibliography --toc -o thesis.pdf
//!
//! # Base64 output for embedding
//! texpress content letter.tex --type base64
//!
//! # Convert editor HTML, then compile
//! texpress compile note.html --html
//!
//! # Bundle a batch
//! texpress pack a.tex b.tex -o batch.zip
//! ```

pub mod app;
pub mod output;

pub use app::{
    compile_command, content_command, convert_command, dry_run_command, format_failure,
    init_logging, load_config, pack_command, render_command, run_cli, JobOptions,
};
pub use output::{encode_base64_chunked, ContentType, Rejection};
