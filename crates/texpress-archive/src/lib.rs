//! texpress-archive - compile a batch of documents into one zip
//!
//! # Example
//!
//! ```no_run
//! use texpress_archive::Packager;
//! use texpress_core::{Compiler, Config, Document, NoTemplates};
//!
//! let packager = Packager::new(Compiler::new(Config::default()));
//! let docs = vec![
//!     Document::raw("\\documentclass{article}\\begin{document}A\\end{document}").with_name("a.pdf"),
//!     Document::raw("\\documentclass{article}\\begin{document}B\\end{document}"),
//! ];
//! let archive = packager.pack(&docs, "batch.zip", &NoTemplates)?;
//! archive.persist(std::path::Path::new("batch.zip"))?;
//! # Ok::<(), texpress_archive::ArchiveError>(())
//! ```

pub mod error;
pub mod packager;

pub use error::{ArchiveError, Result};
pub use packager::{Archive, ArchiveEntry, Packager, BATCH_PREFIX};
