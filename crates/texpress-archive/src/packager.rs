//! Batch packaging
//!
//! [`Packager::pack`] compiles every document of a batch into a private
//! `texcollection*` directory and bundles the PDFs into one zip file. The
//! directory, zip included, lives exactly as long as the returned
//! [`Archive`].

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use texpress_core::{Compiler, Document, TemplateHost};
use tracing::{debug, info, warn};
use uuid::Uuid;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::error::{ArchiveError, Result};

/// Prefix of batch directory names
pub const BATCH_PREFIX: &str = "texcollection";

/// One compiled document inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Name inside the zip
    pub name: String,
    /// Location of the PDF in the batch directory
    pub path: PathBuf,
}

/// Compiles batches of documents into zip archives
pub struct Packager {
    compiler: Compiler,
    batch_root: PathBuf,
}

impl Packager {
    pub fn new(compiler: Compiler) -> Self {
        Self {
            compiler,
            batch_root: std::env::temp_dir(),
        }
    }

    /// Create batch directories under `root` instead of the system temp dir
    pub fn with_batch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.batch_root = root.into();
        self
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// Compile `documents` and zip the results as `archive_name`
    ///
    /// Any compilation failure aborts the batch and removes the batch
    /// directory before the error is returned.
    pub fn pack(
        &self,
        documents: &[Document],
        archive_name: &str,
        host: &dyn TemplateHost,
    ) -> Result<Archive> {
        if documents.is_empty() {
            return Err(ArchiveError::EmptyBatch);
        }
        let archive_name = Path::new(archive_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ArchiveError::creation(archive_name, "invalid archive name"))?;

        fs::create_dir_all(&self.batch_root)?;
        let dir = tempfile::Builder::new()
            .prefix(BATCH_PREFIX)
            .rand_bytes(10)
            .tempdir_in(&self.batch_root)?;
        debug!("Allocated batch directory {}", dir.path().display());

        // the zip itself lives in the batch directory
        let mut taken = HashSet::from([archive_name.clone()]);
        let mut entries = Vec::with_capacity(documents.len());
        for doc in documents {
            let pdf = self.compiler.compile_document(doc, host)?;
            let name = unique_name(entry_name(doc), &mut taken);
            let path = pdf.persist(&dir.path().join(&name))?;
            debug!("Added {} to batch", name);
            entries.push(ArchiveEntry { name, path });
        }

        let path = dir.path().join(&archive_name);
        write_zip(&path, &entries)?;
        info!(
            "Packed {} document(s) into {}",
            entries.len(),
            path.display()
        );

        Ok(Archive { dir, path, entries })
    }
}

/// Logical name of a document, or a random `xxxxxxxx.pdf`
fn entry_name(doc: &Document) -> String {
    match doc.name() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            let id = Uuid::new_v4().simple().to_string();
            format!("{}.pdf", &id[..8])
        }
    }
}

/// Disambiguate repeated names as `name-2.pdf`, `name-3.pdf`, ...
fn unique_name(name: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.clone()) {
        return name;
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{}", ext)),
        _ => (name.clone(), String::new()),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}{}", stem, n, ext);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn write_zip(path: &Path, entries: &[ArchiveEntry]) -> Result<()> {
    let file = File::create(path).map_err(|e| ArchiveError::creation(path, e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        if !entry.path.exists() {
            warn!("Skipping {}: file no longer exists", entry.path.display());
            continue;
        }
        let contents = fs::read(&entry.path)?;
        zip.start_file(entry.name.as_str(), options)
            .map_err(|e| ArchiveError::creation(path, e))?;
        zip.write_all(&contents)
            .map_err(|e| ArchiveError::creation(path, e))?;
    }

    zip.finish().map_err(|e| ArchiveError::creation(path, e))?;
    Ok(())
}

/// A packed batch
///
/// Owns the batch directory; dropping the handle deletes the zip and every
/// PDF in it.
#[derive(Debug)]
pub struct Archive {
    dir: TempDir,
    path: PathBuf,
    entries: Vec<ArchiveEntry>,
}

impl Archive {
    /// Location of the zip file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The batch directory
    pub fn directory(&self) -> &Path {
        self.dir.path()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }

    /// Copy the zip to `dest`, then release the batch directory
    pub fn persist(self, dest: &Path) -> Result<PathBuf> {
        fs::copy(&self.path, dest)?;
        Ok(dest.to_path_buf())
    }
}

impl Drop for Archive {
    fn drop(&mut self) {
        debug!("Releasing batch directory {}", self.dir.path().display());
    }
}
