//! Temporary compilation workspaces
//!
//! A [`Workspace`] is a unique, extension-free file stem inside the
//! configured temp root. The compiler derives every artifact name from it
//! by suffixing (`stem.aux`, `stem.log`, `stem.pdf`), so the stem itself
//! must never carry an extension.
//!
//! The produced PDF outlives the workspace: it is wrapped in a [`PdfFile`]
//! handle that deletes the file when dropped, unless the caller moved it
//! somewhere else with [`PdfFile::persist`].

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{PdfError, Result};

static ARTIFACT_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[^.\s]{3,4}$").expect("static pattern"));

/// Strip a trailing three or four character extension from a path
///
/// Unique-name primitives on some platforms append `.tmp`; left in place
/// it would turn `stem.log` into `stem.tmp.log`.
pub fn strip_artifact_extension(path: &Path) -> PathBuf {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return path.to_path_buf();
    };
    let stripped = ARTIFACT_EXTENSION.replace(name, "");
    if stripped.is_empty() || stripped == name {
        return path.to_path_buf();
    }
    path.with_file_name(stripped.as_ref())
}

/// A unique file stem owned by one compilation
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    stem: PathBuf,
}

impl Workspace {
    /// Allocate a fresh stem under `root`
    ///
    /// The stem file is created exclusively, so concurrent allocations
    /// against the same root cannot collide.
    pub fn allocate(root: &Path, prefix: &str) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| PdfError::workspace(root, e))?;

        let file = tempfile::Builder::new()
            .prefix(prefix)
            .rand_bytes(10)
            .tempfile_in(root)
            .map_err(|e| PdfError::workspace(root, e))?;
        let (_, path) = file
            .keep()
            .map_err(|e| PdfError::workspace(root, e.error))?;

        let stem = strip_artifact_extension(&path);
        if stem != path {
            fs::rename(&path, &stem).map_err(|e| PdfError::workspace(&stem, e))?;
        }
        make_readable(&stem).map_err(|e| PdfError::workspace(&stem, e))?;

        debug!("Allocated workspace stem {}", stem.display());
        Ok(Self {
            root: root.to_path_buf(),
            stem,
        })
    }

    /// Directory holding the stem and its artifacts
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of the stem (no extension)
    pub fn stem(&self) -> &Path {
        &self.stem
    }

    /// Basename of the stem, used as the job identifier
    pub fn name(&self) -> String {
        self.stem
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Sibling artifact path: `stem` + `.` + `extension`
    pub fn artifact(&self, extension: &str) -> PathBuf {
        artifact_path(&self.stem, extension)
    }

    /// Write the markup verbatim to the stem file
    pub fn write_source(&self, markup: &str) -> Result<()> {
        fs::write(&self.stem, markup).map_err(|e| PdfError::workspace(&self.stem, e))
    }

    /// Handle for the PDF this workspace will produce
    pub fn pdf_file(&self) -> PdfFile {
        PdfFile::new(self.artifact("pdf"))
    }

    /// Remove the stem and its intermediate artifacts
    ///
    /// Does nothing unless `teardown` is set. Missing files are skipped.
    pub fn cleanup(&self, extensions: &[String], teardown: bool) {
        if !teardown {
            debug!("Teardown disabled, keeping {}", self.stem.display());
            return;
        }
        remove_if_exists(&self.stem);
        for extension in extensions {
            remove_if_exists(&self.artifact(extension));
        }
    }
}

/// Build `stem.extension` by string concatenation
pub fn artifact_path(stem: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// A compiled PDF whose file is deleted when the handle drops
#[derive(Debug)]
pub struct PdfFile {
    path: PathBuf,
    armed: bool,
}

impl PdfFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the PDF bytes
    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }

    /// Move the PDF to `dest`; the moved file is no longer cleaned up
    pub fn persist(mut self, dest: &Path) -> Result<PathBuf> {
        move_file(&self.path, dest)?;
        self.armed = false;
        Ok(dest.to_path_buf())
    }
}

impl Drop for PdfFile {
    fn drop(&mut self) {
        if self.armed {
            remove_if_exists(&self.path);
        }
    }
}

fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // rename fails across filesystems
    fs::copy(from, to)?;
    fs::remove_file(from)
}

fn remove_if_exists(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

#[cfg(unix)]
fn make_readable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_readable(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_artifact_extension() {
        assert_eq!(
            strip_artifact_extension(Path::new("/tmp/texAbc123.tmp")),
            PathBuf::from("/tmp/texAbc123")
        );
        assert_eq!(
            strip_artifact_extension(Path::new("/tmp/texAbc123")),
            PathBuf::from("/tmp/texAbc123")
        );
        // two-character suffixes are part of the name
        assert_eq!(
            strip_artifact_extension(Path::new("/tmp/tex.ab")),
            PathBuf::from("/tmp/tex.ab")
        );
    }

    #[test]
    fn test_artifact_path_concatenates() {
        let path = artifact_path(Path::new("/tmp/texAbc"), "log");
        assert_eq!(path, PathBuf::from("/tmp/texAbc.log"));
    }

    #[test]
    fn test_allocate_unique_stems() {
        let dir = tempfile::tempdir().unwrap();
        let a = Workspace::allocate(dir.path(), "tex").unwrap();
        let b = Workspace::allocate(dir.path(), "tex").unwrap();

        assert_ne!(a.stem(), b.stem());
        assert!(a.stem().is_file());
        assert!(a.stem().extension().is_none());
        assert!(a.name().starts_with("tex"));
        assert_eq!(a.root(), dir.path());
    }

    #[test]
    fn test_allocate_creates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("tmp");
        let ws = Workspace::allocate(&root, "tex").unwrap();
        assert!(ws.stem().starts_with(&root));
    }

    #[test]
    fn test_cleanup_respects_teardown_flag() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::allocate(dir.path(), "tex").unwrap();
        fs::write(ws.artifact("aux"), "aux").unwrap();
        let extensions = vec!["aux".to_string(), "log".to_string()];

        ws.cleanup(&extensions, false);
        assert!(ws.stem().exists());
        assert!(ws.artifact("aux").exists());

        // log was never written; missing files are not an error
        ws.cleanup(&extensions, true);
        assert!(!ws.stem().exists());
        assert!(!ws.artifact("aux").exists());
    }

    #[test]
    fn test_pdf_file_deleted_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        fs::write(&path, b"%PDF-1.5").unwrap();

        let pdf = PdfFile::new(path.clone());
        assert!(pdf.exists());
        assert_eq!(pdf.read().unwrap(), b"%PDF-1.5");
        drop(pdf);
        assert!(!path.exists());
    }

    #[test]
    fn test_pdf_file_persist_disarms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        let dest = dir.path().join("kept.pdf");
        fs::write(&path, b"%PDF-1.5").unwrap();

        let moved = PdfFile::new(path.clone()).persist(&dest).unwrap();
        assert_eq!(moved, dest);
        assert!(!path.exists());
        assert!(dest.exists());
    }
}
