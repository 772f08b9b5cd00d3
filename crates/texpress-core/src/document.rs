//! Documents and template rendering
//!
//! A [`Document`] is either raw LaTeX or a template id plus data. Rendering
//! happens at most once per document: raw documents are rendered at
//! construction, templated ones on the first [`Document::render`] call,
//! and every later call returns the same text.

use std::cell::OnceCell;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::compiler::CompilationJob;
use crate::error::{PdfError, Result};
use crate::escape::escape_latex;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{!!\s*([A-Za-z0-9_.\-]+)\s*!!\}|\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}")
        .expect("static pattern")
});

/// Renders a named template with a data mapping into LaTeX
pub trait TemplateHost {
    /// Fails with [`PdfError::TemplateNotFound`] when `id` does not resolve
    fn render(&self, id: &str, data: &serde_json::Value) -> Result<String>;
}

/// Host with no templates; every lookup misses
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTemplates;

impl TemplateHost for NoTemplates {
    fn render(&self, id: &str, _data: &serde_json::Value) -> Result<String> {
        Err(PdfError::TemplateNotFound(id.to_string()))
    }
}

/// Loads `<dir>/<id>.tex` and fills its placeholders
///
/// `{{ key }}` inserts the value LaTeX-escaped, `{!! key !!}` inserts it
/// verbatim. Dotted keys (`{{ client.name }}`) walk nested objects.
/// Missing keys render as nothing.
#[derive(Debug, Clone)]
pub struct DirectoryTemplates {
    dir: PathBuf,
}

impl DirectoryTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn resolve(&self, id: &str) -> Option<PathBuf> {
        let relative = Path::new(id);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if id.is_empty() || !safe {
            return None;
        }
        let path = self.dir.join(format!("{}.tex", id));
        path.is_file().then_some(path)
    }
}

impl TemplateHost for DirectoryTemplates {
    fn render(&self, id: &str, data: &serde_json::Value) -> Result<String> {
        let path = self
            .resolve(id)
            .ok_or_else(|| PdfError::TemplateNotFound(id.to_string()))?;
        debug!("Rendering template {}", path.display());
        let template = fs::read_to_string(&path)?;
        Ok(fill_placeholders(&template, data))
    }
}

fn fill_placeholders(template: &str, data: &serde_json::Value) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            if let Some(key) = caps.get(1) {
                lookup(data, key.as_str())
            } else {
                escape_latex(&lookup(data, &caps[2]))
            }
        })
        .into_owned()
}

fn lookup(data: &serde_json::Value, key: &str) -> String {
    let pointer = format!("/{}", key.replace('.', "/"));
    match data.pointer(&pointer) {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Where a document's markup comes from
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSource {
    Raw(String),
    Template {
        id: String,
        data: serde_json::Value,
    },
}

/// A document to compile, with its rendering memoized
#[derive(Debug, Clone)]
pub struct Document {
    source: DocumentSource,
    rendered: OnceCell<String>,
    name: Option<String>,
    bibliography: bool,
    toc: bool,
    metadata: serde_json::Value,
}

impl Document {
    /// A document whose markup is already LaTeX
    pub fn raw(markup: impl Into<String>) -> Self {
        let markup = markup.into();
        let doc = Self::from_source(DocumentSource::Raw(markup.clone()));
        let _ = doc.rendered.set(markup);
        doc
    }

    /// A document rendered from a template on first use
    pub fn template(id: impl Into<String>, data: serde_json::Value) -> Self {
        Self::from_source(DocumentSource::Template {
            id: id.into(),
            data,
        })
    }

    fn from_source(source: DocumentSource) -> Self {
        Self {
            source,
            rendered: OnceCell::new(),
            name: None,
            bibliography: false,
            toc: false,
            metadata: serde_json::Value::Null,
        }
    }

    /// Name used for this document inside an archive
    ///
    /// Only the final path component is kept.
    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        self.name = Path::new(name.as_ref())
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        self
    }

    /// Resolve the bibliography between the first and second pass
    pub fn with_bibliography(mut self) -> Self {
        self.bibliography = true;
        self
    }

    /// Re-run the compiler so the table of contents settles
    pub fn with_toc(mut self) -> Self {
        self.toc = true;
        self
    }

    /// Opaque value passed through to notifications
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.source, DocumentSource::Raw(_))
    }

    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    /// Markup rendered so far, if any
    pub fn rendered(&self) -> Option<&str> {
        self.rendered.get().map(String::as_str)
    }

    /// Render the document, reusing the first result on later calls
    pub fn render(&self, host: &dyn TemplateHost) -> Result<&str> {
        if let Some(rendered) = self.rendered.get() {
            return Ok(rendered);
        }
        let markup = match &self.source {
            DocumentSource::Raw(markup) => markup.clone(),
            DocumentSource::Template { id, data } => host.render(id, data)?,
        };
        Ok(self.rendered.get_or_init(|| markup))
    }

    /// Compilation settings implied by this document's flags
    pub fn job(&self) -> CompilationJob {
        CompilationJob::new(self.bibliography, self.toc).with_metadata(self.metadata.clone())
    }
}
