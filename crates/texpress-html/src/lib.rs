//! texpress-html - HTML fragment to LaTeX conversion
//!
//! Rich-text editors hand over HTML; the compilation pipeline wants LaTeX.
//! This crate bridges the two with a small, overridable rule table mapping
//! tags to LaTeX templates.
//!
//! # Example
//!
//! ```
//! use texpress_html::{convert, ConversionRule};
//!
//! assert_eq!(convert("<h1>Intro</h1>", None), "\\section{Intro}");
//!
//! let overrides = [ConversionRule::text("p", "$1\\par ")];
//! assert_eq!(convert("<p>Hi</p>", Some(&overrides)), "Hi\\par ");
//! ```

pub mod converter;
pub mod dom;
pub mod rules;

pub use converter::{convert, HtmlConverter};
pub use dom::{Dom, NodeId, NodeKind};
pub use rules::{overrides_from_toml, ConversionRule, Extract, RuleSet, PLACEHOLDER};
