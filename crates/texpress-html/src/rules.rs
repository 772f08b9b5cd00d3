//! Tag conversion rules
//!
//! A [`ConversionRule`] says how one HTML tag becomes LaTeX: which value to
//! pull out of the element and which template to drop it into. The
//! [`RuleSet`] holds at most one rule per tag; overrides replace the
//! canonical entry with the same tag or add a new one.
//!
//! Overrides can be loaded from TOML:
//!
//! ```toml
//! [[rule]]
//! tag = "p"
//! template = "$1\\par "
//!
//! [[rule]]
//! tag = "a"
//! attribute = "href"
//! template = "\\url{$1}"
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Marker in a template replaced by the extracted value
pub const PLACEHOLDER: &str = "$1";

/// Which value of an element a rule substitutes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extract {
    /// The element's text content
    Text,
    /// The value of the named attribute (empty when absent)
    Attribute(String),
}

/// How to rewrite one HTML tag into markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RuleSpec", into = "RuleSpec")]
pub struct ConversionRule {
    pub tag: String,
    pub extract: Extract,
    pub template: String,
}

impl ConversionRule {
    /// Rule substituting the element's text content
    pub fn text(tag: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            extract: Extract::Text,
            template: template.into(),
        }
    }

    /// Rule substituting an attribute value
    pub fn attribute(
        tag: impl Into<String>,
        attribute: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            extract: Extract::Attribute(attribute.into().to_ascii_lowercase()),
            template: template.into(),
        }
    }

    /// Fill the template with `value`
    pub fn apply(&self, value: &str) -> String {
        self.template.replace(PLACEHOLDER, value)
    }
}

/// Flat serialized form of a rule
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuleSpec {
    tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attribute: Option<String>,
    template: String,
}

impl From<RuleSpec> for ConversionRule {
    fn from(spec: RuleSpec) -> Self {
        match spec.attribute {
            Some(attr) => ConversionRule::attribute(spec.tag, attr, spec.template),
            None => ConversionRule::text(spec.tag, spec.template),
        }
    }
}

impl From<ConversionRule> for RuleSpec {
    fn from(rule: ConversionRule) -> Self {
        let attribute = match rule.extract {
            Extract::Text => None,
            Extract::Attribute(name) => Some(name),
        };
        RuleSpec {
            tag: rule.tag,
            attribute,
            template: rule.template,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RuleFile {
    #[serde(default, rename = "rule")]
    rules: Vec<ConversionRule>,
}

/// Parse `[[rule]]` override tables from TOML
pub fn overrides_from_toml(toml_str: &str) -> Result<Vec<ConversionRule>, toml::de::Error> {
    let file: RuleFile = toml::from_str(toml_str)?;
    Ok(file.rules)
}

/// The active rules, keyed by tag name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    rules: BTreeMap<String, ConversionRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::canonical()
    }
}

impl RuleSet {
    /// Rule set with no entries
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// The built-in table for common inline and block tags
    pub fn canonical() -> Self {
        let mut set = Self::empty();
        for rule in [
            ConversionRule::text("p", "$1\\newline "),
            ConversionRule::text("b", "\\textbf{$1}"),
            ConversionRule::text("strong", "\\textbf{$1}"),
            ConversionRule::text("i", "\\textit{$1}"),
            ConversionRule::text("em", "\\textit{$1}"),
            ConversionRule::text("u", "\\underline{$1}"),
            ConversionRule::text("br", "\\newline "),
            ConversionRule::text("sup", "\\textsuperscript{$1}"),
            ConversionRule::text("sub", "\\textsubscript{$1}"),
            ConversionRule::text("h1", "\\section{$1}"),
            ConversionRule::text("h2", "\\subsection{$1}"),
            ConversionRule::text("h3", "\\subsubsection{$1}"),
            ConversionRule::text("h4", "\\paragraph{$1}"),
            ConversionRule::text("h5", "\\subparagraph{$1}"),
            ConversionRule::text("h6", "\\subparagraph{$1}"),
            ConversionRule::text("li", "\\item $1 "),
            ConversionRule::text("ul", "\\begin{itemize}$1\\end{itemize}"),
            ConversionRule::text("ol", "\\begin{enumerate}$1\\end{enumerate}"),
            ConversionRule::attribute("img", "src", "\\includegraphics[scale=1]{$1}"),
        ] {
            set.insert(rule);
        }
        set
    }

    /// Canonical rules with `overrides` applied in order
    pub fn with_overrides(overrides: &[ConversionRule]) -> Self {
        let mut set = Self::canonical();
        for rule in overrides {
            set.insert(rule.clone());
        }
        set
    }

    /// Add a rule, replacing any rule for the same tag
    pub fn insert(&mut self, rule: ConversionRule) -> Option<ConversionRule> {
        self.rules.insert(rule.tag.clone(), rule)
    }

    pub fn get(&self, tag: &str) -> Option<&ConversionRule> {
        self.rules.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.rules.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversionRule> {
        self.rules.values()
    }
}
