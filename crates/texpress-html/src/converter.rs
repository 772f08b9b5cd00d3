//! HTML to LaTeX conversion
//!
//! Conversion runs in four steps:
//!
//! 1. Text between tags is LaTeX-escaped; markup is left alone.
//! 2. The fragment is parsed into a lenient [`Dom`].
//! 3. Elements with a rule are replaced by the filled template, innermost
//!    first, so an outer element sees the already converted text of its
//!    children.
//! 4. The tree is serialized, leftover tags are stripped, and character
//!    references are decoded.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use texpress_core::escape_latex;

use crate::dom::Dom;
use crate::rules::{ConversionRule, Extract, RuleSet};

/// A tag, with `>` allowed inside quoted attribute values
///
/// Tags with an unbalanced quote fall back to the first `>`.
static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(?:[^>"']|"[^"]*"|'[^']*')*>|<[^>]*>"#).expect("valid regex")
});

/// A character reference, optionally preceded by the backslash that
/// escaping put in front of its ampersand
static CHAR_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\\)?&(#[0-9]{1,7}|#[xX][0-9A-Fa-f]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
        .expect("valid regex")
});

/// Converts HTML fragments using a fixed [`RuleSet`]
#[derive(Debug, Clone, Default)]
pub struct HtmlConverter {
    rules: RuleSet,
}

impl HtmlConverter {
    /// Converter using the canonical rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Converter using the canonical rules plus `overrides`
    pub fn with_overrides(overrides: &[ConversionRule]) -> Self {
        Self {
            rules: RuleSet::with_overrides(overrides),
        }
    }

    pub fn with_rules(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Convert an HTML fragment to LaTeX markup
    ///
    /// Never fails. Unknown tags are dropped and their text kept.
    pub fn convert(&self, html: &str) -> String {
        let escaped = escape_text(html);
        let mut dom = Dom::parse(&escaped);

        let elements = dom.elements();
        let mut replaced = 0usize;
        for &id in elements.iter().rev() {
            let Some(rule) = dom.tag(id).and_then(|tag| self.rules.get(tag)) else {
                continue;
            };
            let value = match &rule.extract {
                Extract::Text => dom.text_content(id),
                Extract::Attribute(name) => dom.attribute(id, name).unwrap_or_default().to_string(),
            };
            dom.replace_with_text(id, rule.apply(&value));
            replaced += 1;
        }

        let stripped = TAG.replace_all(&dom.serialize(), "").into_owned();
        let out = decode_references(&stripped).into_owned();

        tracing::debug!(
            elements = elements.len(),
            replaced,
            bytes = out.len(),
            "converted HTML fragment"
        );
        out
    }
}

/// Convert `html` with the canonical rules and optional overrides
pub fn convert(html: &str, overrides: Option<&[ConversionRule]>) -> String {
    match overrides {
        Some(overrides) => HtmlConverter::with_overrides(overrides).convert(html),
        None => HtmlConverter::new().convert(html),
    }
}

/// LaTeX-escape the text between tags, leaving tags untouched
fn escape_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for tag in TAG.find_iter(html) {
        out.push_str(&escape_latex(&html[last..tag.start()]));
        out.push_str(tag.as_str());
        last = tag.end();
    }
    out.push_str(&escape_latex(&html[last..]));
    out
}

/// Decode named and numeric character references
///
/// A reference whose ampersand was escaped earlier decodes to the escaped
/// form of its character, so `\&amp;` stays `\&` and `\&lt;` becomes `<`.
/// Unknown references are left as they are.
fn decode_references(text: &str) -> Cow<'_, str> {
    CHAR_REF.replace_all(text, |caps: &Captures<'_>| {
        let Some(decoded) = resolve(&caps[2]) else {
            return caps[0].to_string();
        };
        if caps.get(1).is_some() {
            escape_latex(&decoded)
        } else {
            decoded
        }
    })
}

fn resolve(reference: &str) -> Option<String> {
    if let Some(number) = reference.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    quick_xml::escape::resolve_html5_entity(reference).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text_skips_tags() {
        assert_eq!(
            escape_text("<p class=\"a_b\">50% & more</p>"),
            "<p class=\"a_b\">50\\% \\& more</p>"
        );
    }

    #[test]
    fn test_escape_text_keeps_quoted_gt_in_tag() {
        assert_eq!(
            escape_text("<a href=\"x>y\">a_b</a>"),
            "<a href=\"x>y\">a\\_b</a>"
        );
        // unbalanced quote falls back to the first `>`
        assert_eq!(escape_text("<b x=it's>#</b>"), "<b x=it's>\\#</b>");
    }

    #[test]
    fn test_decode_escaped_references() {
        assert_eq!(decode_references("Tom \\&amp; Jerry"), "Tom \\& Jerry");
        assert_eq!(decode_references("\\&lt;tag\\&gt;"), "<tag>");
        assert_eq!(decode_references("\\&#36;5"), "\\$5");
        assert_eq!(decode_references("\\&#x41;"), "A");
    }

    #[test]
    fn test_decode_unescaped_references() {
        assert_eq!(decode_references("a&amp;b"), "a&b");
        assert_eq!(decode_references("&eacute;t&eacute;"), "été");
    }

    #[test]
    fn test_unknown_references_kept() {
        assert_eq!(decode_references("\\&bogus;"), "\\&bogus;");
        assert_eq!(decode_references("&#xFFFFFF;"), "&#xFFFFFF;");
    }

    #[test]
    fn test_replacement_is_innermost_first() {
        let converter = HtmlConverter::new();
        assert_eq!(
            converter.convert("<p><b>X</b></p>"),
            "\\textbf{X}\\newline "
        );
    }
}
