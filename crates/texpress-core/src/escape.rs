//! LaTeX special-character escaping

/// Escape text so LaTeX typesets it literally
///
/// Backslashes become `\textbackslash{}`, the characters `& % $ # _ { }`
/// are prefixed with a backslash, `~` and `^` become their text commands,
/// and bidi embedding controls (U+202A..U+202F) are dropped.
pub fn escape_latex(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            '\u{202a}'..='\u{202f}' => {}
            _ => out.push(c),
        }
    }
    out
}
