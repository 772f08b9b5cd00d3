//! End-to-end conversion tests

use texpress_html::{convert, overrides_from_toml, ConversionRule, HtmlConverter};

#[test]
fn test_paragraph() {
    let out = convert("<p>A</p>", None);
    assert!(out.contains("A\\newline"));
    assert_eq!(out, "A\\newline ");
}

#[test]
fn test_headings() {
    assert_eq!(convert("<h1>Title</h1>", None), "\\section{Title}");
    assert_eq!(convert("<h2>Sub</h2>", None), "\\subsection{Sub}");
    assert_eq!(convert("<h3>T</h3>", None), "\\subsubsection{T}");
    assert_eq!(convert("<h4>T</h4>", None), "\\paragraph{T}");
    assert_eq!(convert("<h5>T</h5>", None), "\\subparagraph{T}");
    assert_eq!(convert("<h6>T</h6>", None), "\\subparagraph{T}");
}

#[test]
fn test_inline_formatting() {
    assert_eq!(
        convert("<b>b</b><strong>s</strong><i>i</i><em>e</em><u>u</u>", None),
        "\\textbf{b}\\textbf{s}\\textit{i}\\textit{e}\\underline{u}"
    );
    assert_eq!(
        convert("x<sup>2</sup>H<sub>2</sub>O", None),
        "x\\textsuperscript{2}H\\textsubscript{2}O"
    );
}

#[test]
fn test_nested_elements_convert_inside_out() {
    assert_eq!(convert("<p><b>X</b></p>", None), "\\textbf{X}\\newline ");
    assert_eq!(
        convert("<p>Hello <b><i>World</i></b>!</p>", None),
        "Hello \\textbf{\\textit{World}}!\\newline "
    );
}

#[test]
fn test_line_breaks() {
    assert_eq!(convert("<p>a<br>b</p>", None), "a\\newline b\\newline ");
    assert_eq!(convert("a<br/>b", None), "a\\newline b");
}

#[test]
fn test_lists() {
    assert_eq!(
        convert("<ul><li>One</li><li>Two</li></ul>", None),
        "\\begin{itemize}\\item One \\item Two \\end{itemize}"
    );
    assert_eq!(
        convert("<ol><li>First</li></ol>", None),
        "\\begin{enumerate}\\item First \\end{enumerate}"
    );
}

#[test]
fn test_image_uses_src_attribute() {
    assert_eq!(
        convert("<img src=\"figures/plot.png\">", None),
        "\\includegraphics[scale=1]{figures/plot.png}"
    );
}

#[test]
fn test_image_without_src_substitutes_empty_value() {
    assert_eq!(convert("<img alt=\"x\">", None), "\\includegraphics[scale=1]{}");
}

#[test]
fn test_unknown_tags_keep_their_text() {
    assert_eq!(convert("<span class=\"x\">hi</span> <div>there</div>", None), "hi there");
}

#[test]
fn test_special_characters_are_escaped() {
    assert_eq!(convert("<p>50% off_now</p>", None), "50\\% off\\_now\\newline ");
    assert_eq!(convert("a \\ b", None), "a \\textbackslash{} b");
}

#[test]
fn test_entities_are_decoded() {
    assert_eq!(convert("<p>Tom &amp; Jerry</p>", None), "Tom \\& Jerry\\newline ");
    assert_eq!(convert("caf&eacute;", None), "café");
    assert_eq!(convert("&lt;b&gt;", None), "<b>");
}

#[test]
fn test_malformed_input_is_tolerated() {
    assert_eq!(convert("<p><b>bold</p>", None), "\\textbf{bold}\\newline ");
    assert_eq!(convert("stray</b> end", None), "stray end");
    assert_eq!(convert("", None), "");
}

#[test]
fn test_overrides_replace_and_extend() {
    let overrides = [
        ConversionRule::text("p", "\\par $1"),
        ConversionRule::attribute("a", "href", "\\url{$1}"),
    ];
    assert_eq!(convert("<p>x</p>", Some(&overrides)), "\\par x");
    assert_eq!(
        convert("<a href=\"https://example.org\">link</a>", Some(&overrides)),
        "\\url{https://example.org}"
    );
    // canonical rules not overridden still apply
    assert_eq!(convert("<b>y</b>", Some(&overrides)), "\\textbf{y}");
}

#[test]
fn test_overrides_loaded_from_toml() {
    let overrides = overrides_from_toml(
        r#"
[[rule]]
tag = "code"
template = "\\texttt{$1}"
"#,
    )
    .unwrap();
    let converter = HtmlConverter::with_overrides(&overrides);
    assert_eq!(converter.convert("<code>ls</code>"), "\\texttt{ls}");
}

#[test]
fn test_plain_text_only_needs_escaping() {
    assert_eq!(convert("just text", None), "just text");
    assert_eq!(convert("#1 & $2", None), "\\#1 \\& \\$2");
}

#[test]
fn test_repeated_conversion_is_stable() {
    let html = "<h2>R&amp;D</h2><p>Cost: <b>$5 &lt; <i>10%</i></b><br>caf&eacute;</p>\
                <ul><li>a_b</li><li><img src=\"x.png\"></li></ul>";
    let first = convert(html, None);
    assert_eq!(convert(html, None), first);

    let overrides = [
        ConversionRule::text("p", "\\par $1"),
        ConversionRule::text("b", "\\emph{$1}"),
    ];
    let with_rules = convert(html, Some(&overrides));
    assert_eq!(convert(html, Some(&overrides)), with_rules);
    assert_ne!(with_rules, first);

    let converter = HtmlConverter::with_overrides(&overrides);
    assert_eq!(converter.convert(html), converter.convert(html));
    assert_eq!(converter.convert(html), with_rules);
}

#[test]
fn test_quoted_gt_in_attribute_stays_in_tag() {
    assert_eq!(convert("<a href=\"x>y\">t</a>", None), "t");
    assert_eq!(convert("<span title='a>b'>50%</span>", None), "50\\%");

    let overrides = [ConversionRule::attribute("a", "href", "\\url{$1}")];
    assert_eq!(
        convert("<a href=\"x>y\">t</a>", Some(&overrides)),
        "\\url{x>y}"
    );
}
