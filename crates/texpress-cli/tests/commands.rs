//! Integration tests for the CLI commands
//!
//! Commands are driven through the library with a scripted process runner,
//! so no TeX installation is needed.

use std::fs::{self, File};
use std::sync::Arc;

use tempfile::TempDir;
use texpress_cli::{
    compile_command, content_command, convert_command, dry_run_command, load_config,
    pack_command, render_command, JobOptions,
};
use texpress_core::test_utils::{ScriptedRunner, FAKE_PDF, FAIL_MARKER};
use texpress_core::{Compiler, Config};

const VALID: &str = "\\documentclass{article}\n\\begin{document}\nHello\n\\end{document}\n";

struct Fixture {
    dir: TempDir,
    runner: Arc<ScriptedRunner>,
    compiler: Compiler,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let temp_root = dir.path().join("tmp");
    let runner = Arc::new(ScriptedRunner::new("pdflatex"));
    let compiler =
        Compiler::new(Config::default().with_temp_root(&temp_root)).with_runner(runner.clone());
    Fixture {
        dir,
        runner,
        compiler,
    }
}

#[test]
fn test_compile_command_saves_next_to_input() {
    let fx = fixture();
    let input = fx.dir.path().join("hello.tex");
    fs::write(&input, VALID).unwrap();

    let saved = compile_command(&fx.compiler, &input, None, &JobOptions::default()).unwrap();

    assert_eq!(saved, fx.dir.path().join("hello.pdf"));
    assert_eq!(fs::read(&saved).unwrap(), FAKE_PDF);
    assert_eq!(fs::read_dir(fx.dir.path().join("tmp")).unwrap().count(), 0);
}

#[test]
fn test_compile_command_html_input() {
    let fx = fixture();
    let input = fx.dir.path().join("note.html");
    fs::write(&input, "<h1>Note</h1><p>50% done</p>").unwrap();
    let options = JobOptions {
        html: true,
        ..Default::default()
    };

    let out = fx.dir.path().join("note.pdf");
    compile_command(&fx.compiler, &input, Some(&out), &options).unwrap();

    assert!(out.exists());
    assert_eq!(fx.runner.typeset_calls().len(), 1);
}

#[test]
fn test_compile_command_missing_input() {
    let fx = fixture();
    let err = compile_command(
        &fx.compiler,
        &fx.dir.path().join("nope.tex"),
        None,
        &JobOptions::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("Input file not found"));
}

#[test]
fn test_compile_command_failure_keeps_compiler_error() {
    let fx = fixture();
    let input = fx.dir.path().join("bad.tex");
    fs::write(&input, format!("{}\n", FAIL_MARKER)).unwrap();

    let err = compile_command(&fx.compiler, &input, None, &JobOptions::default()).unwrap_err();

    let pdf_err = err
        .downcast_ref::<texpress_core::PdfError>()
        .expect("compiler error in chain");
    assert!(pdf_err.compilation().is_some());
    assert!(!fx.dir.path().join("bad.pdf").exists());
}

#[test]
fn test_content_command_raw_and_base64() {
    let fx = fixture();
    let input = fx.dir.path().join("doc.tex");
    fs::write(&input, VALID).unwrap();

    let mut raw = Vec::new();
    content_command(&fx.compiler, &input, "raw", &JobOptions::default(), &mut raw).unwrap();
    assert_eq!(raw, FAKE_PDF);

    let mut encoded = Vec::new();
    content_command(&fx.compiler, &input, "base64", &JobOptions::default(), &mut encoded).unwrap();
    let text = String::from_utf8(encoded).unwrap();
    assert!(text.ends_with("\r\n"));
    assert!(text.lines().all(|l| l.trim_end_matches('\r').len() <= 76));
}

#[test]
fn test_content_command_rejects_unknown_type() {
    let fx = fixture();
    let input = fx.dir.path().join("doc.tex");
    fs::write(&input, VALID).unwrap();

    let mut out = Vec::new();
    content_command(&fx.compiler, &input, "pdf", &JobOptions::default(), &mut out).unwrap();

    let body: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(body["message"], "Wrong type set. Use raw or base64.");
    assert!(fx.runner.calls().is_empty());
}

#[test]
fn test_convert_command_with_rules() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.html");
    let rules = dir.path().join("rules.toml");
    fs::write(&input, "<p>Hi</p><a href=\"x\">y</a>").unwrap();
    fs::write(
        &rules,
        "[[rule]]\ntag = \"a\"\nattribute = \"href\"\ntemplate = \"\\\\url{$1}\"\n",
    )
    .unwrap();

    assert_eq!(convert_command(&input, None).unwrap(), "Hi\\newline y");
    assert_eq!(
        convert_command(&input, Some(&rules)).unwrap(),
        "Hi\\newline \\url{x}"
    );
}

#[test]
fn test_pack_command_names_entries_after_inputs() {
    let fx = fixture();
    let a = fx.dir.path().join("alpha.tex");
    let b = fx.dir.path().join("beta.tex");
    fs::write(&a, VALID).unwrap();
    fs::write(&b, VALID).unwrap();
    let output = fx.dir.path().join("out.zip");

    let saved = pack_command(
        fx.compiler.clone(),
        &[a, b],
        &output,
        &JobOptions::default(),
    )
    .unwrap();

    let mut zip = zip::ZipArchive::new(File::open(&saved).unwrap()).unwrap();
    let names: Vec<String> = (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect();
    assert_eq!(names, vec!["alpha.pdf", "beta.pdf"]);
}

#[test]
fn test_render_command() {
    let fx = fixture();
    let templates = fx.dir.path().join("views");
    fs::create_dir_all(&templates).unwrap();
    fs::write(templates.join("invoice.tex"), "Total: {{ total }}").unwrap();
    let data = fx.dir.path().join("data.json");
    fs::write(&data, r#"{"total": "$5"}"#).unwrap();
    let output = fx.dir.path().join("invoice.pdf");

    render_command(
        &fx.compiler,
        &templates,
        "invoice",
        Some(&data),
        &output,
        &JobOptions::default(),
    )
    .unwrap();

    assert_eq!(fs::read(&output).unwrap(), FAKE_PDF);
}

#[test]
fn test_render_command_unknown_template() {
    let fx = fixture();
    let err = render_command(
        &fx.compiler,
        fx.dir.path(),
        "missing",
        None,
        &fx.dir.path().join("x.pdf"),
        &JobOptions::default(),
    )
    .unwrap_err();
    assert!(format!("{:#}", err).contains("Template not found"));
}

#[test]
fn test_dry_run_command() {
    let fx = fixture();
    dry_run_command(&fx.compiler).unwrap();
    assert_eq!(fx.runner.calls().len(), 1);
}

#[test]
fn test_load_config_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("texpress.toml");
    fs::write(&path, "compiler_path = \"xelatex\"\nteardown = false\n").unwrap();

    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.compiler_path, "xelatex");
    assert!(!config.teardown);
    assert_eq!(load_config(None).unwrap(), Config::default());
}
