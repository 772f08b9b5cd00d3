//! CLI Application logic
//!
//! Every subcommand has a `*_command` function taking an already built
//! [`Compiler`], so the commands can be driven programmatically with a
//! custom process runner.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use texpress_archive::{ArchiveError, Packager};
use texpress_core::{
    Action, CompilationJob, Compiler, Config, DirectoryTemplates, Document, NoTemplates, PdfError,
};
use texpress_html::{overrides_from_toml, HtmlConverter};

use crate::output::ContentType;

#[derive(Parser)]
#[command(name = "texpress")]
#[command(author, version, about = "Compile LaTeX and HTML to PDF", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log pipeline steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Pass selection shared by the compiling commands
#[derive(Debug, Clone, Default, Args)]
pub struct JobOptions {
    /// Resolve the bibliography between the first and second pass
    #[arg(long)]
    pub bibliography: bool,

    /// Run an extra pass so the table of contents settles
    #[arg(long)]
    pub toc: bool,

    /// Override the number of passes
    #[arg(long)]
    pub passes: Option<u32>,

    /// Treat input files as HTML and convert them first
    #[arg(long)]
    pub html: bool,

    /// Conversion rule overrides for HTML input (TOML)
    #[arg(long)]
    pub rules: Option<PathBuf>,
}

impl JobOptions {
    pub fn job(&self) -> CompilationJob {
        let job = CompilationJob::new(self.bibliography, self.toc);
        match self.passes {
            Some(passes) => job.with_passes(passes),
            None => job,
        }
    }

    fn document(&self, input: &Path) -> Result<Document> {
        let markup = read_markup(input, self)?;
        let name = input.with_extension("pdf");
        let mut doc = Document::raw(markup).with_name(name.to_string_lossy());
        if self.bibliography {
            doc = doc.with_bibliography();
        }
        if self.toc {
            doc = doc.with_toc();
        }
        Ok(doc)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a LaTeX (or HTML) file to PDF
    Compile {
        /// Input file
        input: PathBuf,

        /// Output PDF (defaults to the input with a .pdf extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: JobOptions,
    },

    /// Compile a file and write the PDF to stdout as raw bytes or base64
    Content {
        /// Input file
        input: PathBuf,

        /// Content type: raw or base64
        #[arg(short = 't', long = "type", default_value = "raw")]
        content_type: String,

        #[command(flatten)]
        options: JobOptions,
    },

    /// Convert an HTML fragment to LaTeX
    Convert {
        /// Input HTML file
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Conversion rule overrides (TOML)
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Compile several files and bundle the PDFs in a zip archive
    Pack {
        /// Input files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output archive
        #[arg(short, long, default_value = "documents.zip")]
        output: PathBuf,

        #[command(flatten)]
        options: JobOptions,
    },

    /// Render a template with JSON data and compile it
    Render {
        /// Template id (file name without .tex)
        template: String,

        /// Directory holding `<id>.tex` templates
        #[arg(long, default_value = "templates")]
        templates: PathBuf,

        /// JSON file with template data
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Output PDF
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        options: JobOptions,
    },

    /// Compile a built-in document to check the toolchain
    DryRun,
}

/// Run the CLI application
///
/// This is the main entry point for the command-line interface.
/// It parses arguments and dispatches to the appropriate command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let compiler = Compiler::new(config);

    match cli.command {
        Commands::Compile {
            input,
            output,
            options,
        } => {
            let saved = compile_command(&compiler, &input, output.as_deref(), &options)?;
            println!("Created: {}", saved.display());
        }
        Commands::Content {
            input,
            content_type,
            options,
        } => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            content_command(&compiler, &input, &content_type, &options, &mut handle)?;
        }
        Commands::Convert {
            input,
            output,
            rules,
        } => {
            let markup = convert_command(&input, rules.as_deref())?;
            match output {
                Some(path) => {
                    fs::write(&path, markup)
                        .with_context(|| format!("Failed to write output: {}", path.display()))?;
                    println!("Created: {}", path.display());
                }
                None => print!("{}", markup),
            }
        }
        Commands::Pack {
            inputs,
            output,
            options,
        } => {
            let saved = pack_command(compiler, &inputs, &output, &options)?;
            println!("Created: {}", saved.display());
        }
        Commands::Render {
            template,
            templates,
            data,
            output,
            options,
        } => {
            let saved = render_command(
                &compiler,
                &templates,
                &template,
                data.as_deref(),
                &output,
                &options,
            )?;
            println!("Created: {}", saved.display());
        }
        Commands::DryRun => {
            dry_run_command(&compiler)?;
            println!("Toolchain OK: {}", compiler.config().compiler_path);
        }
    }

    Ok(())
}

/// Install the stderr subscriber
///
/// `RUST_LOG` is honoured unless `--verbose` asks for everything.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // a subscriber may already be installed when driven as a library
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Load settings from `path`, or use the defaults
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Compile `input` and save the PDF
///
/// Returns the location of the saved PDF.
pub fn compile_command(
    compiler: &Compiler,
    input: &Path,
    output: Option<&Path>,
    options: &JobOptions,
) -> Result<PathBuf> {
    let markup = read_markup(input, options)?;
    let output = match output {
        Some(p) => p.to_path_buf(),
        None => input.with_extension("pdf"),
    };

    let job = options.job().with_action(Action::Save);
    let pdf = compiler
        .compile(&markup, &job)
        .map_err(report_failure)
        .with_context(|| format!("Failed to compile {}", input.display()))?;
    pdf.persist(&output)
        .with_context(|| format!("Failed to write output file: {}", output.display()))
}

/// Compile `input` and write the PDF to `out` in the requested encoding
///
/// An unknown content type is not an error: the rejection body is written
/// to `out` instead and nothing is compiled.
pub fn content_command(
    compiler: &Compiler,
    input: &Path,
    content_type: &str,
    options: &JobOptions,
    out: &mut dyn Write,
) -> Result<()> {
    let content_type = match ContentType::parse(content_type) {
        Ok(content_type) => content_type,
        Err(rejection) => {
            tracing::warn!("Rejected content request: {}", rejection);
            writeln!(out, "{}", rejection.to_json())?;
            return Ok(());
        }
    };

    let markup = read_markup(input, options)?;
    let job = options.job().with_action(Action::Content);
    let pdf = compiler
        .compile(&markup, &job)
        .map_err(report_failure)
        .with_context(|| format!("Failed to compile {}", input.display()))?;
    let bytes = pdf.read().context("Failed to read compiled PDF")?;

    out.write_all(&content_type.encode(&bytes))?;
    out.flush()?;
    Ok(())
}

/// Convert an HTML file to LaTeX markup
pub fn convert_command(input: &Path, rules: Option<&Path>) -> Result<String> {
    let html = fs::read_to_string(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;
    Ok(converter(rules)?.convert(&html))
}

/// Compile every input and bundle the PDFs into `output`
///
/// Each entry is named after its input file with a `.pdf` extension.
pub fn pack_command(
    compiler: Compiler,
    inputs: &[PathBuf],
    output: &Path,
    options: &JobOptions,
) -> Result<PathBuf> {
    let mut documents = Vec::with_capacity(inputs.len());
    for input in inputs {
        documents.push(options.document(input)?);
    }
    if let Some(passes) = options.passes {
        tracing::debug!("--passes {} ignored for pack; flags decide per document", passes);
    }

    let archive_name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "documents.zip".to_string());

    let archive = Packager::new(compiler)
        .pack(&documents, &archive_name, &NoTemplates)
        .map_err(|e| match e {
            ArchiveError::Compile(inner) => ArchiveError::Compile(report_failure(inner)),
            other => other,
        })
        .context("Failed to pack documents")?;
    archive
        .persist(output)
        .with_context(|| format!("Failed to write archive: {}", output.display()))
}

/// Render `template` from `templates` with optional JSON data and compile it
pub fn render_command(
    compiler: &Compiler,
    templates: &Path,
    template: &str,
    data: Option<&Path>,
    output: &Path,
    options: &JobOptions,
) -> Result<PathBuf> {
    let data = match data {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read data file: {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid JSON in {}", path.display()))?
        }
        None => serde_json::Value::Null,
    };

    let host = DirectoryTemplates::new(templates);
    let doc = Document::template(template, data);
    let markup = doc
        .render(&host)
        .with_context(|| format!("Failed to render template '{}'", template))?;

    let job = options.job().with_action(Action::Save);
    let pdf = compiler
        .compile(markup, &job)
        .map_err(report_failure)
        .with_context(|| format!("Failed to compile template '{}'", template))?;
    pdf.persist(output)
        .with_context(|| format!("Failed to write output file: {}", output.display()))
}

/// Compile the built-in document and discard the result
pub fn dry_run_command(compiler: &Compiler) -> Result<()> {
    compiler
        .dry_run()
        .map_err(report_failure)
        .context("Dry run failed")?;
    Ok(())
}

fn converter(rules: Option<&Path>) -> Result<HtmlConverter> {
    let Some(path) = rules else {
        return Ok(HtmlConverter::new());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rules file: {}", path.display()))?;
    let overrides = overrides_from_toml(&text)
        .with_context(|| format!("Failed to parse rules file: {}", path.display()))?;
    Ok(HtmlConverter::with_overrides(&overrides))
}

fn read_markup(input: &Path, options: &JobOptions) -> Result<String> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    if options.html {
        return convert_command(input, options.rules.as_deref());
    }
    fs::read_to_string(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))
}

/// Print the compiler's diagnostics, log and source to stderr
fn report_failure(err: PdfError) -> PdfError {
    if let Some(compilation) = err.compilation() {
        eprint!("{}", format_failure(compilation));
    }
    err
}

/// Human-readable report of a failed compilation
pub fn format_failure(compilation: &texpress_core::CompilationError) -> String {
    let mut out = String::new();
    for diagnostic in &compilation.diagnostics {
        out.push_str(&diagnostic.to_string());
        out.push('\n');
    }
    out.push_str("\n--- compiler log ---\n");
    out.push_str(&compilation.diagnostic_log);
    if !compilation.diagnostic_log.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("--- source ---\n");
    out.push_str(&compilation.source_snapshot);
    if !compilation.source_snapshot.ends_with('\n') {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_compile_flags() {
        let cli = Cli::try_parse_from([
            "texpress",
            "--verbose",
            "compile",
            "doc.tex",
            "--bibliography",
            "-o",
            "out.pdf",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Compile {
                input,
                output,
                options,
            } => {
                assert_eq!(input, PathBuf::from("doc.tex"));
                assert_eq!(output, Some(PathBuf::from("out.pdf")));
                assert_eq!(options.job().passes(), 3);
            }
            _ => panic!("expected compile"),
        }
    }

    #[test]
    fn test_cli_content_type_is_free_text() {
        let cli = Cli::try_parse_from(["texpress", "content", "doc.tex", "--type", "hex"]).unwrap();
        match cli.command {
            Commands::Content { content_type, .. } => assert_eq!(content_type, "hex"),
            _ => panic!("expected content"),
        }
    }

    #[test]
    fn test_pack_requires_inputs() {
        assert!(Cli::try_parse_from(["texpress", "pack"]).is_err());
    }

    #[test]
    fn test_job_options_passes_override() {
        let options = JobOptions {
            toc: true,
            passes: Some(5),
            ..Default::default()
        };
        assert_eq!(options.job().passes(), 5);
        assert_eq!(JobOptions::default().job().passes(), 1);
    }

    #[test]
    fn test_format_failure_includes_log_and_source() {
        let compilation = texpress_core::CompilationError::new(
            "! Undefined control sequence.\nl.3 \\foo\n",
            "\\documentclass{article}",
        );
        let report = format_failure(&compilation);
        assert!(report.starts_with("error: Undefined control sequence."));
        assert!(report.contains("--> line 3"));
        assert!(report.contains("--- compiler log ---\n! Undefined"));
        assert!(report.ends_with("--- source ---\n\\documentclass{article}\n"));
    }
}
