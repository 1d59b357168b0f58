//! CLI binary for doc2md.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConverterConfig`, runs one conversion and prints the result.

use anyhow::{Context, Result};
use clap::Parser;
use doc2md::config::{DEFAULT_IMAGE_EXTENSIONS, DEFAULT_MAX_FILE_SIZE, DEFAULT_OCR_LANGUAGES};
use doc2md::{
    ConversionProgressCallback, ConversionRequest, ConversionResult, Converter, ConverterConfig,
    Method, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner naming the engine being tried and
/// one log line per finished attempt.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Instant,
    attempts: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Instant::now(),
            attempts: AtomicUsize::new(0),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, filename: &str, size_bytes: usize) {
        self.bar.set_prefix("Converting");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{filename} ({size_bytes} bytes)"))
        ));
    }

    fn on_attempt_start(&self, method: Method, engine: &str) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.bar.set_message(format!("{method} ({engine})"));
    }

    fn on_attempt_complete(&self, method: Method, engine: &str, text_len: usize) {
        let (mark, detail) = if text_len > 0 {
            (green("✓"), dim(&format!("{text_len:>6} bytes")))
        } else {
            (dim("·"), dim("no result"))
        };
        self.bar
            .println(format!("  {mark} {:<22} {:<10} {detail}", method.as_str(), engine));
    }

    fn on_attempt_failed(&self, method: Method, engine: &str, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<22} {:<10} {}",
            red("✗"),
            method.as_str(),
            engine,
            red(&msg)
        ));
    }

    fn on_conversion_complete(&self, method: Option<Method>) {
        self.bar.finish_and_clear();
        let elapsed = self.started.elapsed().as_secs_f64();
        let attempts = self.attempts.load(Ordering::SeqCst);
        match method {
            Some(m) => eprintln!(
                "{} converted via {} after {} attempt(s)  {}",
                green("✔"),
                bold(m.as_str()),
                attempts,
                dim(&format!("{elapsed:.1}s"))
            ),
            None => eprintln!(
                "{} no engine produced text after {} attempt(s)",
                red("✘"),
                attempts
            ),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (stdout)
  doc2md report.docx

  # Convert to file
  doc2md slides.pptx -o slides.md

  # OCR a scan with Portuguese only
  doc2md --ocr-lang por scan.png

  # Decode a base64 (or data-URI) payload first
  doc2md --base64 --filename memo.doc --mime application/msword payload.txt

  # JSON result with method and size
  doc2md --json invoice.pdf > invoice.json

WATERFALL:
  1. primary               built-in readers (docx, pptx, xlsx, xls, ods, pdf, html, csv, text)
  2. format-fallback       pandoc
  3. legacy-word-fallback  antiword (.doc only)
  4. image-text-fallback   tesseract (images; replaces results under 10 chars)

ENVIRONMENT VARIABLES:
  MAX_FILE_SIZE       Maximum input size in bytes (default 52428800)
  DOC2MD_OCR_LANG     tesseract language(s) (default por+eng)
  DOC2MD_PANDOC       pandoc binary
  DOC2MD_ANTIWORD     antiword binary
  DOC2MD_TESSERACT    tesseract binary
  RUST_LOG            Log filter, overrides -v/-q
"#;

/// Convert documents to Markdown through a waterfall of conversion engines.
#[derive(Parser, Debug)]
#[command(
    name = "doc2md",
    version,
    about = "Convert documents to Markdown through a waterfall of conversion engines",
    long_about = "Convert Office documents, PDFs, HTML, spreadsheets, legacy Word files and \
scanned images to Markdown. Built-in readers are tried first, then pandoc, antiword and \
tesseract as fallbacks.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local document path.
    input: PathBuf,

    /// Write Markdown to this file instead of stdout.
    #[arg(short, long, env = "DOC2MD_OUTPUT")]
    output: Option<PathBuf>,

    /// Output the structured JSON result instead of Markdown.
    #[arg(long, env = "DOC2MD_JSON")]
    json: bool,

    /// Filename reported to the engines (default: the input's file name).
    #[arg(long)]
    filename: Option<String>,

    /// Declared media type (default: guessed from the filename).
    #[arg(long = "mime")]
    media_type: Option<String>,

    /// The input file holds a base64 or data-URI payload, not raw bytes.
    #[arg(long)]
    base64: bool,

    /// Maximum input size in bytes.
    #[arg(long, env = "MAX_FILE_SIZE", default_value_t = DEFAULT_MAX_FILE_SIZE)]
    max_file_size: usize,

    /// Do not treat .gif files as images.
    #[arg(long)]
    no_gif: bool,

    /// Also try the built-in readers on legacy Word (.doc) input.
    #[arg(long)]
    legacy_word_primary: bool,

    /// tesseract language(s), e.g. por+eng.
    #[arg(long, env = "DOC2MD_OCR_LANG", default_value = DEFAULT_OCR_LANGUAGES)]
    ocr_lang: String,

    /// pandoc binary.
    #[arg(long, env = "DOC2MD_PANDOC", default_value = "pandoc")]
    pandoc: PathBuf,

    /// antiword binary.
    #[arg(long, env = "DOC2MD_ANTIWORD", default_value = "antiword")]
    antiword: PathBuf,

    /// tesseract binary.
    #[arg(long, env = "DOC2MD_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Disable the progress spinner.
    #[arg(long, env = "DOC2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2MD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives the feedback that matters; keep INFO logs out of it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build request ────────────────────────────────────────────────────
    let request = build_request(&cli).await?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let converter = Converter::new(config);

    // ── Run conversion ───────────────────────────────────────────────────
    let start = Instant::now();
    let result = match converter.convert_request(request).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{} {} {}", red("error:"), e, dim(&format!("[{}]", e.kind())));
            return Ok(ExitCode::from(exit_code(e.status_code())));
        }
    };

    let rendered = render(&result, cli.json)?;
    match cli.output {
        Some(ref path) => {
            write_atomic(path, &rendered).await?;
            if !cli.quiet {
                eprintln!(
                    "{}  {}  {}ms  →  {}",
                    green("✔"),
                    result.method,
                    start.elapsed().as_millis(),
                    bold(&path.display().to_string()),
                );
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(rendered.as_bytes())
                .context("Failed to write to stdout")?;
            if !rendered.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
            if !cli.quiet && !show_progress && !cli.json {
                eprintln!(
                    "Converted via {} ({} chars) in {}ms",
                    result.method,
                    result.char_count(),
                    start.elapsed().as_millis()
                );
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Read the input file into a [`ConversionRequest`].
async fn build_request(cli: &Cli) -> Result<ConversionRequest> {
    let raw = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;

    let filename = cli
        .filename
        .clone()
        .or_else(|| {
            cli.input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_default();
    let media_type = cli
        .media_type
        .clone()
        .unwrap_or_else(|| guess_media_type(&filename));

    if cli.base64 {
        let payload = String::from_utf8(raw).context("Base64 payload is not valid UTF-8")?;
        return ConversionRequest::from_base64(filename, media_type, &payload)
            .context("Failed to decode input");
    }
    Ok(ConversionRequest::new(raw, filename, media_type))
}

fn guess_media_type(filename: &str) -> String {
    mime_guess::from_path(Path::new(filename))
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Map CLI args to `ConverterConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConverterConfig> {
    let images = DEFAULT_IMAGE_EXTENSIONS
        .iter()
        .copied()
        .filter(|ext| !(cli.no_gif && *ext == ".gif"));

    let mut builder = ConverterConfig::builder()
        .max_file_size(cli.max_file_size)
        .image_extensions(images)
        .primary_for_legacy_word(cli.legacy_word_primary)
        .ocr_languages(cli.ocr_lang.clone())
        .pandoc_path(cli.pandoc.clone())
        .antiword_path(cli.antiword.clone())
        .tesseract_path(cli.tesseract.clone());
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

fn render(result: &ConversionResult, json: bool) -> Result<String> {
    if json {
        serde_json::to_string_pretty(result).context("Failed to serialise result")
    } else {
        Ok(result.markdown.clone())
    }
}

/// Atomic write: write to a sibling temp file, then rename over `path`.
async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to move output into {}", path.display()))?;
    Ok(())
}

/// Process exit code for a classified error: 2 for caller mistakes, 3 for
/// unconvertible input, 1 otherwise.
fn exit_code(status: u16) -> u8 {
    match status {
        400 | 413 => 2,
        422 => 3,
        _ => 1,
    }
}
