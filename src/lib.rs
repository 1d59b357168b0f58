//! # doc2md
//!
//! Convert uploaded documents (Office files, PDFs, HTML, spreadsheets,
//! legacy Word binaries, scanned images) to Markdown through a waterfall of
//! extraction engines.
//!
//! ## Why a waterfall?
//!
//! No single extractor reads everything. A pure-Rust reader handles the
//! common formats quickly; pandoc covers the long tail; antiword reads the
//! binary `.doc` format the others choke on; tesseract recovers text from
//! scans that carry no text layer at all. The orchestrator tries them in a
//! fixed policy order and keeps the first usable answer, with one twist for
//! images: a suspiciously short answer is replaced by OCR output.
//!
//! ## Pipeline Overview
//!
//! ```text
//! bytes + filename + media type
//!  │
//!  ├─ 1. Check     empty → EmptyInput, over limit → TooLarge
//!  ├─ 2. Classify  extension, is_image, is_legacy_word
//!  ├─ 3. Stage     private temp file with the resolved extension
//!  ├─ 4. Engines   primary → pandoc → antiword → tesseract
//!  └─ 5. Output    ConversionResult { markdown, method, … }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2md::{Converter, ConverterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::new(ConverterConfig::from_env()?);
//!     let bytes = std::fs::read("report.docx")?;
//!     let result = converter
//!         .convert(
//!             bytes,
//!             "report.docx",
//!             "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
//!         )
//!         .await?;
//!     eprintln!("converted via {}", result.method);
//!     println!("{}", result.markdown);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2md` binary (clap, anyhow, tracing-subscriber, indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! doc2md = { version = "0.1", default-features = false }
//! ```
//!
//! ## External tools
//!
//! | Engine | Binary | Needed for |
//! |--------|--------|-----------|
//! | primary | none | docx, pptx, xlsx/xls/ods, pdf, html, csv, text |
//! | format-fallback | `pandoc` | everything else pandoc reads |
//! | legacy-word-fallback | `antiword` | `.doc` |
//! | image-text-fallback | `tesseract` (+ `por`, `eng` data) | images |
//!
//! A missing binary is an engine fault: logged, and the waterfall moves on.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod request;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConverterConfig, ConverterConfigBuilder};
pub use convert::Converter;
pub use engine::{Engine, EngineOutcome, EngineSet, Method};
pub use error::{ConvertError, EngineFault};
pub use output::ConversionResult;
pub use pipeline::classify::{classify, FileClassification};
pub use pipeline::staging::StagedInput;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use request::ConversionRequest;
