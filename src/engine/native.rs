//! Primary converter: pure-Rust readers selected by extension.
//!
//! Formats nobody here can read produce an empty outcome so the waterfall
//! moves on. A format that *is* recognised but fails to parse is an
//! [`EngineFault::Parse`]; panics inside third-party readers are caught and
//! reported as [`EngineFault::Panicked`].

use crate::engine::office::{docx_to_markdown, pptx_to_markdown, spreadsheet_to_markdown};
use crate::engine::table::markdown_table;
use crate::engine::{Engine, EngineOutcome};
use crate::error::EngineFault;
use crate::pipeline::postprocess::clean_text;
use crate::pipeline::staging::StagedInput;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::debug;

/// Extensions read as UTF-8 text and passed through unchanged.
const TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".markdown", ".json", ".xml", ".rst", ".log", ".text",
];

/// The readers the native engine has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Docx,
    Pptx,
    Spreadsheet,
    Pdf,
    Html,
    Csv,
    Text,
}

impl Format {
    fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            ".docx" => Some(Format::Docx),
            ".pptx" => Some(Format::Pptx),
            ".xlsx" | ".xlsm" | ".xls" | ".ods" => Some(Format::Spreadsheet),
            ".pdf" => Some(Format::Pdf),
            ".html" | ".htm" => Some(Format::Html),
            ".csv" => Some(Format::Csv),
            ext if TEXT_EXTENSIONS.contains(&ext) => Some(Format::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NativeEngine;

impl NativeEngine {
    pub fn new() -> Self {
        Self
    }
}

fn panic_detail(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Run a third-party reader, turning a panic into a fault.
fn contained<T>(reader: &str, f: impl FnOnce() -> T) -> Result<T, EngineFault> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| EngineFault::Panicked {
        detail: format!("{reader}: {}", panic_detail(payload)),
    })
}

fn pdf_to_text(bytes: &[u8]) -> Result<String, EngineFault> {
    let text = contained("pdf-extract", || pdf_extract::extract_text_from_mem(bytes))?
        .map_err(|e| EngineFault::Parse {
            format: "pdf".into(),
            detail: e.to_string(),
        })?;
    Ok(clean_text(&text))
}

fn html_to_markdown(bytes: &[u8]) -> Result<String, EngineFault> {
    let html = String::from_utf8_lossy(bytes);
    let md = contained("html2md", || html2md::parse_html(&html))?;
    Ok(clean_text(&md))
}

fn csv_to_markdown(bytes: &[u8]) -> Result<String, EngineFault> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| EngineFault::Parse {
            format: "csv".into(),
            detail: e.to_string(),
        })?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    Ok(markdown_table(&rows))
}

impl Engine for NativeEngine {
    fn name(&self) -> &str {
        "native"
    }

    fn attempt(&self, input: &StagedInput) -> Result<EngineOutcome, EngineFault> {
        let bytes = input.bytes();
        let Some(format) = Format::from_extension(input.extension()) else {
            debug!("native: no reader for {:?}", input.extension());
            return Ok(EngineOutcome::empty());
        };
        let text = match format {
            Format::Docx => docx_to_markdown(bytes)?,
            Format::Pptx => pptx_to_markdown(bytes)?,
            Format::Spreadsheet => {
                contained("calamine", || spreadsheet_to_markdown(input.path()))??
            }
            Format::Pdf => pdf_to_text(bytes)?,
            Format::Html => html_to_markdown(bytes)?,
            Format::Csv => csv_to_markdown(bytes)?,
            Format::Text => String::from_utf8_lossy(bytes).into_owned(),
        };
        Ok(EngineOutcome::from_text(text))
    }
}
