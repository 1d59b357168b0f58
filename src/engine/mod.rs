//! Conversion engines: black-box text extractors behind one capability trait.
//!
//! The orchestrator in [`crate::convert`] never sees argument arrays, exit
//! codes or parser internals. It hands each engine a staged document and
//! reads back an [`EngineOutcome`]:
//!
//! ```text
//! native    ──▶ primary               (pure-Rust readers: docx, pptx, xlsx, pdf, html, ...)
//! pandoc    ──▶ format-fallback       (two invocation modes, legacy Word first)
//! antiword  ──▶ legacy-word-fallback  (binary .doc text)
//! tesseract ──▶ image-text-fallback   (bilingual OCR)
//! ```
//!
//! An engine that simply cannot read a document returns an empty outcome.
//! `Err(EngineFault)` is reserved for conditions nobody expected: a missing
//! tool binary, a corrupt container in a format the engine claims, a panic
//! inside a third-party reader.

pub mod antiword;
pub mod native;
pub mod office;
pub mod pandoc;
pub mod process;
pub mod table;
pub mod tesseract;

use crate::config::ConverterConfig;
use crate::error::EngineFault;
use crate::pipeline::staging::StagedInput;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub use antiword::AntiwordEngine;
pub use native::NativeEngine;
pub use pandoc::PandocEngine;
pub use tesseract::TesseractEngine;

/// Which engine produced the accepted Markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    Primary,
    FormatFallback,
    LegacyWordFallback,
    ImageTextFallback,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Primary => "primary",
            Method::FormatFallback => "format-fallback",
            Method::LegacyWordFallback => "legacy-word-fallback",
            Method::ImageTextFallback => "image-text-fallback",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one engine attempt.
///
/// `succeeded` is derived from `text` by [`EngineOutcome::from_text`]: true
/// iff the text is non-empty after trimming surrounding whitespace. Engines
/// may build the struct by hand, so [`EngineOutcome::accepted`] re-checks the
/// text rather than trusting the flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutcome {
    pub text: String,
    pub succeeded: bool,
}

impl EngineOutcome {
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let succeeded = !text.trim().is_empty();
        Self { text, succeeded }
    }

    /// "No result": the engine could not read this document.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The accepted text, trimmed, or `None` when the attempt did not
    /// succeed or left nothing but whitespace.
    pub fn accepted(&self) -> Option<&str> {
        let text = self.text.trim();
        if self.succeeded && !text.is_empty() {
            Some(text)
        } else {
            None
        }
    }
}

/// A text-extraction capability.
///
/// Implementations must be `Send + Sync`: one [`crate::Converter`] is shared
/// by every in-flight request. Attempts are blocking calls.
pub trait Engine: Send + Sync {
    /// Short name used in logs and progress events (e.g. `"pandoc"`).
    fn name(&self) -> &str;

    /// Try to extract text from the staged document.
    fn attempt(&self, input: &StagedInput) -> Result<EngineOutcome, EngineFault>;
}

/// The four engine slots the waterfall draws from.
#[derive(Clone)]
pub struct EngineSet {
    pub primary: Arc<dyn Engine>,
    pub format_fallback: Arc<dyn Engine>,
    pub legacy_word: Arc<dyn Engine>,
    pub image_text: Arc<dyn Engine>,
}

impl EngineSet {
    /// Default engines: native readers plus pandoc, antiword and tesseract
    /// at the paths named in `config`.
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            primary: Arc::new(NativeEngine::new()),
            format_fallback: Arc::new(PandocEngine::new(config.pandoc_path.clone())),
            legacy_word: Arc::new(AntiwordEngine::new(config.antiword_path.clone())),
            image_text: Arc::new(TesseractEngine::new(
                config.tesseract_path.clone(),
                config.ocr_languages.clone(),
            )),
        }
    }

    /// The engine occupying the slot for `method`.
    pub fn get(&self, method: Method) -> &Arc<dyn Engine> {
        match method {
            Method::Primary => &self.primary,
            Method::FormatFallback => &self.format_fallback,
            Method::LegacyWordFallback => &self.legacy_word,
            Method::ImageTextFallback => &self.image_text,
        }
    }
}

impl fmt::Debug for EngineSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSet")
            .field("primary", &self.primary.name())
            .field("format_fallback", &self.format_fallback.name())
            .field("legacy_word", &self.legacy_word.name())
            .field("image_text", &self.image_text.name())
            .finish()
    }
}
