//! Error types for the doc2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`] — **Fatal**: the request cannot produce Markdown
//!   (empty upload, over the size limit, every engine exhausted). Returned as
//!   `Err(ConvertError)` from the `Converter::convert*` entry points.
//!
//! * [`EngineFault`] — **Non-fatal**: one engine hit an unexpected condition
//!   (tool binary missing, corrupt container, extractor panic). It is routed
//!   as data inside the waterfall and only becomes a [`ConvertError`] when
//!   nothing else can take over.
//!
//! "This engine cannot read the document" is neither: it is an empty
//! [`crate::engine::EngineOutcome`].

use crate::engine::Method;
use thiserror::Error;

/// All fatal errors returned by the doc2md library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The uploaded content has zero bytes.
    #[error("Empty file: the uploaded content has no bytes")]
    EmptyInput,

    /// The uploaded content exceeds the configured maximum.
    #[error("File is larger than the allowed limit ({max} bytes, got {size})")]
    TooLarge { size: usize, max: usize },

    /// A transport payload could not be decoded into bytes.
    #[error("Invalid Base64 content: {reason}")]
    InvalidEncoding { reason: String },

    // ── Waterfall errors ──────────────────────────────────────────────────
    /// Every applicable engine ran and none produced usable text.
    #[error("Conversion failed: unsupported format or no extractable content")]
    AllEnginesFailed,

    /// An engine faulted on a non-image input and nothing recovered.
    #[error("Error converting file ({method} engine): {detail}")]
    ConversionFaulted { method: Method, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The content could not be materialised to a temporary file.
    #[error("Failed to stage upload in a temporary file: {source}")]
    Staging {
        #[source]
        source: std::io::Error,
    },

    /// A local input file could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or environment validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// HTTP status a transport layer should answer with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ConvertError::EmptyInput | ConvertError::InvalidEncoding { .. } => 400,
            ConvertError::TooLarge { .. } => 413,
            ConvertError::AllEnginesFailed => 422,
            ConvertError::ConversionFaulted { .. }
            | ConvertError::Staging { .. }
            | ConvertError::ReadFailed { .. }
            | ConvertError::InvalidConfig(_)
            | ConvertError::Internal(_) => 500,
        }
    }

    /// Stable machine-readable tag for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::EmptyInput => "empty_input",
            ConvertError::TooLarge { .. } => "too_large",
            ConvertError::InvalidEncoding { .. } => "invalid_encoding",
            ConvertError::AllEnginesFailed => "all_engines_failed",
            ConvertError::ConversionFaulted { .. } => "conversion_faulted",
            ConvertError::Staging { .. } => "staging",
            ConvertError::ReadFailed { .. } => "read_failed",
            ConvertError::InvalidConfig(_) => "invalid_config",
            ConvertError::Internal(_) => "internal",
        }
    }
}

/// A non-fatal fault raised by a single engine attempt.
///
/// The orchestrator logs it and moves on to the next applicable engine.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EngineFault {
    /// The external tool binary could not be found.
    #[error("'{tool}' is not installed or not on PATH")]
    ToolMissing { tool: String },

    /// The external tool could not be started or waited on.
    #[error("'{tool}' could not be run: {detail}")]
    ToolFailed { tool: String, detail: String },

    /// The document claims a format the engine reads but is malformed.
    #[error("malformed {format} document: {detail}")]
    Parse { format: String, detail: String },

    /// Reading or writing an engine-side file failed.
    #[error("I/O failure: {detail}")]
    Io { detail: String },

    /// A third-party reader panicked while parsing.
    #[error("reader panicked: {detail}")]
    Panicked { detail: String },
}

impl From<std::io::Error> for EngineFault {
    fn from(e: std::io::Error) -> Self {
        EngineFault::Io {
            detail: e.to_string(),
        }
    }
}
