//! Output types: the assembled response for one successful conversion.

use crate::engine::Method;
use crate::request::ConversionRequest;
use serde::{Deserialize, Serialize};

/// What a transport sends back after a successful conversion.
///
/// `size_bytes` is the length of the *uploaded content*, not of the
/// Markdown; `markdown` is the accepted engine text, already trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub filename: String,
    pub content_type: String,
    pub size_bytes: usize,
    pub markdown: String,
    pub method: Method,
}

impl ConversionResult {
    /// Combine request metadata with the winning engine's output.
    pub fn assemble(
        request: &ConversionRequest,
        markdown: impl Into<String>,
        method: Method,
    ) -> Self {
        Self {
            filename: request.filename().to_string(),
            content_type: request.media_type().to_string(),
            size_bytes: request.len(),
            markdown: markdown.into(),
            method,
        }
    }

    /// Characters (not bytes) in the Markdown.
    pub fn char_count(&self) -> usize {
        self.markdown.chars().count()
    }
}
