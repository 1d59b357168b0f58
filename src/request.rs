//! The conversion request: bytes plus the two strings that describe them.
//!
//! Transports (multipart upload, JSON + base64 body, the CLI) decode their
//! wire formats into a [`ConversionRequest`] before calling the converter.
//! [`ConversionRequest::from_base64`] covers the JSON case.

use crate::error::ConvertError;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// An immutable conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    filename: String,
    media_type: String,
    content: Vec<u8>,
}

impl ConversionRequest {
    pub fn new(
        content: impl Into<Vec<u8>>,
        filename: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            media_type: media_type.into(),
            content: content.into(),
        }
    }

    /// Build a request from a base64 payload.
    ///
    /// Data-URI payloads (`data:application/pdf;base64,JVBERi0…`) are
    /// accepted: the data is the segment between the first and second
    /// comma. ASCII whitespace anywhere in it (MIME line wrapping) is ignored.
    pub fn from_base64(
        filename: impl Into<String>,
        media_type: impl Into<String>,
        payload: &str,
    ) -> Result<Self, ConvertError> {
        let encoded = payload.split(',').nth(1).unwrap_or(payload);
        let compact: String = encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let content = STANDARD
            .decode(compact)
            .map_err(|e| ConvertError::InvalidEncoding {
                reason: e.to_string(),
            })?;
        Ok(Self::new(content, filename, media_type))
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The media type declared by the caller (not sniffed).
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
