//! Staging: materialise request content as a scoped temporary file.
//!
//! pandoc and antiword only read from the file system, so the bytes are
//! written once to a freshly named temp file whose suffix matches the
//! resolved extension (pandoc's auto-detection keys off it). The file lives
//! exactly as long as the [`StagedInput`]: [`StagedInput::close`] removes it
//! on the normal path and `Drop` covers every early return.

use crate::pipeline::classify::FileClassification;
use crate::request::ConversionRequest;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// A request whose content has been written to a private temp file.
pub struct StagedInput<'a> {
    request: &'a ConversionRequest,
    classification: FileClassification,
    file: NamedTempFile,
}

impl<'a> StagedInput<'a> {
    /// Write `request`'s content to a new temp file named
    /// `doc2md-<random><extension>`.
    pub fn stage(
        request: &'a ConversionRequest,
        classification: FileClassification,
    ) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("doc2md-")
            .suffix(&classification.extension)
            .tempfile()?;
        file.write_all(request.content())?;
        file.flush()?;
        debug!(
            "Staged {} bytes at {}",
            request.len(),
            file.path().display()
        );
        Ok(Self {
            request,
            classification,
            file,
        })
    }

    /// Path of the staged copy.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// The original content bytes.
    pub fn bytes(&self) -> &[u8] {
        self.request.content()
    }

    pub fn classification(&self) -> &FileClassification {
        &self.classification
    }

    /// Normalised extension, e.g. `.docx`; may be empty.
    pub fn extension(&self) -> &str {
        &self.classification.extension
    }

    pub fn filename(&self) -> &str {
        self.request.filename()
    }

    pub fn media_type(&self) -> &str {
        self.request.media_type()
    }

    /// Delete the staged file, reporting any removal error.
    pub fn close(self) -> std::io::Result<()> {
        self.file.close()
    }
}
