//! Image text fallback: tesseract OCR over the raw upload bytes.
//!
//! The bytes are decoded with the `image` crate first. Anything that does
//! not decode as an image is "no result", not a fault. Decoded images are
//! re-encoded as PNG into their own scoped temp file so tesseract always
//! sees a format it reads, whatever the upload's container (GIF frames,
//! CMYK JPEGs, 16-bit TIFFs).

use crate::engine::process::run_tool;
use crate::engine::{Engine, EngineOutcome};
use crate::error::EngineFault;
use crate::pipeline::postprocess::clean_text;
use crate::pipeline::staging::StagedInput;
use image::DynamicImage;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TesseractEngine {
    program: PathBuf,
    languages: String,
}

impl TesseractEngine {
    /// `languages` is passed to `-l` verbatim, e.g. `por+eng`.
    pub fn new(program: impl Into<PathBuf>, languages: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            languages: languages.into(),
        }
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }
}

/// Decode `bytes` as an image, or `None` when they are not one.
pub fn decode_image(bytes: &[u8]) -> Option<DynamicImage> {
    match image::load_from_memory(bytes) {
        Ok(img) => Some(img),
        Err(e) => {
            debug!("bytes do not decode as an image: {}", e);
            None
        }
    }
}

/// Encode `img` as PNG bytes.
fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, EngineFault> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| EngineFault::Parse {
            format: "image".into(),
            detail: format!("PNG re-encoding failed: {e}"),
        })?;
    Ok(buf)
}

impl Engine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn attempt(&self, input: &StagedInput) -> Result<EngineOutcome, EngineFault> {
        let Some(img) = decode_image(input.bytes()) else {
            return Ok(EngineOutcome::empty());
        };
        debug!(
            "OCR on {}x{} image ({})",
            img.width(),
            img.height(),
            self.languages
        );

        let png = encode_png(&img)?;
        let mut page = tempfile::Builder::new()
            .prefix("doc2md-ocr-")
            .suffix(".png")
            .tempfile()?;
        page.write_all(&png)?;
        page.flush()?;

        let output = run_tool(
            &self.program,
            [
                page.path().as_os_str(),
                "stdout".as_ref(),
                "-l".as_ref(),
                self.languages.as_ref(),
            ],
        )?;
        page.close()?;

        match output.into_success_stdout() {
            Some(stdout) => Ok(EngineOutcome::from_text(clean_text(&stdout))),
            None => Ok(EngineOutcome::empty()),
        }
    }
}
