//! File-type resolution: filename + declared media type → [`FileClassification`].
//!
//! The classification is computed once per request and decides which
//! waterfall branches apply. It is a pure function over strings; nothing
//! here touches the content bytes.

use crate::config::{normalize_extension, ConverterConfig};
use serde::Serialize;

/// MIME type of the binary Word 97–2003 format.
pub const LEGACY_WORD_MEDIA_TYPE: &str = "application/msword";

/// Derived, immutable view of what kind of document a request carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileClassification {
    /// Lower-cased extension with a leading dot, or empty.
    pub extension: String,
    pub is_image: bool,
    pub is_legacy_word: bool,
}

/// Classify a request from its filename and declared media type.
pub fn classify(filename: &str, media_type: &str, config: &ConverterConfig) -> FileClassification {
    let extension = resolve_extension(filename, media_type);
    let media_type = essence(media_type);

    let is_image = media_type.starts_with("image/") || config.is_image_extension(&extension);
    let is_legacy_word = extension == ".doc" || media_type == LEGACY_WORD_MEDIA_TYPE;

    FileClassification {
        extension,
        is_image,
        is_legacy_word,
    }
}

/// The filename's trailing extension, else one derived from the media type,
/// else empty.
pub fn resolve_extension(filename: &str, media_type: &str) -> String {
    if let Some(ext) = filename_extension(filename) {
        return normalize_extension(ext);
    }
    extension_for_media_type(media_type)
        .map(|ext| normalize_extension(&ext))
        .unwrap_or_default()
}

/// Trailing extension of the last path component, without the dot.
///
/// Leading dots mark hidden files, not extensions (`.bashrc` has none),
/// and a trailing dot carries no extension either.
fn filename_extension(filename: &str) -> Option<&str> {
    let base = filename.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(filename);
    let stem_start = base.len() - base.trim_start_matches('.').len();
    let (stem, ext) = base[stem_start..].rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext)
}

/// Map a media type to its conventional extension.
///
/// Common document and image types use a fixed table so the result is the
/// familiar one (`image/jpeg` → `jpg`); anything else takes the first
/// extension `mime_guess` knows for the type.
pub fn extension_for_media_type(media_type: &str) -> Option<String> {
    let media_type = essence(media_type);
    if media_type.is_empty() {
        return None;
    }

    let preferred = match media_type.as_str() {
        "application/pdf" => Some("pdf"),
        "application/msword" => Some("doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => Some("pptx"),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => Some("xlsx"),
        "application/vnd.ms-excel" => Some("xls"),
        "application/vnd.oasis.opendocument.spreadsheet" => Some("ods"),
        "application/rtf" | "text/rtf" => Some("rtf"),
        "application/json" => Some("json"),
        "text/plain" => Some("txt"),
        "text/markdown" => Some("md"),
        "text/html" => Some("html"),
        "text/csv" => Some("csv"),
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/tiff" => Some("tiff"),
        "image/bmp" => Some("bmp"),
        "image/gif" => Some("gif"),
        _ => None,
    };
    if let Some(ext) = preferred {
        return Some(ext.to_string());
    }

    mime_guess::get_mime_extensions_str(&media_type)
        .and_then(|exts| exts.first())
        .map(|ext| ext.to_string())
}

/// Lower-cased media type without parameters (`; charset=…`).
fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}
