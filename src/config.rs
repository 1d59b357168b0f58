//! Configuration types for document-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConverterConfig`], built
//! via its [`ConverterConfigBuilder`] or loaded from the environment with
//! [`ConverterConfig::from_env`]. The config is established once at process
//! start and never mutated afterwards; every in-flight request reads it
//! through a shared [`crate::Converter`].

use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Default upload limit: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// Extensions classified as images regardless of declared media type.
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".tiff", ".bmp", ".gif"];

/// Tesseract language spec for Portuguese + English recognition.
pub const DEFAULT_OCR_LANGUAGES: &str = "por+eng";

/// Configuration for a [`crate::Converter`].
///
/// # Example
/// ```rust
/// use doc2md::ConverterConfig;
///
/// let config = ConverterConfig::builder()
///     .max_file_size(10 * 1024 * 1024)
///     .ocr_languages("eng")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_file_size, 10 * 1024 * 1024);
/// ```
#[derive(Clone)]
pub struct ConverterConfig {
    /// Maximum accepted content length in bytes. Default: 50 MiB.
    pub max_file_size: usize,

    /// Optional shared secret. Checking it is the transport's job; see
    /// [`ConverterConfig::accepts_key`].
    pub access_key: Option<String>,

    /// Lower-cased, dot-prefixed extensions treated as images.
    /// Default: `.png .jpg .jpeg .tiff .bmp .gif`.
    pub image_extensions: Vec<String>,

    /// Also try the primary engine on legacy Word (`.doc`) input. Default: false.
    ///
    /// The native reader has no `.doc` support, so the default skips it and
    /// goes straight to the format fallback.
    pub primary_for_legacy_word: bool,

    /// Image inputs whose best text so far is shorter than this (in
    /// characters, after trimming) get an OCR pass. Default: 10.
    pub min_image_text_chars: usize,

    /// Tesseract `-l` argument. Default: `por+eng`.
    pub ocr_languages: String,

    /// pandoc binary. Default: `pandoc` (resolved on PATH).
    pub pandoc_path: PathBuf,

    /// antiword binary. Default: `antiword`.
    pub antiword_path: PathBuf,

    /// tesseract binary. Default: `tesseract`.
    pub tesseract_path: PathBuf,

    /// Observer for per-attempt events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            access_key: None,
            image_extensions: DEFAULT_IMAGE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            primary_for_legacy_word: false,
            min_image_text_chars: 10,
            ocr_languages: DEFAULT_OCR_LANGUAGES.to_string(),
            pandoc_path: PathBuf::from("pandoc"),
            antiword_path: PathBuf::from("antiword"),
            tesseract_path: PathBuf::from("tesseract"),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("max_file_size", &self.max_file_size)
            .field("access_key", &self.access_key.as_ref().map(|_| "<redacted>"))
            .field("image_extensions", &self.image_extensions)
            .field("primary_for_legacy_word", &self.primary_for_legacy_word)
            .field("min_image_text_chars", &self.min_image_text_chars)
            .field("ocr_languages", &self.ocr_languages)
            .field("pandoc_path", &self.pandoc_path)
            .field("antiword_path", &self.antiword_path)
            .field("tesseract_path", &self.tesseract_path)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load configuration from process environment variables.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `MAX_FILE_SIZE` | `max_file_size` (bytes) |
    /// | `API_KEY` | `access_key` |
    /// | `DOC2MD_OCR_LANG` | `ocr_languages` |
    /// | `DOC2MD_PANDOC` | `pandoc_path` |
    /// | `DOC2MD_ANTIWORD` | `antiword_path` |
    /// | `DOC2MD_TESSERACT` | `tesseract_path` |
    pub fn from_env() -> Result<Self, ConvertError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConvertError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Self::builder();

        if let Some(raw) = get("MAX_FILE_SIZE") {
            let size = raw.trim().parse::<usize>().map_err(|e| {
                ConvertError::InvalidConfig(format!(
                    "MAX_FILE_SIZE must be a byte count, got {raw:?}: {e}"
                ))
            })?;
            builder = builder.max_file_size(size);
        }
        if let Some(key) = get("API_KEY") {
            builder = builder.access_key(key);
        }
        if let Some(lang) = get("DOC2MD_OCR_LANG") {
            builder = builder.ocr_languages(lang);
        }
        if let Some(p) = get("DOC2MD_PANDOC") {
            builder = builder.pandoc_path(p);
        }
        if let Some(p) = get("DOC2MD_ANTIWORD") {
            builder = builder.antiword_path(p);
        }
        if let Some(p) = get("DOC2MD_TESSERACT") {
            builder = builder.tesseract_path(p);
        }

        builder.build()
    }

    /// Whether a presented key satisfies the configured access key.
    ///
    /// With no key configured every caller is accepted.
    pub fn accepts_key(&self, presented: Option<&str>) -> bool {
        match self.access_key.as_deref() {
            None => true,
            Some(expected) => presented == Some(expected),
        }
    }

    /// Whether `extension` (normalised, e.g. `.png`) is in the image set.
    pub fn is_image_extension(&self, extension: &str) -> bool {
        !extension.is_empty() && self.image_extensions.iter().any(|e| e == extension)
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn max_file_size(mut self, bytes: usize) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn access_key(mut self, key: impl Into<String>) -> Self {
        self.config.access_key = Some(key.into());
        self
    }

    /// Replace the image extension set. Entries are normalised to
    /// lower-case with a leading dot.
    pub fn image_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.image_extensions = extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn primary_for_legacy_word(mut self, v: bool) -> Self {
        self.config.primary_for_legacy_word = v;
        self
    }

    pub fn min_image_text_chars(mut self, n: usize) -> Self {
        self.config.min_image_text_chars = n;
        self
    }

    pub fn ocr_languages(mut self, langs: impl Into<String>) -> Self {
        self.config.ocr_languages = langs.into();
        self
    }

    pub fn pandoc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pandoc_path = path.into();
        self
    }

    pub fn antiword_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.antiword_path = path.into();
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = path.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConvertError> {
        let c = &self.config;
        if c.max_file_size == 0 {
            return Err(ConvertError::InvalidConfig(
                "max_file_size must be ≥ 1 byte".into(),
            ));
        }
        if c.ocr_languages.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "OCR language spec must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Lower-case `ext` and make sure it starts with a dot. Empty stays empty.
pub(crate) fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}
