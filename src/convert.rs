//! The conversion waterfall.
//!
//! ## Policy
//!
//! ```text
//! precondition  empty → EmptyInput, over limit → TooLarge   (no engine runs)
//!      │
//!  1. primary               skipped for legacy Word
//!  2. format-fallback       if nothing accepted yet
//!  3. legacy-word-fallback  legacy Word only, if nothing accepted yet
//!  4. image-text-fallback   images only, if nothing accepted yet or the
//!                           accepted text is under the length threshold;
//!                           non-empty OCR text replaces the earlier result
//! ```
//!
//! Faults from steps 1–3 are logged and the waterfall continues. If nothing
//! is accepted in the end and the last of those steps to run faulted, a
//! non-image input surfaces that fault as [`ConvertError::ConversionFaulted`].
//! A later step that ran cleanly and found nothing clears an earlier fault;
//! the outcome is then [`ConvertError::AllEnginesFailed`]. OCR faults are
//! never surfaced.
//!
//! The waterfall itself is blocking (engines shell out or parse in-thread).
//! The async entry points move it onto tokio's blocking pool.

use crate::config::ConverterConfig;
use crate::engine::{EngineSet, Method};
use crate::error::{ConvertError, EngineFault};
use crate::output::ConversionResult;
use crate::pipeline::classify::classify;
use crate::pipeline::staging::StagedInput;
use crate::request::ConversionRequest;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Shared, immutable conversion service.
///
/// Build one at startup and clone it into every request handler; clones
/// share the configuration and engines.
#[derive(Clone, Debug)]
pub struct Converter {
    config: Arc<ConverterConfig>,
    engines: EngineSet,
}

impl Converter {
    /// A converter using the default engines at the tool paths in `config`.
    pub fn new(config: ConverterConfig) -> Self {
        let engines = EngineSet::from_config(&config);
        Self::with_engines(config, engines)
    }

    /// A converter with caller-supplied engines.
    pub fn with_engines(config: ConverterConfig, engines: EngineSet) -> Self {
        Self {
            config: Arc::new(config),
            engines,
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn engines(&self) -> &EngineSet {
        &self.engines
    }

    /// Convert raw bytes to Markdown.
    ///
    /// This is the primary entry point for the library.
    ///
    /// # Errors
    /// - [`ConvertError::EmptyInput`] / [`ConvertError::TooLarge`] before any engine runs
    /// - [`ConvertError::AllEnginesFailed`] when the waterfall is exhausted
    /// - [`ConvertError::ConversionFaulted`] when the last fallback to run on a
    ///   non-image input faulted
    pub async fn convert(
        &self,
        content: impl Into<Vec<u8>>,
        filename: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Result<ConversionResult, ConvertError> {
        self.convert_request(ConversionRequest::new(content, filename, media_type))
            .await
    }

    /// Convert an already-built request on the blocking pool.
    pub async fn convert_request(
        &self,
        request: ConversionRequest,
    ) -> Result<ConversionResult, ConvertError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.convert_blocking(&request))
            .await
            .map_err(|e| ConvertError::Internal(format!("conversion task failed: {e}")))?
    }

    /// Read a local file and convert it.
    ///
    /// The filename is the path's last component. When `media_type` is
    /// `None` it is guessed from the extension.
    pub async fn convert_path(
        &self,
        path: impl AsRef<Path>,
        media_type: Option<&str>,
    ) -> Result<ConversionResult, ConvertError> {
        let path = path.as_ref();
        let content = tokio::fs::read(path)
            .await
            .map_err(|source| ConvertError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let media_type = match media_type {
            Some(m) => m.to_string(),
            None => mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };
        self.convert(content, filename, media_type).await
    }

    /// Run the whole waterfall on the current thread.
    pub fn convert_blocking(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionResult, ConvertError> {
        self.check_preconditions(request)?;

        let start = Instant::now();
        let classification = classify(request.filename(), request.media_type(), &self.config);
        info!(
            "Converting {} ({} bytes, {})",
            request.filename(),
            request.len(),
            request.media_type()
        );
        debug!("Classification: {:?}", classification);

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_conversion_start(request.filename(), request.len());
        }

        let outcome = StagedInput::stage(request, classification)
            .map_err(|source| ConvertError::Staging { source })
            .and_then(|staged| {
                let outcome = self.run_waterfall(&staged);
                if let Err(e) = staged.close() {
                    warn!("Failed to remove staged file: {}", e);
                }
                outcome
            });

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_conversion_complete(outcome.as_ref().ok().map(|(_, method)| *method));
        }

        let (markdown, method) = outcome?;
        info!(
            "Converted {} via {} ({} chars, {}ms)",
            request.filename(),
            method,
            markdown.chars().count(),
            start.elapsed().as_millis()
        );
        Ok(ConversionResult::assemble(request, markdown, method))
    }

    fn check_preconditions(&self, request: &ConversionRequest) -> Result<(), ConvertError> {
        if request.is_empty() {
            return Err(ConvertError::EmptyInput);
        }
        if request.len() > self.config.max_file_size {
            return Err(ConvertError::TooLarge {
                size: request.len(),
                max: self.config.max_file_size,
            });
        }
        Ok(())
    }

    fn run_waterfall(&self, input: &StagedInput<'_>) -> Result<(String, Method), ConvertError> {
        let class = input.classification();
        let mut best: Option<(String, Method)> = None;
        let mut last_fault: Option<(Method, EngineFault)> = None;

        // ── Step 1: primary ──────────────────────────────────────────────
        if !class.is_legacy_word || self.config.primary_for_legacy_word {
            best = self.contained_step(Method::Primary, input, &mut last_fault);
        } else {
            debug!("Legacy Word input: skipping primary engine");
        }

        // ── Step 2: format fallback ──────────────────────────────────────
        if best.is_none() {
            best = self.contained_step(Method::FormatFallback, input, &mut last_fault);
        }

        // ── Step 3: legacy Word extractor ────────────────────────────────
        if best.is_none() && class.is_legacy_word {
            best = self.contained_step(Method::LegacyWordFallback, input, &mut last_fault);
        }

        // ── Step 4: OCR ──────────────────────────────────────────────────
        if class.is_image {
            let threshold = self.config.min_image_text_chars;
            let too_short = best
                .as_ref()
                .map_or(true, |(text, _)| text.chars().count() < threshold);
            if too_short {
                // OCR faults were already logged; they never surface.
                if let Ok(Some(text)) = self.attempt(Method::ImageTextFallback, input) {
                    best = Some((text, Method::ImageTextFallback));
                }
            } else {
                debug!("Accepted text reaches {} chars: OCR not needed", threshold);
            }
        }

        match (best, last_fault) {
            (Some(winner), _) => Ok(winner),
            (None, Some((method, fault))) if !class.is_image => {
                Err(ConvertError::ConversionFaulted {
                    method,
                    detail: fault.to_string(),
                })
            }
            _ => Err(ConvertError::AllEnginesFailed),
        }
    }

    /// One waterfall step whose faults never abort it.
    ///
    /// `last_fault` tracks the most recent step only: a fault is recorded, a
    /// clean attempt (with or without text) clears it.
    fn contained_step(
        &self,
        method: Method,
        input: &StagedInput<'_>,
        last_fault: &mut Option<(Method, EngineFault)>,
    ) -> Option<(String, Method)> {
        match self.attempt(method, input) {
            Ok(text) => {
                *last_fault = None;
                text.map(|t| (t, method))
            }
            Err(fault) => {
                *last_fault = Some((method, fault));
                None
            }
        }
    }

    /// Run the engine in `method`'s slot and report the attempt.
    ///
    /// Returns the accepted (trimmed, non-empty) text, `None` for "no
    /// result", or the fault. Panics inside the engine become
    /// [`EngineFault::Panicked`].
    fn attempt(
        &self,
        method: Method,
        input: &StagedInput<'_>,
    ) -> Result<Option<String>, EngineFault> {
        let engine = self.engines.get(method);
        let name = engine.name();
        let cb = self.config.progress_callback.as_ref();
        if let Some(cb) = cb {
            cb.on_attempt_start(method, name);
        }

        let result = catch_unwind(AssertUnwindSafe(|| engine.attempt(input)))
            .unwrap_or_else(|_| {
                Err(EngineFault::Panicked {
                    detail: format!("{name} engine panicked"),
                })
            });

        match result {
            Ok(outcome) => {
                let accepted = outcome.accepted().map(str::to_string);
                let len = accepted.as_ref().map_or(0, String::len);
                debug!(
                    "{} ({}): {}",
                    method,
                    name,
                    if len > 0 { "accepted" } else { "no result" }
                );
                if let Some(cb) = cb {
                    cb.on_attempt_complete(method, name, len);
                }
                Ok(accepted)
            }
            Err(fault) => {
                warn!(
                    "{} ({}) faulted on {}: {}",
                    method,
                    name,
                    input.filename(),
                    fault
                );
                if let Some(cb) = cb {
                    cb.on_attempt_failed(method, name, &fault.to_string());
                }
                Err(fault)
            }
        }
    }
}
