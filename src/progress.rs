//! Progress-callback trait for per-attempt conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConverterConfigBuilder::progress_callback`] to observe
//! the waterfall as it tries each engine.
//!
//! # Example
//!
//! ```rust
//! use doc2md::{ConversionProgressCallback, ConverterConfig, Method};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     attempts: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_attempt_start(&self, method: Method, engine: &str) {
//!         self.attempts.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("trying {engine} ({method})");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { attempts: AtomicUsize::new(0) });
//!
//! let config = ConverterConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::engine::Method;
use std::sync::Arc;

/// Called by the orchestrator as it works through the waterfall.
///
/// Implementations must be `Send + Sync`: concurrent requests share one
/// config and may fire events from different threads at the same time.
/// All methods have default no-op implementations.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once per request, after the precondition checks pass.
    ///
    /// # Arguments
    /// * `filename`   — the request's filename
    /// * `size_bytes` — content length
    fn on_conversion_start(&self, filename: &str, size_bytes: usize) {
        let _ = (filename, size_bytes);
    }

    /// Called just before an engine attempt.
    fn on_attempt_start(&self, method: Method, engine: &str) {
        let _ = (method, engine);
    }

    /// Called when an attempt returns without a fault.
    ///
    /// # Arguments
    /// * `method`    — waterfall slot
    /// * `engine`    — engine name
    /// * `text_len`  — byte length of the trimmed text (0 means "no result")
    fn on_attempt_complete(&self, method: Method, engine: &str, text_len: usize) {
        let _ = (method, engine, text_len);
    }

    /// Called when an attempt faults.
    fn on_attempt_failed(&self, method: Method, engine: &str, error: &str) {
        let _ = (method, engine, error);
    }

    /// Called once when the waterfall ends.
    ///
    /// `method` is `None` when no engine produced accepted text.
    fn on_conversion_complete(&self, method: Option<Method>) {
        let _ = method;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConverterConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
