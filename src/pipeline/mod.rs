//! Per-request pipeline stages that surround the engines.
//!
//! ## Data Flow
//!
//! ```text
//! request ──▶ classify ──▶ staging ──▶ engines … ──▶ output
//!            (ext/kind)   (temp file)   (waterfall)
//! ```
//!
//! 1. [`classify`] — derive the normalised extension and the image /
//!    legacy-Word flags from filename and declared media type
//! 2. [`staging`]  — write the bytes once to a scoped temp file the
//!    path-based engines read from
//! 3. [`postprocess`] — text cleanup shared by the engines that wrap
//!    external extractors

pub mod classify;
pub mod postprocess;
pub mod staging;
