//! Format fallback: pandoc, tried in two invocation modes.
//!
//! The first mode names the legacy Word reader explicitly; the second lets
//! pandoc detect the input format from the file extension. The first mode
//! that exits cleanly with non-blank output wins.

use crate::engine::process::run_tool;
use crate::engine::{Engine, EngineOutcome};
use crate::error::EngineFault;
use crate::pipeline::postprocess::clean_text;
use crate::pipeline::staging::StagedInput;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source format passed in the first invocation mode.
pub const LEGACY_WORD_SOURCE_FORMAT: &str = "doc";

/// pandoc-backed general converter.
#[derive(Debug, Clone)]
pub struct PandocEngine {
    program: PathBuf,
}

impl PandocEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Argument lists for each invocation mode, in the order they are tried.
    pub fn invocations(path: &Path) -> Vec<Vec<OsString>> {
        vec![
            vec![
                path.as_os_str().to_os_string(),
                "--from".into(),
                LEGACY_WORD_SOURCE_FORMAT.into(),
                "--to".into(),
                "markdown".into(),
            ],
            vec![
                path.as_os_str().to_os_string(),
                "--to".into(),
                "markdown".into(),
            ],
        ]
    }
}

impl Engine for PandocEngine {
    fn name(&self) -> &str {
        "pandoc"
    }

    fn attempt(&self, input: &StagedInput) -> Result<EngineOutcome, EngineFault> {
        for (mode, args) in Self::invocations(input.path()).into_iter().enumerate() {
            let output = run_tool(&self.program, args)?;
            if !output.success {
                debug!(
                    "pandoc mode {} failed: {}",
                    mode + 1,
                    output.stderr.trim()
                );
                continue;
            }
            let text = clean_text(&output.stdout);
            if !text.is_empty() {
                return Ok(EngineOutcome::from_text(text));
            }
        }
        Ok(EngineOutcome::empty())
    }
}
