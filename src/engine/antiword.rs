//! Legacy Word direct fallback: antiword.
//!
//! antiword reads the binary Word 97–2003 structure directly and prints
//! plain text. It runs only for inputs classified as legacy Word.

use crate::engine::process::run_tool;
use crate::engine::{Engine, EngineOutcome};
use crate::error::EngineFault;
use crate::pipeline::postprocess::clean_text;
use crate::pipeline::staging::StagedInput;
use std::path::PathBuf;
use tracing::debug;

/// OLE2 / Compound File Binary signature every `.doc` starts with.
pub const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

#[derive(Debug, Clone)]
pub struct AntiwordEngine {
    program: PathBuf,
}

impl AntiwordEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Engine for AntiwordEngine {
    fn name(&self) -> &str {
        "antiword"
    }

    fn attempt(&self, input: &StagedInput) -> Result<EngineOutcome, EngineFault> {
        // Anything without the compound-file header is not a Word binary
        // and antiword would only print a complaint.
        if !input.bytes().starts_with(&CFB_SIGNATURE) {
            debug!("{}: no CFB signature, skipping antiword", input.filename());
            return Ok(EngineOutcome::empty());
        }

        let output = run_tool(&self.program, [input.path()])?;
        match output.into_success_stdout() {
            Some(stdout) => Ok(EngineOutcome::from_text(clean_text(&stdout))),
            None => Ok(EngineOutcome::empty()),
        }
    }
}
