//! External tool invocation.
//!
//! Every engine that shells out goes through [`run_tool`], so exit-code
//! inspection and the "binary missing" case are handled in one place and
//! never leak into the orchestrator.

use crate::error::EngineFault;
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Captured result of one tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// The process exited with status 0.
    pub success: bool,
}

impl ToolOutput {
    /// Stdout when the run succeeded, otherwise `None`.
    pub fn into_success_stdout(self) -> Option<String> {
        if self.success {
            Some(self.stdout)
        } else {
            None
        }
    }
}

/// Run `program` with `args`, blocking until it exits.
///
/// A non-zero exit is an ordinary [`ToolOutput`] with `success: false`.
/// Only a missing binary ([`EngineFault::ToolMissing`]) or a failure to
/// spawn/wait ([`EngineFault::ToolFailed`]) is an error.
pub fn run_tool<I, S>(program: &Path, args: I) -> Result<ToolOutput, EngineFault>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let tool = program.display().to_string();
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineFault::ToolMissing { tool: tool.clone() }
            } else {
                EngineFault::ToolFailed {
                    tool: tool.clone(),
                    detail: e.to_string(),
                }
            }
        })?;

    let result = ToolOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
    };
    debug!(
        "{} exited with {} ({} bytes stdout)",
        tool,
        output.status,
        result.stdout.len()
    );
    Ok(result)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_tool_missing() {
        let err = run_tool(Path::new("doc2md-no-such-tool-xyz"), ["--version"]).unwrap_err();
        assert_eq!(
            err,
            EngineFault::ToolMissing {
                tool: "doc2md-no-such-tool-xyz".into()
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn captures_stdout_on_success() {
        let out = run_tool(Path::new("sh"), ["-c", "printf 'hello'"]).unwrap();
        assert!(out.success);
        assert_eq!(out.stdout, "hello");
        assert_eq!(out.into_success_stdout().as_deref(), Some("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_not_an_error() {
        let out = run_tool(Path::new("sh"), ["-c", "echo oops >&2; exit 3"]).unwrap();
        assert!(!out.success);
        assert!(out.stderr.contains("oops"));
        assert_eq!(out.into_success_stdout(), None);
    }
}
