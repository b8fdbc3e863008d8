use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

pub const DEFAULT_BUILD_TOOL: &str = "make";
/// Arguments that keep the build tool from echoing recipes and directories.
pub const BUILD_QUIET_ARGS: &[&str] = &["--no-print-directory", "-s"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl BuildCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: BUILD_QUIET_ARGS.iter().map(OsString::from).collect(),
        }
    }
}

impl Default for BuildCommand {
    fn default() -> Self {
        Self::new(DEFAULT_BUILD_TOOL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOutcome {
    pub ok: bool,
    pub exit_status: i32,
}

/// Runs the build tool in `work_dir`. Its stderr is inherited and its stdout is
/// redirected to our stderr, so the harness's own stdout carries only the
/// verdict or the JSON report. A spawn failure is an error; a nonzero exit is
/// reported through [`BuildOutcome`].
pub fn run_build(cmd: &BuildCommand, work_dir: &Path) -> Result<BuildOutcome> {
    tracing::debug!(
        program = %cmd.program.to_string_lossy(),
        work_dir = %work_dir.display(),
        "invoking build tool"
    );
    let status = Command::new(&cmd.program)
        .args(&cmd.args)
        .current_dir(work_dir)
        .stdout(std::io::stderr())
        .status()
        .with_context(|| format!("invoke build tool: {:?}", cmd.program))?;

    let exit_status = status.code().unwrap_or(1);
    let ok = status.success();
    if !ok {
        tracing::debug!(exit_status, "build tool failed");
    }
    Ok(BuildOutcome { ok, exit_status })
}
