//! Test harness for `expr => expected;` style C tests.
//!
//! A run expands the assertion notation into C statements, wraps the result in
//! a template, forces a rebuild through an external build tool, executes the
//! binary with an extra expectation stream on descriptor 3, and judges the run
//! from its exit status and from comparing stdout against that stream.

use anyhow::Result;

pub mod artifacts;
pub mod config;
pub mod exec;
pub mod logging;
pub mod report;
pub mod template;
pub mod toolchain;
pub mod transform;
pub mod verdict;

pub use arrowtest_contracts::{EXIT_FAILURE, EXIT_PASS, EXIT_STOPPED_AFTER_BUILD};
pub use artifacts::ArtifactLayout;
pub use config::{EnvOverrides, HarnessConfig};
pub use exec::{run_with_side_channel, ExecCommand, ExecutionResult};
pub use template::Template;
pub use toolchain::{run_build, BuildCommand, BuildOutcome};
pub use transform::transform;
pub use verdict::{judge, Failure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    /// The build succeeded and `stop_after_build` was set.
    StoppedAfterBuild,
    Failed(Failure),
}

impl Outcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Passed => EXIT_PASS,
            Outcome::StoppedAfterBuild => EXIT_STOPPED_AFTER_BUILD,
            Outcome::Failed(_) => EXIT_FAILURE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub generated_source_sha256: String,
    pub chunks: usize,
    pub assertions: usize,
    pub build: BuildOutcome,
    /// `None` when the run ended before the test program was started.
    pub execution: Option<ExecutionResult>,
    pub outcome: Outcome,
}

/// Expands `source` into the template, writes it into `config.layout` and
/// rebuilds it. Unless the build failed or `stop_after_build` is set, the
/// program is then executed and judged.
///
/// `Err` is reserved for harness problems (unwritable work dir, missing build
/// tool, spawn failures). Test failures come back as [`Outcome::Failed`].
pub fn run(source: &str, template: &Template, config: &HarnessConfig) -> Result<RunReport> {
    let transformed = transform(source);
    let generated = template.render(&transformed.text);
    let layout = &config.layout;

    layout.write_source(&generated)?;
    layout.invalidate()?;

    let mut report = RunReport {
        generated_source_sha256: report::sha256_hex(generated.as_bytes()),
        chunks: transformed.chunks,
        assertions: transformed.assertions,
        build: run_build(&config.build, &layout.work_dir)?,
        execution: None,
        outcome: Outcome::Passed,
    };

    if !report.build.ok {
        report.outcome = Outcome::Failed(Failure::BuildFailed {
            exit_status: report.build.exit_status,
        });
        return Ok(report);
    }
    if config.stop_after_build {
        tracing::debug!("stopping after build");
        report.outcome = Outcome::StoppedAfterBuild;
        return Ok(report);
    }

    let cmd = ExecCommand::wrapped(&config.exec_wrapper, &layout.exe_path());
    let execution = run_with_side_channel(&cmd, config.max_output_bytes)?;
    if let Err(failure) = judge(&execution, config.expect_error) {
        tracing::debug!(kind = failure.kind(), "test failed");
        report.outcome = Outcome::Failed(failure);
    }
    report.execution = Some(execution);
    Ok(report)
}
