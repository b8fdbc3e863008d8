use std::io::{Read as _, Write as _};
use std::path::PathBuf;

use anyhow::{Context, Result};
use arrowtest::artifacts::{DEFAULT_EXE_NAME, DEFAULT_OBJECT_NAME, DEFAULT_SOURCE_NAME};
use arrowtest::config::DEFAULT_MAX_OUTPUT_BYTES;
use arrowtest::report::JsonReport;
use arrowtest::{ArtifactLayout, EnvOverrides, HarnessConfig, Outcome, Template, EXIT_FAILURE};
use clap::Parser;

#[derive(Parser)]
#[command(name = "arrowtest")]
#[command(
    about = "Expand `expr => expected;` tests, build them, run them and check their output.",
    long_about = None
)]
struct Cli {
    /// Test source file. Read from stdin when omitted.
    test: Option<PathBuf>,

    /// Stop after a successful build without running the test (exits 1).
    #[arg(short = 's')]
    stop_after_build: bool,

    /// The test program is expected to exit with a nonzero status.
    #[arg(short = 'e')]
    expect_error: bool,

    /// Template with a single `{test}` placeholder. Defaults to the built-in C prelude.
    #[arg(long)]
    template: Option<PathBuf>,

    /// Directory holding the generated source, the build outputs and the build description.
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_SOURCE_NAME)]
    source_name: String,

    #[arg(long, default_value = DEFAULT_OBJECT_NAME)]
    object_name: String,

    #[arg(long, default_value = DEFAULT_EXE_NAME)]
    exe_name: String,

    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_OUTPUT_BYTES)]
    max_output_bytes: usize,

    /// Print a JSON report instead of the human-readable result.
    #[arg(long)]
    report_json: bool,
}

fn main() -> std::process::ExitCode {
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            std::process::ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn try_main() -> Result<std::process::ExitCode> {
    let cli = Cli::parse();
    arrowtest::logging::init_tracing();

    let source = match &cli.test {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read test source: {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read test source from stdin")?;
            buf
        }
    };

    let source = arrowtest::transform::normalize_newlines(&source);

    let template = match &cli.template {
        Some(path) => Template::load(path)?,
        None => Template::builtin()?,
    };

    let layout = ArtifactLayout {
        work_dir: cli.work_dir.clone(),
        source_name: cli.source_name.clone(),
        object_name: cli.object_name.clone(),
        exe_name: cli.exe_name.clone(),
    };
    let mut config = HarnessConfig::new(layout);
    config.expect_error = cli.expect_error;
    config.stop_after_build = cli.stop_after_build;
    config.max_output_bytes = cli.max_output_bytes;
    config.apply_env(&EnvOverrides::from_process_env());

    let report = arrowtest::run(&source, &template, &config)?;

    if cli.report_json {
        let json = JsonReport::from_run(&report);
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else if let Outcome::Failed(failure) = &report.outcome {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", failure.message())?;
        if let Some(detail) = failure.detail() {
            writeln!(out)?;
            out.write_all(&detail)?;
        }
        out.flush()?;
    }

    Ok(std::process::ExitCode::from(report.outcome.exit_code()))
}
