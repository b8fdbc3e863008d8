use std::fmt::Write as _;

use base64::Engine as _;
use serde::Serialize;
use sha2::{Digest, Sha256};

use arrowtest_contracts::ARROWTEST_REPORT_SCHEMA_VERSION;

use crate::{Outcome, RunReport};

#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub schema_version: &'static str,
    pub mode: &'static str,
    pub ok: bool,
    pub exit_code: u8,
    pub generated_source_sha256: String,
    pub chunks: usize,
    pub assertions: usize,
    pub build: JsonBuild,
    pub run: Option<JsonRun>,
    pub failure: Option<JsonFailure>,
}

#[derive(Debug, Serialize)]
pub struct JsonBuild {
    pub ok: bool,
    pub exit_status: i32,
}

#[derive(Debug, Serialize)]
pub struct JsonRun {
    pub exit_status: i32,
    pub exit_signal: Option<i32>,
    pub stdout_b64: String,
    pub stderr_b64: String,
    pub expect_b64: String,
}

#[derive(Debug, Serialize)]
pub struct JsonFailure {
    pub kind: &'static str,
    pub message: String,
    pub detail: Option<String>,
}

impl JsonReport {
    pub fn from_run(report: &RunReport) -> Self {
        let b64 = base64::engine::general_purpose::STANDARD;
        let run = report.execution.as_ref().map(|exec| JsonRun {
            exit_status: exec.exit_status,
            exit_signal: exec.exit_signal,
            stdout_b64: b64.encode(&exec.stdout),
            stderr_b64: b64.encode(&exec.stderr),
            expect_b64: b64.encode(&exec.expect),
        });
        let failure = match &report.outcome {
            Outcome::Failed(failure) => Some(JsonFailure {
                kind: failure.kind(),
                message: failure.message(),
                detail: failure
                    .detail()
                    .map(|d| String::from_utf8_lossy(&d).into_owned()),
            }),
            Outcome::Passed | Outcome::StoppedAfterBuild => None,
        };

        Self {
            schema_version: ARROWTEST_REPORT_SCHEMA_VERSION,
            mode: if report.execution.is_some() {
                "compile-run"
            } else {
                "compile"
            },
            ok: matches!(report.outcome, Outcome::Passed),
            exit_code: report.outcome.exit_code(),
            generated_source_sha256: report.generated_source_sha256.clone(),
            chunks: report.chunks,
            assertions: report.assertions,
            build: JsonBuild {
                ok: report.build.ok,
                exit_status: report.build.exit_status,
            },
            run,
            failure,
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex_lower(&Sha256::digest(bytes))
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
