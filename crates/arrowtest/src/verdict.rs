use std::fmt;

use crate::exec::ExecutionResult;

/// The first failure detected in a run. Every variant aborts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    BuildFailed {
        exit_status: i32,
    },
    ExitStatusMismatch {
        expect_error: bool,
        exit_status: i32,
        stderr: Vec<u8>,
    },
    OutputMismatch {
        expected: Vec<u8>,
        actual: Vec<u8>,
    },
}

impl Failure {
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::BuildFailed { .. } => "build_failed",
            Failure::ExitStatusMismatch { .. } => "exit_status_mismatch",
            Failure::OutputMismatch { .. } => "output_mismatch",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Failure::BuildFailed { .. } => "Could not compile".to_string(),
            Failure::ExitStatusMismatch {
                expect_error,
                exit_status,
                ..
            } => format!(
                "Expected {} but test exited with {exit_status}",
                if *expect_error { "error" } else { "no error" }
            ),
            Failure::OutputMismatch { .. } => "Output does not match expected output".to_string(),
        }
    }

    /// Diagnostic payload printed after the message. Captured bytes are copied
    /// as-is, without any normalization.
    pub fn detail(&self) -> Option<Vec<u8>> {
        match self {
            Failure::BuildFailed { .. } => None,
            Failure::ExitStatusMismatch { stderr, .. } => {
                let mut out = b"stderr:\n".to_vec();
                out.extend_from_slice(stderr);
                out.push(b'\n');
                Some(out)
            }
            Failure::OutputMismatch { expected, actual } => {
                let mut out = b"expected:\n".to_vec();
                out.extend_from_slice(expected);
                out.extend_from_slice(b"\nactual:\n");
                out.extend_from_slice(actual);
                out.push(b'\n');
                Some(out)
            }
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())?;
        if let Some(detail) = self.detail() {
            write!(f, "\n\n{}", String::from_utf8_lossy(&detail))?;
        }
        Ok(())
    }
}

impl std::error::Error for Failure {}

/// Decides a run. The exit status is checked first and on its own: a zero
/// exit is required unless `expect_error` is set, in which case a nonzero exit
/// is required. Only then are stdout and the expectation stream compared, byte
/// for byte.
pub fn judge(result: &ExecutionResult, expect_error: bool) -> Result<(), Failure> {
    if (result.exit_status == 0) == expect_error {
        return Err(Failure::ExitStatusMismatch {
            expect_error,
            exit_status: result.exit_status,
            stderr: result.stderr.clone(),
        });
    }

    if result.stdout != result.expect {
        return Err(Failure::OutputMismatch {
            expected: result.expect.clone(),
            actual: result.stdout.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(exit_status: i32, stdout: &[u8], expect: &[u8]) -> ExecutionResult {
        ExecutionResult {
            exit_status,
            exit_signal: None,
            stdout: stdout.to_vec(),
            stderr: b"boom".to_vec(),
            expect: expect.to_vec(),
        }
    }

    #[test]
    fn passes_on_clean_exit_and_matching_output() {
        assert_eq!(judge(&result(0, b"a\n", b"a\n"), false), Ok(()));
        assert_eq!(judge(&result(0, b"", b""), false), Ok(()));
    }

    #[test]
    fn zero_exit_fails_when_error_expected() {
        let err = judge(&result(0, b"x", b"x"), true).unwrap_err();
        assert_eq!(err.kind(), "exit_status_mismatch");
        assert_eq!(err.message(), "Expected error but test exited with 0");
    }

    #[test]
    fn nonzero_exit_fails_even_with_matching_output() {
        let err = judge(&result(3, b"x", b"x"), false).unwrap_err();
        assert_eq!(
            err,
            Failure::ExitStatusMismatch {
                expect_error: false,
                exit_status: 3,
                stderr: b"boom".to_vec(),
            }
        );
        assert_eq!(err.message(), "Expected no error but test exited with 3");
        assert_eq!(err.detail().unwrap(), b"stderr:\nboom\n");
    }

    #[test]
    fn exit_status_is_checked_before_output() {
        let err = judge(&result(1, b"abc", b"abd"), false).unwrap_err();
        assert_eq!(err.kind(), "exit_status_mismatch");
    }

    #[test]
    fn expected_error_still_compares_output() {
        assert_eq!(judge(&result(2, b"x", b"x"), true), Ok(()));
        let err = judge(&result(2, b"x", b"y"), true).unwrap_err();
        assert_eq!(err.kind(), "output_mismatch");
    }

    #[test]
    fn output_mismatch_shows_both_payloads() {
        let err = judge(&result(0, b"abc", b"abd"), false).unwrap_err();
        assert_eq!(
            err,
            Failure::OutputMismatch {
                expected: b"abd".to_vec(),
                actual: b"abc".to_vec(),
            }
        );
        assert_eq!(err.detail().unwrap(), b"expected:\nabd\nactual:\nabc\n");
        assert_eq!(
            err.to_string(),
            "Output does not match expected output\n\nexpected:\nabd\nactual:\nabc\n"
        );
    }

    #[test]
    fn comparison_is_exact() {
        let err = judge(&result(0, b"abc\n", b"abc"), false).unwrap_err();
        assert_eq!(err.kind(), "output_mismatch");
        let err = judge(&result(0, b"ABC", b"abc"), false).unwrap_err();
        assert_eq!(err.kind(), "output_mismatch");
    }
}
