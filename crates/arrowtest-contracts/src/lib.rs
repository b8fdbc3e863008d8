//! Shared, version-pinned protocol identifiers.
//!
//! These constants are the single source of truth for the values a test program
//! and the tools driving `arrowtest` agree on: the report schema, the descriptor
//! slot of the expectation stream, and the process exit codes.

pub const ARROWTEST_REPORT_SCHEMA_VERSION: &str = "arrowtest.report@0.1.0";

/// Descriptor slot the test program writes its expected output to.
pub const EXPECT_FD: i32 = 3;

pub const EXIT_PASS: u8 = 0;
/// `-s` was given and the build succeeded; nothing was executed.
pub const EXIT_STOPPED_AFTER_BUILD: u8 = 1;
pub const EXIT_FAILURE: u8 = 2;
