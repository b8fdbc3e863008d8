use std::ffi::OsString;

use crate::artifacts::ArtifactLayout;
use crate::toolchain::BuildCommand;

pub const ENV_BUILD_TOOL: &str = "MAKE";
pub const ENV_EXEC_WRAPPER: &str = "EXEC";

pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

/// Environment inputs, captured once so resolution stays a pure function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub build_tool: Option<OsString>,
    pub exec_wrapper: Option<String>,
}

impl EnvOverrides {
    pub fn from_process_env() -> Self {
        Self {
            build_tool: std::env::var_os(ENV_BUILD_TOOL),
            exec_wrapper: std::env::var(ENV_EXEC_WRAPPER).ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub layout: ArtifactLayout,
    pub build: BuildCommand,
    /// Program and arguments prefixed to the test binary invocation.
    pub exec_wrapper: Vec<String>,
    /// The test program must exit nonzero instead of zero.
    pub expect_error: bool,
    pub stop_after_build: bool,
    pub max_output_bytes: usize,
}

impl HarnessConfig {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self {
            layout,
            build: BuildCommand::default(),
            exec_wrapper: Vec::new(),
            expect_error: false,
            stop_after_build: false,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    /// Empty values count as unset.
    pub fn apply_env(&mut self, env: &EnvOverrides) {
        if let Some(tool) = env.build_tool.as_ref().filter(|t| !t.is_empty()) {
            self.build = BuildCommand::new(tool.clone());
        }
        if let Some(raw) = env.exec_wrapper.as_deref() {
            self.exec_wrapper = parse_wrapper(raw);
        }
    }
}

pub fn parse_wrapper(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
