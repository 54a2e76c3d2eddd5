//! Error types for actionman operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::build_type::BuildType;

/// Exit code reserved for argument-resolution errors (nothing was launched).
pub const USAGE_EXIT_CODE: i32 = 2;

/// Exit code used when a toolchain program could not be started.
pub const LAUNCH_EXIT_CODE: i32 = 127;

/// The toolchain step that produced a [`ActionError::BuildFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Configure,
    Build,
    Install,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::Configure => "Configure",
            Step::Build => "Build",
            Step::Install => "Install",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while orchestrating the toolchain
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Unknown command '{0}'")]
    InvalidCommand(String),

    #[error("Invalid build type '{0}' (expected one of: debug, profile, release, all)")]
    InvalidBuildType(String),

    #[error("Working directory {} does not exist or is not a directory", .0.display())]
    InvalidWorkingDir(PathBuf),

    #[error("Failed to launch '{program}'")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} failed for {build_type} build (exit code {code})")]
    BuildFailure {
        step: Step,
        build_type: BuildType,
        code: i32,
    },

    #[error("No executable named '{name}' found under {}", .dir.display())]
    ExecutableNotFound { name: String, dir: PathBuf },

    #[error("Tests failed for {build_type} build (exit code {code})")]
    TestFailure { build_type: BuildType, code: i32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ActionError {
    /// Process exit code this error should surface as.
    pub fn exit_code(&self) -> i32 {
        match self {
            ActionError::InvalidCommand(_)
            | ActionError::InvalidBuildType(_)
            | ActionError::InvalidWorkingDir(_) => USAGE_EXIT_CODE,
            ActionError::Launch { .. } => LAUNCH_EXIT_CODE,
            ActionError::BuildFailure { code, .. } | ActionError::TestFailure { code, .. } => {
                nonzero(*code)
            }
            ActionError::ExecutableNotFound { .. } | ActionError::Io(_) => 1,
        }
    }

    /// True for errors raised before any subprocess was started.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            ActionError::InvalidCommand(_)
                | ActionError::InvalidBuildType(_)
                | ActionError::InvalidWorkingDir(_)
        )
    }
}

// A failure must never surface as success, even if the child reported 0.
fn nonzero(code: i32) -> i32 {
    if code == 0 { 1 } else { code }
}

pub type Result<T, E = ActionError> = std::result::Result<T, E>;
