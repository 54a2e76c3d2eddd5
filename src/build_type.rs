//! Build-type resolution.
//!
//! Maps user-facing tokens (`debug`, `profile`, `release`, `all`) to the
//! [`BuildType`] variants they select, and owns the single mapping from a
//! variant to its build directory. No other module computes directory
//! names on its own.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{ActionError, Result};

/// Name of the directory (under the working directory) holding every variant.
pub const BUILD_ROOT: &str = "build";

/// A named compilation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    /// Debug symbols, no optimization
    Debug,
    /// Debug symbols and full optimization
    Profile,
    /// Full optimization, no debug symbols
    Release,
}

impl BuildType {
    /// Every variant, in the fixed order batch requests run them.
    pub const ALL: [BuildType; 3] = [BuildType::Debug, BuildType::Profile, BuildType::Release];

    /// Deterministic directory name for this variant.
    pub fn directory_name(self) -> &'static str {
        match self {
            BuildType::Debug => "debug",
            BuildType::Profile => "profile",
            BuildType::Release => "release",
        }
    }

    /// Value passed to `CMAKE_BUILD_TYPE` / `--config`.
    pub fn cmake_name(self) -> &'static str {
        match self {
            BuildType::Debug => "Debug",
            BuildType::Profile => "RelWithDebInfo",
            BuildType::Release => "Release",
        }
    }

    /// Build directory for this variant of the project at `working_dir`.
    pub fn build_dir(self, working_dir: &Path) -> PathBuf {
        working_dir.join(BUILD_ROOT).join(self.directory_name())
    }
}

impl std::fmt::Display for BuildType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.directory_name())
    }
}

/// Resolve a token into the variants it selects.
///
/// `"all"` expands to [`BuildType::ALL`]; the result is never empty.
pub fn resolve(token: &str) -> Result<Vec<BuildType>> {
    match token.trim().to_ascii_lowercase().as_str() {
        "all" => Ok(BuildType::ALL.to_vec()),
        other => resolve_single(other).map(|bt| vec![bt]),
    }
}

/// Resolve a token that must name exactly one variant (`all` is rejected).
pub fn resolve_single(token: &str) -> Result<BuildType> {
    match token.trim().to_ascii_lowercase().as_str() {
        "debug" => Ok(BuildType::Debug),
        "profile" => Ok(BuildType::Profile),
        "release" => Ok(BuildType::Release),
        _ => Err(ActionError::InvalidBuildType(token.to_string())),
    }
}
