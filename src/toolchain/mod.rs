//! Toolchain discovery.
//!
//! Resolves the programs actionman drives (`cmake`, `ctest`) and the CMake
//! generator to configure with. Discovery happens once, at startup; the
//! operations only ever see the resulting [`Toolchain`].

use std::env;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Environment variable overriding the `cmake` program.
pub const CMAKE_ENV: &str = "ACTIONMAN_CMAKE";
/// Environment variable overriding the `ctest` program.
pub const CTEST_ENV: &str = "ACTIONMAN_CTEST";

/// CMake generator used for the configure step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Generator {
    Ninja,
    UnixMakefiles,
    VisualStudio17,
}

impl Generator {
    /// Ninja when available, otherwise the platform's native generator.
    pub fn detect() -> Self {
        if find_in_path("ninja").is_some() {
            Generator::Ninja
        } else if cfg!(windows) {
            Generator::VisualStudio17
        } else {
            Generator::UnixMakefiles
        }
    }

    /// Name passed to `cmake -G`.
    pub fn cmake_name(self) -> &'static str {
        match self {
            Generator::Ninja => "Ninja",
            Generator::UnixMakefiles => "Unix Makefiles",
            Generator::VisualStudio17 => "Visual Studio 17 2022",
        }
    }

    /// Multi-config generators pick the variant at build time (`--config`).
    pub fn is_multi_config(self) -> bool {
        matches!(self, Generator::VisualStudio17)
    }
}

/// The programs and generator every operation uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub cmake: String,
    pub ctest: String,
    pub generator: Generator,
}

impl Toolchain {
    pub fn new(cmake: impl Into<String>, ctest: impl Into<String>, generator: Generator) -> Self {
        Self {
            cmake: cmake.into(),
            ctest: ctest.into(),
            generator,
        }
    }

    /// Resolve from `ACTIONMAN_CMAKE` / `ACTIONMAN_CTEST` and the host `PATH`.
    pub fn detect() -> Self {
        let cmake = env::var(CMAKE_ENV).unwrap_or_else(|_| "cmake".to_string());
        let ctest = env::var(CTEST_ENV).unwrap_or_else(|_| "ctest".to_string());
        let toolchain = Self::new(cmake, ctest, Generator::detect());
        tracing::debug!(?toolchain, "detected toolchain");
        toolchain
    }
}

/// Locate `name` on `PATH`, honoring `PATHEXT` on Windows.
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let extensions: Vec<String> = if cfg!(windows) {
        env::var("PATHEXT")
            .unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string())
            .split(';')
            .map(|ext| ext.to_string())
            .chain(std::iter::once(String::new()))
            .collect()
    } else {
        vec![String::new()]
    };

    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).find_map(|dir| {
        extensions.iter().find_map(|ext| {
            let full = dir.join(format!("{name}{ext}"));
            is_executable(&full).then_some(full)
        })
    })
}

/// Regular file with an execute bit (any regular file on Windows).
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = path.metadata() else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_generator_names() {
        assert_eq!(Generator::Ninja.cmake_name(), "Ninja");
        assert_eq!(Generator::UnixMakefiles.cmake_name(), "Unix Makefiles");
        assert!(Generator::VisualStudio17.is_multi_config());
        assert!(!Generator::Ninja.is_multi_config());
    }

    #[test]
    fn test_missing_file_is_not_executable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_executable(&dir.path().join("nope")));
        assert!(!is_executable(dir.path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_bit_required() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.txt");
        fs::write(&plain, "data").unwrap();
        assert!(!is_executable(&plain));

        let script = dir.path().join("tool.sh");
        fs::write(&script, "#!/bin/sh\necho tool").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(is_executable(&script));
        assert_eq!(find_in_path(script.to_str().unwrap()), Some(script));
    }

    #[test]
    fn test_unknown_program_not_found() {
        assert!(find_in_path("actionman-no-such-tool-xyz").is_none());
    }
}
