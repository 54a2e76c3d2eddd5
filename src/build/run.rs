use std::path::PathBuf;
use std::time::SystemTime;

use colored::*;
use walkdir::WalkDir;

use super::core::BuildOperations;
use crate::config::BuildConfig;
use crate::error::{ActionError, Result};
use crate::runner::{CommandRunner, Invocation};
use crate::toolchain::{Toolchain, is_executable};
use crate::ui;

/// A built executable found in a build directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableLocation {
    /// Absolute path, platform suffix included
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// `<base><platform suffix>`, e.g. `app.exe` on Windows and `app` elsewhere.
pub fn executable_file_name(base: &str) -> String {
    format!("{}{}", base, std::env::consts::EXE_SUFFIX)
}

/// Finds and runs the project's built executable.
pub struct RunOperations<'a> {
    runner: &'a dyn CommandRunner,
    toolchain: &'a Toolchain,
}

impl<'a> RunOperations<'a> {
    pub fn new(runner: &'a dyn CommandRunner, toolchain: &'a Toolchain) -> Self {
        Self { runner, toolchain }
    }

    /// Search the variant's build tree for the target executable.
    ///
    /// When several files match (stale artifacts in other subdirectories),
    /// the most recently modified one wins; equal timestamps fall back to
    /// the lexicographically smallest path.
    pub fn locate(&self, config: &BuildConfig) -> Result<ExecutableLocation> {
        let dir = config.build_dir();
        let name = config.target_name();
        let file_name = executable_file_name(&name);

        let best = WalkDir::new(&dir)
            .into_iter()
            .filter_entry(|e| e.file_name() != "CMakeFiles")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name() == file_name.as_str())
            .filter(|e| is_executable(e.path()))
            .filter_map(|e| {
                let modified = e.metadata().ok()?.modified().ok()?;
                Some(ExecutableLocation {
                    path: e.into_path(),
                    modified,
                })
            })
            .max_by(|a, b| {
                a.modified
                    .cmp(&b.modified)
                    .then_with(|| b.path.cmp(&a.path))
            });

        match best {
            Some(found) => {
                tracing::debug!(path = %found.path.display(), "located executable");
                Ok(found)
            }
            None => Err(ActionError::ExecutableNotFound { name, dir }),
        }
    }

    /// Run the located executable with `args` appended verbatim.
    ///
    /// Output is streamed; the child's exit code is returned unchanged.
    pub fn run(&self, config: &BuildConfig, args: &[String]) -> Result<i32> {
        let exe = match self.locate(config) {
            Ok(exe) => exe,
            Err(ActionError::ExecutableNotFound { .. }) => {
                println!(
                    "{} Executable not found. Building {}...",
                    "!".yellow(),
                    config.build_type
                );
                BuildOperations::new(self.runner, self.toolchain).configure_and_build(config)?;
                self.locate(config)?
            }
            Err(e) => return Err(e),
        };

        if args.is_empty() {
            println!("{}", "Running without arguments".cyan());
        } else {
            println!("{} {:?}", "Running with arguments:".cyan(), args);
        }

        let label = config.build_type.to_string().to_uppercase();
        ui::separator(&format!("BEGIN RUN ({label})"), Color::Cyan);
        let inv = Invocation::new(exe.path.to_string_lossy())
            .args(args.iter().cloned())
            .current_dir(&config.working_dir)
            .stream(true);
        let result = self.runner.execute(&inv)?;

        let end = format!(
            "END RUN ({label}) - exit {} - {:.2}s",
            result.exit_code,
            result.duration.as_secs_f64()
        );
        let color = if result.success() { Color::Green } else { Color::Red };
        ui::separator(&end, color);
        Ok(result.exit_code)
    }
}
