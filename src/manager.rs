//! The command facade.
//!
//! [`BuildManager::dispatch`] is the single entry point: it resolves the
//! build-type token, turns the caller's [`Options`] into a [`BuildConfig`]
//! and hands it to exactly one operation. Nothing survives a dispatch
//! except what the toolchain wrote to disk.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::build::{
    BatchReport, BuildOperations, RunOperations, TestCounts, TestOperations, clean,
};
use crate::build_type::{self, BuildType};
use crate::config::{BuildConfig, resolve_working_dir};
use crate::error::{ActionError, Result};
use crate::runner::{CommandRunner, ProcessRunner};
use crate::system::{SystemOperations, SystemReport};
use crate::toolchain::Toolchain;

/// Token used when the caller names no build type.
pub const DEFAULT_BUILD_TYPE: &str = "debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Clean,
    Build,
    Run,
    Test,
    Install,
    Info,
    Help,
}

impl FromStr for Command {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "clean" => Ok(Command::Clean),
            "build" => Ok(Command::Build),
            "run" => Ok(Command::Run),
            "test" => Ok(Command::Test),
            "install" => Ok(Command::Install),
            "info" => Ok(Command::Info),
            "help" => Ok(Command::Help),
            _ => Err(ActionError::InvalidCommand(s.to_string())),
        }
    }
}

/// Caller-supplied options; each command reads the fields it needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// `debug`, `profile`, `release` or `all`
    pub build_type: Option<String>,
    /// Extra configure flags (`build`)
    pub flags: Vec<String>,
    /// Arguments for the executable (`run`)
    pub args: Vec<String>,
    /// ctest `-R` pattern (`test`)
    pub filter: Option<String>,
    pub prefix: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub target: Option<String>,
}

impl Options {
    /// `build -DFOO=ON`: a configure flag sitting in the build-type slot
    /// moves to the front of `flags` and the type falls back to the default.
    fn shift_leading_flag(mut self) -> Self {
        if let Some(flag) = self.build_type.take_if(|t| t.starts_with('-')) {
            self.flags.insert(0, flag);
        }
        self
    }
}

/// What a dispatch produced.
#[derive(Debug, Clone)]
pub enum Outcome {
    Cleaned(bool),
    Built(BuildType),
    Ran { build_type: BuildType, exit_code: i32 },
    Tested { build_type: BuildType, counts: TestCounts },
    Installed(BuildType),
    Batch(BatchReport),
    Info(SystemReport),
    Help,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Ran { exit_code, .. } => *exit_code,
            Outcome::Batch(report) => report.exit_code(),
            _ => 0,
        }
    }
}

pub struct BuildManager<R: CommandRunner = ProcessRunner> {
    working_dir: PathBuf,
    runner: R,
    toolchain: Toolchain,
}

impl BuildManager<ProcessRunner> {
    /// Manager driving real processes with the host toolchain.
    pub fn from_env(working_dir: &Path) -> Result<Self> {
        Self::new(working_dir, ProcessRunner, Toolchain::detect())
    }
}

impl<R: CommandRunner> BuildManager<R> {
    pub fn new(working_dir: &Path, runner: R, toolchain: Toolchain) -> Result<Self> {
        Ok(Self {
            working_dir: resolve_working_dir(working_dir)?,
            runner,
            toolchain,
        })
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn dispatch(&self, command: Command, options: Options) -> Result<Outcome> {
        let options = match command {
            Command::Build => options.shift_leading_flag(),
            _ => options,
        };
        tracing::debug!(?command, ?options, working_dir = %self.working_dir.display(), "dispatch");
        let token = options.build_type.as_deref().unwrap_or(DEFAULT_BUILD_TYPE);

        match command {
            Command::Help => Ok(Outcome::Help),
            Command::Info => Ok(Outcome::Info(
                SystemOperations::new(&self.runner, &self.toolchain).info(),
            )),
            Command::Clean => Ok(Outcome::Cleaned(clean(&self.working_dir)?)),
            Command::Build => {
                let types = build_type::resolve(token)?;
                let config = self.config(types[0], &options);
                let ops = BuildOperations::new(&self.runner, &self.toolchain);
                if types.len() > 1 {
                    return Ok(Outcome::Batch(ops.build_all(&config, &types)));
                }
                ops.configure_and_build(&config)?;
                Ok(Outcome::Built(config.build_type))
            }
            Command::Test => {
                let types = build_type::resolve(token)?;
                let config = self.config(types[0], &options);
                let ops = TestOperations::new(&self.runner, &self.toolchain);
                let filter = options.filter.as_deref();
                if types.len() > 1 {
                    return Ok(Outcome::Batch(ops.run_all(&config, &types, filter)));
                }
                let counts = ops.run(&config, filter)?;
                Ok(Outcome::Tested {
                    build_type: config.build_type,
                    counts,
                })
            }
            Command::Run => {
                let config = self.config(build_type::resolve_single(token)?, &options);
                let exit_code = RunOperations::new(&self.runner, &self.toolchain)
                    .run(&config, &options.args)?;
                Ok(Outcome::Ran {
                    build_type: config.build_type,
                    exit_code,
                })
            }
            Command::Install => {
                let config = self.config(build_type::resolve_single(token)?, &options);
                BuildOperations::new(&self.runner, &self.toolchain).install(&config)?;
                Ok(Outcome::Installed(config.build_type))
            }
        }
    }

    fn config(&self, build_type: BuildType, options: &Options) -> BuildConfig {
        BuildConfig::new(&self.working_dir, build_type)
            .with_flags(options.flags.clone())
            .with_jobs(options.jobs)
            .with_install_prefix(options.prefix.clone())
            .with_target(options.target.clone())
    }
}
