use std::fs;
use std::path::Path;
use std::time::Instant;

use colored::*;

use super::feedback::FeedbackAnalyzer;
use super::report::{BatchKind, BatchReport, TypeOutcome};
use crate::build_type::{BUILD_ROOT, BuildType};
use crate::config::BuildConfig;
use crate::error::{ActionError, Result, Step};
use crate::runner::{CommandResult, CommandRunner, Invocation};
use crate::toolchain::Toolchain;
use crate::ui;

/// Configure, build and install steps for one project checkout.
pub struct BuildOperations<'a> {
    runner: &'a dyn CommandRunner,
    toolchain: &'a Toolchain,
}

impl<'a> BuildOperations<'a> {
    pub fn new(runner: &'a dyn CommandRunner, toolchain: &'a Toolchain) -> Self {
        Self { runner, toolchain }
    }

    pub fn configure_invocation(&self, config: &BuildConfig) -> Invocation {
        Invocation::new(&self.toolchain.cmake)
            .args(["-G", self.toolchain.generator.cmake_name()])
            .arg("-S")
            .arg(config.working_dir.to_string_lossy())
            .arg("-B")
            .arg(config.build_dir().to_string_lossy())
            .arg(format!(
                "-DCMAKE_BUILD_TYPE={}",
                config.build_type.cmake_name()
            ))
            .args(config.flags.iter().cloned())
            .current_dir(&config.working_dir)
            .stream(true)
    }

    pub fn build_invocation(&self, config: &BuildConfig) -> Invocation {
        Invocation::new(&self.toolchain.cmake)
            .arg("--build")
            .arg(config.build_dir().to_string_lossy())
            .args(["--config", config.build_type.cmake_name()])
            .arg("-j")
            .arg(config.jobs.to_string())
            .current_dir(&config.working_dir)
            .stream(true)
    }

    pub fn install_invocation(&self, config: &BuildConfig) -> Invocation {
        let mut inv = Invocation::new(&self.toolchain.cmake)
            .arg("--install")
            .arg(config.build_dir().to_string_lossy())
            .args(["--config", config.build_type.cmake_name()]);
        if let Some(prefix) = config.resolved_install_prefix() {
            inv = inv.arg("--prefix").arg(prefix.to_string_lossy());
        }
        inv.current_dir(&config.working_dir).stream(true)
    }

    /// Generate the build directory for `config.build_type`.
    pub fn configure(&self, config: &BuildConfig) -> Result<CommandResult> {
        let inv = self.configure_invocation(config);
        self.run_step(Step::Configure, config.build_type, &inv)
    }

    /// Compile an already-configured build directory.
    pub fn build(&self, config: &BuildConfig) -> Result<CommandResult> {
        let inv = self.build_invocation(config);
        self.run_step(Step::Build, config.build_type, &inv)
    }

    /// Configure then build; what `actionman build <type>` does.
    pub fn configure_and_build(&self, config: &BuildConfig) -> Result<()> {
        self.configure(config)?;
        self.build(config)?;
        Ok(())
    }

    /// Build the variant first when its build directory is missing.
    pub fn ensure_built(&self, config: &BuildConfig) -> Result<()> {
        if config.build_dir().exists() {
            return Ok(());
        }
        println!(
            "{} Build directory not found. Building {}...",
            "!".yellow(),
            config.build_type
        );
        self.configure_and_build(config)
    }

    pub fn install(&self, config: &BuildConfig) -> Result<CommandResult> {
        self.ensure_built(config)?;
        let inv = self.install_invocation(config);
        self.run_step(Step::Install, config.build_type, &inv)
    }

    /// Configure and build every requested variant in order.
    ///
    /// A failing variant is recorded and the remaining ones still run.
    pub fn build_all(&self, config: &BuildConfig, types: &[BuildType]) -> BatchReport {
        let mut report = BatchReport::new(BatchKind::Build);
        for &build_type in types {
            println!(
                "\n{} Building {} configuration...",
                "🔨".cyan(),
                build_type.to_string().bold()
            );
            let start = Instant::now();
            let outcome = match self.configure_and_build(&config.for_type(build_type)) {
                Ok(()) => TypeOutcome::pass(build_type, start.elapsed()),
                Err(e) => {
                    tracing::warn!(%build_type, error = %e, "variant failed, continuing batch");
                    TypeOutcome::fail(build_type, start.elapsed(), &e)
                }
            };
            report.record(outcome);
        }
        report
    }

    fn run_step(
        &self,
        step: Step,
        build_type: BuildType,
        inv: &Invocation,
    ) -> Result<CommandResult> {
        let label = format!(
            "{} ({})",
            step.to_string().to_uppercase(),
            build_type.to_string().to_uppercase()
        );
        ui::separator(&format!("BEGIN {label}"), Color::Cyan);
        println!("{} {}", "Running:".dimmed(), inv.display());

        let result = self.runner.execute(inv)?;
        if !result.success() {
            eprintln!(
                "{} {} failed with exit code {}",
                "x".red(),
                step,
                result.exit_code
            );
            if let Some(hint) = FeedbackAnalyzer::analyze(&result.combined_output()) {
                eprintln!("\n{} {}", "💡".yellow(), hint);
            }
            return Err(ActionError::BuildFailure {
                step,
                build_type,
                code: result.exit_code,
            });
        }

        ui::separator(
            &format!("END {label} - {:.2}s", result.duration.as_secs_f64()),
            Color::Green,
        );
        Ok(result)
    }
}

/// Remove `<working_dir>/build`. Returns whether anything was removed.
pub fn clean(working_dir: &Path) -> Result<bool> {
    let build_root = working_dir.join(BUILD_ROOT);
    if !build_root.exists() {
        println!(
            "{} Directory {} does not exist. Nothing to clean.",
            "!".yellow(),
            build_root.display()
        );
        return Ok(false);
    }

    println!("{} Cleaning {}...", "🗑️".red(), build_root.display());
    fs::remove_dir_all(&build_root)?;
    println!("{} Clean complete.", "✓".green());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{RecordingRunner, Reply};
    use crate::toolchain::Generator;
    use std::path::PathBuf;

    fn toolchain() -> Toolchain {
        Toolchain::new("cmake", "ctest", Generator::Ninja)
    }

    fn config(build_type: BuildType) -> BuildConfig {
        BuildConfig::new("/work/app", build_type).with_jobs(Some(8))
    }

    #[test]
    fn test_configure_args() {
        let tc = toolchain();
        let runner = RecordingRunner::new();
        let ops = BuildOperations::new(&runner, &tc);
        let inv = ops.configure_invocation(
            &config(BuildType::Profile).with_flags(vec!["-DFOO=ON".into()]),
        );
        assert_eq!(
            inv.argv,
            vec![
                "cmake",
                "-G",
                "Ninja",
                "-S",
                "/work/app",
                "-B",
                "/work/app/build/profile",
                "-DCMAKE_BUILD_TYPE=RelWithDebInfo",
                "-DFOO=ON",
            ]
        );
        assert_eq!(inv.cwd, Some(PathBuf::from("/work/app")));
        assert!(inv.stream);
    }

    #[test]
    fn test_build_args_use_jobs() {
        let tc = toolchain();
        let runner = RecordingRunner::new();
        let ops = BuildOperations::new(&runner, &tc);
        let inv = ops.build_invocation(&config(BuildType::Release));
        assert_eq!(
            inv.argv,
            vec![
                "cmake",
                "--build",
                "/work/app/build/release",
                "--config",
                "Release",
                "-j",
                "8"
            ]
        );
    }

    #[test]
    fn test_install_args_with_relative_prefix() {
        let tc = toolchain();
        let runner = RecordingRunner::new();
        let ops = BuildOperations::new(&runner, &tc);
        let inv = ops.install_invocation(
            &config(BuildType::Debug).with_install_prefix(Some(PathBuf::from("dist"))),
        );
        assert_eq!(
            inv.argv,
            vec![
                "cmake",
                "--install",
                "/work/app/build/debug",
                "--config",
                "Debug",
                "--prefix",
                "/work/app/dist"
            ]
        );

        let default_prefix = ops.install_invocation(&config(BuildType::Debug));
        assert!(!default_prefix.argv.contains(&"--prefix".to_string()));
    }

    #[test]
    fn test_configure_failure_skips_build() {
        let tc = toolchain();
        let runner = RecordingRunner::new()
            .on(|inv| inv.argv.contains(&"-G".to_string()), Reply::exit(1));
        let ops = BuildOperations::new(&runner, &tc);

        let err = ops.configure_and_build(&config(BuildType::Debug)).unwrap_err();
        assert!(matches!(
            err,
            ActionError::BuildFailure {
                step: Step::Configure,
                code: 1,
                ..
            }
        ));
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_build_failure_propagates_code() {
        let tc = toolchain();
        let runner = RecordingRunner::new()
            .on(|inv| inv.argv.contains(&"--build".to_string()), Reply::exit(2));
        let ops = BuildOperations::new(&runner, &tc);
        let err = ops.configure_and_build(&config(BuildType::Release)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_launch_failure_is_not_build_failure() {
        let tc = toolchain();
        let runner = RecordingRunner::new().on(|_| true, Reply::LaunchFailure);
        let ops = BuildOperations::new(&runner, &tc);
        let err = ops.configure(&config(BuildType::Debug)).unwrap_err();
        assert!(matches!(err, ActionError::Launch { .. }));
    }

    #[test]
    fn test_build_all_continues_past_failure() {
        let tc = toolchain();
        let runner = RecordingRunner::new().on(
            |inv| inv.argv.iter().any(|a| a == "-DCMAKE_BUILD_TYPE=RelWithDebInfo"),
            Reply::exit(1),
        );
        let ops = BuildOperations::new(&runner, &tc);
        let report = ops.build_all(&config(BuildType::Debug), &BuildType::ALL);

        let passed: Vec<bool> = report.outcomes.iter().map(|o| o.passed).collect();
        assert_eq!(passed, vec![true, false, true]);
        assert!(!report.success());
        // debug: configure+build, profile: configure only, release: configure+build
        assert_eq!(runner.calls().len(), 5);
        assert_eq!(runner.calls_with("/work/app/build/release").len(), 2);
    }

    #[test]
    fn test_clean_removes_build_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!clean(dir.path()).unwrap());

        let nested = BuildType::Debug.build_dir(dir.path()).join("bin");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("app"), "binary").unwrap();
        fs::write(dir.path().join("CMakeLists.txt"), "project(App)").unwrap();

        assert!(clean(dir.path()).unwrap());
        assert!(!dir.path().join(BUILD_ROOT).exists());
        assert!(dir.path().join("CMakeLists.txt").exists());
    }
}
