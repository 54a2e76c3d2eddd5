//! # actionman CLI Entry Point
//!
//! Parses arguments with clap, resolves the working directory and
//! toolchain once, and routes the command through [`BuildManager`].

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;

use actionman::error::ActionError;
use actionman::manager::{BuildManager, Command, Options, Outcome};

/// Log filter variable; `warn` when unset.
const LOG_ENV: &str = "ACTIONMAN_LOG";

#[derive(Parser)]
#[command(name = "actionman")]
#[command(about = "Configure, build, run and test CMake projects", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
#[command(allow_external_subcommands = true)]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Project directory (defaults to the current directory)
    #[arg(long = "cd", short = 'C', short_alias = 'c', global = true, value_name = "DIR")]
    cd: Option<PathBuf>,

    /// Parallel build jobs (defaults to the number of CPUs)
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove the build directory
    Clean,
    /// Configure and build (debug, profile, release or all)
    ///
    /// Without a build type, leading configure flags build debug:
    /// `actionman build -DFOO=ON`.
    Build {
        #[arg(allow_hyphen_values = true)]
        build_type: Option<String>,
        /// Extra flags passed to the configure step
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        flags: Vec<String>,
    },
    /// Run the built executable, building it first if needed
    Run {
        build_type: Option<String>,
        /// Executable name (inferred from CMakeLists.txt when omitted)
        #[arg(long)]
        target: Option<String>,
        /// Arguments passed to the executable
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Run ctest (debug, profile, release or all)
    Test {
        build_type: Option<String>,
        /// Only run tests matching this regex (ctest -R)
        filter: Option<String>,
    },
    /// Install the build output
    Install {
        build_type: Option<String>,
        /// Install prefix, relative paths resolve against the project
        #[arg(long)]
        prefix: Option<PathBuf>,
    },
    /// Show system and toolchain information
    Info {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    #[command(external_subcommand)]
    External(Vec<String>),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            let action_err = err.downcast_ref::<ActionError>();
            eprintln!("{} {}", "x".red(), format!("{err:#}").red());
            if let Some(ActionError::InvalidCommand(_)) = action_err {
                eprintln!();
                let _ = Cli::command().print_help();
            }
            action_err.map(ActionError::exit_code).unwrap_or(1)
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(0);
    };

    let mut options = Options {
        jobs: cli.jobs,
        ..Options::default()
    };
    let mut json = false;
    let command = match command {
        Commands::Clean => Command::Clean,
        Commands::Build { build_type, flags } => {
            options.build_type = build_type;
            options.flags = flags;
            Command::Build
        }
        Commands::Run {
            build_type,
            target,
            args,
        } => {
            options.build_type = build_type;
            options.target = target;
            options.args = args;
            Command::Run
        }
        Commands::Test { build_type, filter } => {
            options.build_type = build_type;
            options.filter = filter;
            Command::Test
        }
        Commands::Install { build_type, prefix } => {
            options.build_type = build_type;
            options.prefix = prefix;
            Command::Install
        }
        Commands::Info { json: as_json } => {
            json = as_json;
            Command::Info
        }
        Commands::External(args) => {
            let name = args.first().map(String::as_str).unwrap_or_default();
            name.parse()?
        }
    };

    let working_dir = match cli.cd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let manager = BuildManager::from_env(&working_dir)?;
    tracing::debug!(working_dir = %manager.working_dir().display(), "resolved project");

    let outcome = manager.dispatch(command, options)?;
    match &outcome {
        Outcome::Info(report) if json => {
            let text =
                serde_json::to_string_pretty(report).context("Failed to serialize report")?;
            println!("{text}");
        }
        Outcome::Info(report) => report.print(),
        Outcome::Batch(report) => report.print_summary(),
        Outcome::Tested { counts, .. } => {
            println!(
                "{} {} passed, {} failed, {} skipped",
                "✓".green(),
                counts.passed,
                counts.failed,
                counts.skipped
            );
        }
        Outcome::Built(build_type) => {
            println!("{} Build {} complete.", "✓".green(), build_type);
        }
        Outcome::Installed(build_type) => {
            println!("{} Install {} complete.", "✓".green(), build_type);
        }
        Outcome::Help => Cli::command().print_help()?,
        Outcome::Cleaned(_) | Outcome::Ran { .. } => {}
    }
    Ok(outcome.exit_code())
}

