use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::build_type::BuildType;
use crate::error::{ActionError, Result};

/// Per-call settings for one variant of one project.
///
/// Built fresh for every operation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub working_dir: PathBuf,
    pub build_type: BuildType,
    /// Extra flags appended to the configure step
    pub flags: Vec<String>,
    /// Job count for the build step
    pub jobs: usize,
    pub install_prefix: Option<PathBuf>,
    /// Executable name override for `run`
    pub target: Option<String>,
}

impl BuildConfig {
    pub fn new(working_dir: impl Into<PathBuf>, build_type: BuildType) -> Self {
        Self {
            working_dir: working_dir.into(),
            build_type,
            flags: Vec::new(),
            jobs: default_jobs(),
            install_prefix: None,
            target: None,
        }
    }

    pub fn with_flags(mut self, flags: Vec<String>) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        if let Some(jobs) = jobs.filter(|j| *j > 0) {
            self.jobs = jobs;
        }
        self
    }

    pub fn with_install_prefix(mut self, prefix: Option<PathBuf>) -> Self {
        self.install_prefix = prefix;
        self
    }

    pub fn with_target(mut self, target: Option<String>) -> Self {
        self.target = target;
        self
    }

    /// Same settings, different variant.
    pub fn for_type(&self, build_type: BuildType) -> Self {
        Self {
            build_type,
            ..self.clone()
        }
    }

    pub fn build_dir(&self) -> PathBuf {
        self.build_type.build_dir(&self.working_dir)
    }

    /// Install prefix made absolute against the working directory.
    pub fn resolved_install_prefix(&self) -> Option<PathBuf> {
        self.install_prefix.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                self.working_dir.join(p)
            }
        })
    }

    /// Base name of the executable `run` looks for.
    pub fn target_name(&self) -> String {
        self.target
            .clone()
            .unwrap_or_else(|| infer_target_name(&self.working_dir))
    }
}

/// Host logical core count, or 4 when it cannot be queried.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

/// Canonicalize a working directory, rejecting anything that is not a directory.
pub fn resolve_working_dir(dir: &Path) -> Result<PathBuf> {
    match fs::canonicalize(dir) {
        Ok(path) if path.is_dir() => Ok(path),
        _ => Err(ActionError::InvalidWorkingDir(dir.to_path_buf())),
    }
}

/// Infer the main executable name of the CMake project at `working_dir`.
///
/// Order: first literal `add_executable(<name>`, then `project(<name>`,
/// then the directory's own name.
pub fn infer_target_name(working_dir: &Path) -> String {
    let lists = fs::read_to_string(working_dir.join("CMakeLists.txt")).unwrap_or_default();
    let project = capture_first(project_re(), &lists);

    let executable = capture_first(add_executable_re(), &lists).and_then(|name| {
        if name == "${PROJECT_NAME}" || name == "${CMAKE_PROJECT_NAME}" {
            project.clone()
        } else if name.contains("${") {
            None
        } else {
            Some(name)
        }
    });

    executable.or(project).unwrap_or_else(|| {
        working_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "main".to_string())
    })
}

fn capture_first(re: &Regex, text: &str) -> Option<String> {
    text.lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .find_map(|line| re.captures(line))
        .map(|caps| caps[1].to_string())
}

fn project_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*project\s*\(\s*([A-Za-z0-9_.+\-]+)").expect("valid project regex")
    })
}

fn add_executable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*add_executable\s*\(\s*(\$\{[A-Za-z_]+\}|[A-Za-z0-9_.+\-]+)")
            .expect("valid add_executable regex")
    })
}
