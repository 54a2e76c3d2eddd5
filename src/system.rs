//! Host and toolchain introspection for `actionman info`.
//!
//! Every probe is best-effort: a missing tool becomes `None` in the report
//! and is shown as "not found", so [`SystemOperations::info`] cannot fail.

use colored::*;
use serde::Serialize;

use crate::config::default_jobs;
use crate::runner::{CommandResult, CommandRunner, Invocation};
use crate::toolchain::Toolchain;
use crate::ui::{self, Table};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolVersion {
    pub name: String,
    pub program: String,
    /// First line of `--version`, `None` when the tool is missing or broken
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemReport {
    pub os: String,
    pub os_version: String,
    pub architecture: String,
    pub cpu_cores: usize,
    pub generator: String,
    pub multi_config: bool,
    pub tools: Vec<ToolVersion>,
}

impl SystemReport {
    pub fn tool(&self, name: &str) -> Option<&ToolVersion> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn print(&self) {
        ui::separator("SYSTEM INFORMATION", Color::Cyan);
        println!("{}: {} {}", "OS".bold(), self.os, self.os_version);
        println!("{}: {}", "Architecture".bold(), self.architecture);
        println!("{}: {}", "CPU Cores".bold(), self.cpu_cores);
        if self.multi_config {
            println!("{}: {} (multi-config)", "Generator".bold(), self.generator);
        } else {
            println!("{}: {}", "Generator".bold(), self.generator);
        }

        println!("\n{}", "Build Tools:".bold());
        let mut table = Table::new(&["Status", "Tool", "Version"]);
        for tool in &self.tools {
            let (status, version) = match &tool.version {
                Some(v) => ("✓".green().to_string(), v.clone()),
                None => ("x".red().to_string(), "not found".dimmed().to_string()),
            };
            table.add_row(vec![status, tool.name.clone(), version]);
        }
        table.print();
    }
}

pub struct SystemOperations<'a> {
    runner: &'a dyn CommandRunner,
    toolchain: &'a Toolchain,
}

impl<'a> SystemOperations<'a> {
    pub fn new(runner: &'a dyn CommandRunner, toolchain: &'a Toolchain) -> Self {
        Self { runner, toolchain }
    }

    pub fn info(&self) -> SystemReport {
        let os = os_info::get();
        let tools = [
            ("CMake", self.toolchain.cmake.as_str()),
            ("CTest", self.toolchain.ctest.as_str()),
            ("Ninja", "ninja"),
        ]
        .into_iter()
        .map(|(name, program)| self.probe(name, program))
        .collect();

        SystemReport {
            os: os.os_type().to_string(),
            os_version: os.version().to_string(),
            architecture: os
                .architecture()
                .unwrap_or(std::env::consts::ARCH)
                .to_string(),
            cpu_cores: default_jobs(),
            generator: self.toolchain.generator.cmake_name().to_string(),
            multi_config: self.toolchain.generator.is_multi_config(),
            tools,
        }
    }

    fn probe(&self, name: &str, program: &str) -> ToolVersion {
        let inv = Invocation::new(program).arg("--version");
        let result = self.runner.execute(&inv).unwrap_or_else(|e| {
            tracing::debug!(program, error = %e, "version probe failed");
            CommandResult::not_launched()
        });

        let version = if result.success() {
            result
                .stdout
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string)
        } else {
            None
        };

        ToolVersion {
            name: name.to_string(),
            program: program.to_string(),
            version,
        }
    }
}
