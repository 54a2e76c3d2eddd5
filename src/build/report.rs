//! Batch summaries for multi-variant requests (`build all`, `test all`).

use std::time::Duration;

use colored::*;
use serde::Serialize;

use super::test::TestCounts;
use crate::build_type::BuildType;
use crate::error::ActionError;
use crate::ui::{self, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchKind {
    Build,
    Test,
}

impl BatchKind {
    fn title(self) -> &'static str {
        match self {
            BatchKind::Build => "BUILD SUMMARY",
            BatchKind::Test => "TEST SUMMARY",
        }
    }
}

/// Result of one variant within a batch.
#[derive(Debug, Clone, Serialize)]
pub struct TypeOutcome {
    pub build_type: BuildType,
    pub passed: bool,
    /// Exit code of the failing step, 0 on success
    pub exit_code: i32,
    pub elapsed: Duration,
    pub tests: Option<TestCounts>,
    pub error: Option<String>,
}

impl TypeOutcome {
    pub fn pass(build_type: BuildType, elapsed: Duration) -> Self {
        Self {
            build_type,
            passed: true,
            exit_code: 0,
            elapsed,
            tests: None,
            error: None,
        }
    }

    pub fn fail(build_type: BuildType, elapsed: Duration, error: &ActionError) -> Self {
        Self {
            build_type,
            passed: false,
            exit_code: error.exit_code(),
            elapsed,
            tests: None,
            error: Some(error.to_string()),
        }
    }

    pub fn with_tests(mut self, counts: Option<TestCounts>) -> Self {
        self.tests = counts;
        self
    }
}

/// Per-variant outcomes of a batch, in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub kind: BatchKind,
    pub outcomes: Vec<TypeOutcome>,
}

impl BatchReport {
    pub fn new(kind: BatchKind) -> Self {
        Self {
            kind,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: TypeOutcome) {
        self.outcomes.push(outcome);
    }

    /// AND of every variant's result.
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn outcome(&self, build_type: BuildType) -> Option<&TypeOutcome> {
        self.outcomes.iter().find(|o| o.build_type == build_type)
    }

    pub fn failed_types(&self) -> Vec<BuildType> {
        self.outcomes
            .iter()
            .filter(|o| !o.passed)
            .map(|o| o.build_type)
            .collect()
    }

    /// 0 when every variant passed, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.success() { 0 } else { 1 }
    }

    pub fn print_summary(&self) {
        println!();
        ui::separator(self.kind.title(), Color::White);

        let mut headers = vec!["Build", "Status", "Time"];
        if self.kind == BatchKind::Test {
            headers.extend(["Passed", "Failed", "Skipped"]);
        }
        let mut table = Table::new(&headers);

        for outcome in &self.outcomes {
            let status = if outcome.passed {
                "SUCCESS".green().to_string()
            } else {
                "FAILED".red().to_string()
            };
            let mut row = vec![
                outcome.build_type.to_string(),
                status,
                format!("{:.2}s", outcome.elapsed.as_secs_f64()),
            ];
            if self.kind == BatchKind::Test {
                let counts = outcome.tests.unwrap_or_default();
                row.extend([
                    counts.passed.to_string(),
                    counts.failed.to_string(),
                    counts.skipped.to_string(),
                ]);
            }
            table.add_row(row);
        }
        table.print();

        if self.success() {
            println!("{} All {} variants succeeded.", "✓".green(), self.outcomes.len());
        } else {
            let failed: Vec<String> = self.failed_types().iter().map(|t| t.to_string()).collect();
            eprintln!("{} Failed: {}", "x".red(), failed.join(", "));
        }
    }
}
