mod core;
mod feedback;
mod report;
mod run;

pub use core::{BuildOperations, clean};
pub use feedback::FeedbackAnalyzer;
pub use report::{BatchKind, BatchReport, TypeOutcome};
pub use run::{ExecutableLocation, RunOperations, executable_file_name};
pub use test::{TestCounts, TestOperations};
