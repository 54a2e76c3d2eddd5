//! # actionman - CMake build driver
//!
//! actionman wraps a CMake project behind a handful of verbs: configure and
//! build one or all build types, run the freshly built executable, run the
//! test suite through ctest, install, clean, and report the host toolchain.
//!
//! ## Quick Start
//!
//! ```bash
//! # Configure and build the debug variant
//! actionman build
//!
//! # Build every variant, then run the release executable
//! actionman build all
//! actionman run release -- --port 8080
//! ```
//!
//! ## Module Organization
//!
//! - [`manager`] - Command facade: one dispatch per invocation
//! - [`build`] - Configure/build/install, test and run operations
//! - [`runner`] - Child process execution with live output
//! - [`toolchain`] - CMake/ctest discovery and generator selection

/// Configure, build, install, test and run operations.
pub mod build;

/// Build variants and their directory layout.
pub mod build_type;

/// Per-invocation build configuration.
pub mod config;

/// Error type and exit-code mapping.
pub mod error;

/// Command facade.
pub mod manager;

/// Child process execution.
pub mod runner;

/// Host and toolchain introspection.
pub mod system;

/// CMake toolchain discovery.
pub mod toolchain;

/// Terminal UI utilities (banners, tables).
pub mod ui;

pub use build_type::BuildType;
pub use error::{ActionError, Result};
pub use manager::{BuildManager, Command, Options, Outcome};
