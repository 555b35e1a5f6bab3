//! # gs-core
//!
//! Shared types for gradestat: the error type, the results matrix and the
//! work-directory configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error type and `Result` alias.
pub mod error;
/// Results matrix and configuration types.
pub mod types;

pub use error::{Error, Result};
pub use types::{ResultsMatrix, SamplerConfig, SimSetup};

/// Crate version, shared by the CLI `version` output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
