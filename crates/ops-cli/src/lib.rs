//! # ops-cli
//!
//! `opsctl`, the operator command line for alert event triage.
//!
//! Provides commands for:
//! - Listing, counting, and inspecting alert events
//! - Claiming, releasing, and silencing events
//! - Feeding firing and resolution reports, as the ingestion pipeline does
//!
//! State lives in a JSON snapshot under `--state-dir`, so successive
//! invocations see each other's changes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod context;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format};
pub use context::AppContext;
pub use error::CliError;
pub use output::OutputFormat;
