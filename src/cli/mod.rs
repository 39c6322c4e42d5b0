//! Command-line interface: argument parsing, configuration loading, the
//! build driver, and diagnostic reporting.

pub mod args;
pub mod config;
pub mod driver;
pub mod reporter;

pub use args::CliArgs;
pub use driver::{BuildSummary, run};
