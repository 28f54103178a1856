//! CLI Adapter
//!
//! Command-line interface for the volume swarm.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{execute, CliApp, Command, GatherCmd, RunCmd, StatusCmd};
