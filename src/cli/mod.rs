//! CLI module for forecast-mcp - command-line interface and subcommands.
//!
//! Runs the service by default; the other subcommands either drive a running
//! service over HTTP or run a search locally.

pub mod commands;

pub use commands::Cli;
