//! CLI arguments for system-sentinel.
//!
//! This module defines the command-line interface structure using the clap library.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "system-sentinel",
    about = "Host-resident sentinel for CPU/memory/network spike and alert detection",
    version = "1.0.0",
    propagate_version = true
)]
pub struct Args {
    /// Config file (YAML)
    #[arg(short = 'c', long, default_value = "/etc/system-sentinel/config.yaml")]
    pub config: PathBuf,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}
