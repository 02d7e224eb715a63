use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tessera: a plugin host with two-stage dependency validation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Base directory for plugin config and data
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Host settings file (.json, .yaml, .yml or .toml)
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Abort the load attempt on the first lifecycle failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Exclude a registered plugin from this run (repeatable)
    #[arg(long = "disable", value_name = "PLUGIN")]
    pub disabled: Vec<String>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// List the compiled-in plugins
    List,
    /// Validate dependencies and print the activation order without activating anything
    Plan,
    /// Activate plugins and print the lifecycle outcome (default)
    Start,
    /// Activate plugins and print the mounted routes
    Routes,
}
