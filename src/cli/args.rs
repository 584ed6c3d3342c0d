// src/cli/args.rs

use crate::constants::DEFAULT_CONFIG_FILENAME;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// devloop: resolves the variables in a `devloop.yaml` and renders the result.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug, Default, Clone)]
pub struct GlobalFlags {
    /// Path to the config file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Set a variable before resolution (e.g., "KEY=VALUE"). Wins over every
    /// other source. Can be repeated.
    #[arg(long = "var")]
    pub vars: Vec<String>,

    /// Activate a profile. Can be repeated; the last one is `devloop.profile`.
    #[arg(long = "profile")]
    pub profiles: Vec<String>,

    /// Kube context to report through `devloop.context`.
    #[arg(long)]
    pub kube_context: Option<String>,

    /// Namespace to report through `devloop.namespace`.
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,

    /// Timeout in seconds for variable commands and plugin calls.
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prints the config with all variables substituted.
    Print,
    /// Resolves and lists every variable the config uses.
    Vars,
}
