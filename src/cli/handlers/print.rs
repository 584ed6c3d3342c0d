// src/cli/handlers/print.rs

use crate::CancellationToken;
use crate::cli::args::GlobalFlags;
use crate::cli::handlers::commons;
use anyhow::{Context, Result};

/// Handler for the `print` command: renders the fully substituted config as
/// YAML on stdout, without the `vars:` section.
pub fn handle(flags: &GlobalFlags, cancellation_token: CancellationToken) -> Result<()> {
    let loaded = commons::load_config(flags, cancellation_token)?;
    let rendered =
        serde_yaml::to_string(&loaded.config).context("Failed to render the resolved config")?;
    print!("{}", rendered);
    Ok(())
}
