// src/cli/handlers/vars.rs

use crate::CancellationToken;
use crate::cli::args::GlobalFlags;
use crate::cli::handlers::commons;
use crate::core::coerce;
use anyhow::Result;
use colored::*;
use std::collections::BTreeMap;

/// Handler for the `vars` command: resolves the config and lists every
/// variable that was resolved along the way, sorted by name.
pub fn handle(flags: &GlobalFlags, cancellation_token: CancellationToken) -> Result<()> {
    let loaded = commons::load_config(flags, cancellation_token)?;

    let sorted: BTreeMap<&String, String> = loaded
        .resolved_vars
        .iter()
        .map(|(name, value)| (name, coerce::scalar_to_string(value)))
        .collect();

    let width = sorted.keys().map(|name| name.len()).max().unwrap_or(0);
    println!("\n--- {} ---", "Resolved Variables".green());
    for (name, value) in sorted {
        println!("  {:<width$}  {}", name.blue(), value, width = width);
    }
    Ok(())
}
