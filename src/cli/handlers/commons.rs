// src/cli/handlers/commons.rs

use crate::CancellationToken;
use crate::cli::args::GlobalFlags;
use crate::constants::DEFAULT_COMMAND_TIMEOUT_SECS;
use crate::core::config_loader::{self, LoadedConfig};
use crate::core::vars::{PredefinedRegistry, ResolverOptions};
use crate::system::plugins;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Shared load path for every subcommand: builds the predefined registry
/// (built-ins plus installed plugins) and runs the full resolution pass.
pub fn load_config(
    flags: &GlobalFlags,
    cancellation_token: CancellationToken,
) -> Result<LoadedConfig> {
    let mut registry = PredefinedRegistry::with_builtins();
    match plugins::discover_plugins() {
        Ok(installed) => registry.register_plugins(&installed),
        // A broken plugin folder must not block config loading.
        Err(e) => log::warn!("Skipping plugin discovery: {}", e),
    }

    let options = resolver_options(flags);
    config_loader::load_config(&registry, &options, &flags.vars, cancellation_token)
}

pub fn resolver_options(flags: &GlobalFlags) -> ResolverOptions {
    // `--config ~/project/devloop.yaml` should work from any shell.
    let expanded = shellexpand::tilde(&flags.config.to_string_lossy().into_owned()).into_owned();
    ResolverOptions {
        config_path: PathBuf::from(expanded),
        profiles: flags.profiles.clone(),
        kube_context: flags.kube_context.clone(),
        kube_namespace: flags.namespace.clone(),
        command_timeout: Some(Duration::from_secs(
            flags.timeout.unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
        )),
    }
}
