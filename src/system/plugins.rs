// src/system/plugins.rs

use crate::CancellationToken;
use crate::constants::{
    DEFAULT_COMMAND_TIMEOUT_SECS, DEVLOOP_DIR, PLUGIN_BINARY, PLUGIN_METADATA_FILENAME, PLUGINS_DIR,
};
use crate::models::PluginMetadata;
use crate::system::executor::{self, ExecutionError};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable carrying the current CLI arguments, JSON-encoded, to
/// a plugin subprocess.
pub const OS_ARGS_ENV: &str = "DEVLOOP_PLUGIN_OS_ARGS";
/// Environment variable carrying the active `--kube-context` flag value.
pub const KUBE_CONTEXT_FLAG_ENV: &str = "DEVLOOP_PLUGIN_KUBE_CONTEXT_FLAG";
/// Environment variable carrying the active `--namespace` flag value.
pub const NAMESPACE_FLAG_ENV: &str = "DEVLOOP_PLUGIN_NAMESPACE_FLAG";

/// Scans `~/.devloop/plugins/*/plugin.yaml` and returns the metadata of every
/// installed plugin. A home-less environment simply has no plugins.
pub fn discover_plugins() -> Result<Vec<PluginMetadata>> {
    let Some(home) = dirs::home_dir() else {
        return Ok(Vec::new());
    };

    let plugins_root = home.join(DEVLOOP_DIR).join(PLUGINS_DIR);
    if !plugins_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut plugins = Vec::new();
    let entries = std::fs::read_dir(&plugins_root)
        .with_context(|| format!("Failed to read plugins dir '{}'", plugins_root.display()))?;
    for entry in entries {
        let folder = entry?.path();
        let metadata_path = folder.join(PLUGIN_METADATA_FILENAME);
        if !metadata_path.is_file() {
            continue;
        }

        let raw = std::fs::read_to_string(&metadata_path)?;
        let mut metadata: PluginMetadata = serde_yaml::from_str(&raw).with_context(|| {
            format!("Failed to parse plugin metadata '{}'", metadata_path.display())
        })?;
        metadata.folder = folder;
        log::debug!(
            "Discovered plugin '{}' with {} variable(s)",
            metadata.name,
            metadata.vars.len()
        );
        plugins.push(metadata);
    }

    Ok(plugins)
}

/// Path of the executable a plugin ships.
pub fn plugin_binary_path(metadata: &PluginMetadata) -> PathBuf {
    metadata.folder.join(PLUGIN_BINARY)
}

/// Invokes a plugin executable with extra environment variables, writing its
/// stdout into `out`. Stderr is captured and appended on failure so the user
/// sees what the plugin complained about.
pub fn call_plugin_executable(
    path: &Path,
    base_args: &[String],
    extra_env: &HashMap<String, String>,
    out: &mut dyn Write,
) -> Result<(), ExecutionError> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let program = path.to_string_lossy().into_owned();
    let output = executor::run_argv_captured(
        &program,
        base_args,
        &cwd,
        extra_env,
        Some(Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS)),
        &CancellationToken::default(),
    )?;

    let _ = out.write_all(output.stdout.as_bytes());
    if !output.success {
        let _ = out.write_all(output.stderr.as_bytes());
        return Err(ExecutionError::SpawnFailed(
            program,
            std::io::Error::other(format!(
                "plugin exited with code {}",
                output.code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
            )),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_call_plugin_executable_captures_stdout() {
        let mut out = Vec::new();
        call_plugin_executable(
            Path::new("/bin/echo"),
            &["plugin-value".to_string()],
            &HashMap::new(),
            &mut out,
        )
        .unwrap();
        assert_eq!(String::from_utf8_lossy(&out).trim(), "plugin-value");
    }

    #[test]
    #[cfg(unix)]
    fn test_call_plugin_executable_fails_on_non_zero_exit() {
        let mut out = Vec::new();
        let result = call_plugin_executable(
            Path::new("/bin/false"),
            &[],
            &HashMap::new(),
            &mut out,
        );
        assert!(result.is_err());
    }
}
