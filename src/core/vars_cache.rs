// src/core/vars_cache.rs
//
// Persistent storage for interactively entered variable values. One cache
// file per config file, keyed by a hash of the canonical config path, so two
// projects never share answers. Values are stored as the raw strings the user
// typed; coercion happens on the way out.

use crate::constants::{DEVLOOP_DIR, VARS_CACHE_FILENAME_PREFIX, VARS_CACHE_FILENAME_SUFFIX};
use anyhow::{Context, Result};
use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const HASH_TRUNCATE_LENGTH: usize = 8; // 8 bytes = 16 hex characters

/// The cache file path for a given config file, inside the per-project
/// `.devloop` state directory.
pub fn cache_path_for(config_path: &Path) -> PathBuf {
    let canonical = dunce::canonicalize(config_path).unwrap_or_else(|_| config_path.to_path_buf());
    let hash = blake3::hash(canonical.to_string_lossy().as_bytes());
    let digest = hex::encode(&hash.as_bytes()[..HASH_TRUNCATE_LENGTH]);

    let base = canonical
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    base.join(DEVLOOP_DIR).join(format!(
        "{}{}{}",
        VARS_CACHE_FILENAME_PREFIX, digest, VARS_CACHE_FILENAME_SUFFIX
    ))
}

/// Loads the cache for `config_path`. A missing file is an empty cache; a
/// corrupt file is discarded with a warning rather than failing the load.
pub fn load(config_path: &Path) -> HashMap<String, String> {
    let path = cache_path_for(config_path);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(_) => {
            debug!("No variables cache at '{}'", path.display());
            return HashMap::new();
        }
    };

    match bincode::serde::decode_from_slice::<HashMap<String, String>, _>(
        &bytes,
        bincode::config::standard(),
    ) {
        Ok((cache, _)) => cache,
        Err(e) => {
            warn!(
                "Discarding corrupt variables cache at '{}': {}",
                path.display(),
                e
            );
            HashMap::new()
        }
    }
}

/// Writes the cache back, creating the state directory if needed.
pub fn save(config_path: &Path, cache: &HashMap<String, String>) -> Result<()> {
    let path = cache_path_for(config_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create state directory '{}'", parent.display()))?;
    }

    let bytes = bincode::serde::encode_to_vec(cache, bincode::config::standard())
        .context("Failed to serialize the variables cache")?;
    fs::write(&path, bytes)
        .with_context(|| format!("Failed to write variables cache to '{}'", path.display()))?;
    debug!("Saved {} cached variable(s) to '{}'", cache.len(), path.display());
    Ok(())
}
