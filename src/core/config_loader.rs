// src/core/config_loader.rs
//
// Ties the variable engine together: reads the YAML config, pulls out the
// `vars:` section, resolves everything the config references, and hands back
// a fully substituted tree. The `vars:` section itself never appears in the
// rendered output.

use crate::CancellationToken;
use crate::core::vars::{PredefinedRegistry, Resolver, ResolverOptions};
use crate::core::vars_cache;
use crate::models::{VarValue, VariableDefinition};
use anyhow::{Context, Result, bail};
use log::debug;
use std::collections::HashMap;
use std::fs;

/// The result of a config load: the substituted tree plus every variable that
/// was resolved along the way (flag seeds included).
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: VarValue,
    pub resolved_vars: HashMap<String, VarValue>,
}

pub fn load_config(
    registry: &PredefinedRegistry,
    options: &ResolverOptions,
    flags: &[String],
    cancellation_token: CancellationToken,
) -> Result<LoadedConfig> {
    let raw = fs::read_to_string(&options.config_path).with_context(|| {
        format!(
            "Failed to read config file '{}'",
            options.config_path.display()
        )
    })?;
    let mut config: VarValue = serde_yaml::from_str(&raw).with_context(|| {
        format!(
            "Failed to parse config file '{}'",
            options.config_path.display()
        )
    })?;

    let definitions = extract_vars(&mut config)?;
    debug!(
        "Loaded '{}' with {} declared variable(s)",
        options.config_path.display(),
        definitions.len()
    );

    let mut persistent_cache = vars_cache::load(&options.config_path);
    let mut resolver = Resolver::new(
        registry,
        &mut persistent_cache,
        options.clone(),
        flags,
        cancellation_token,
    )?;
    resolver.update_vars(definitions.clone());

    resolver.resolve_always_predefined();

    // Declared variables resolve in declaration order so that later defaults
    // can reference earlier values. Unreferenced ones are skipped unless
    // marked `alwaysResolve`.
    let used = resolver.find_variables(&config);
    for definition in &definitions {
        let name = definition.name.trim();
        if !used.contains(name) {
            debug!("Skipping unused variable '{}'", name);
            continue;
        }
        resolver.resolve(name, Some(definition))?;
    }

    resolver.fill_variables(&mut config)?;
    let resolved_vars = resolver.resolved_variables().clone();
    drop(resolver);

    vars_cache::save(&options.config_path, &persistent_cache)?;

    Ok(LoadedConfig {
        config,
        resolved_vars,
    })
}

/// Removes the `vars:` section from the tree and deserializes its entries.
fn extract_vars(config: &mut VarValue) -> Result<Vec<VariableDefinition>> {
    let VarValue::Mapping(map) = config else {
        bail!("The config root must be a YAML mapping");
    };
    let Some(section) = map.remove("vars") else {
        return Ok(Vec::new());
    };
    let VarValue::Sequence(entries) = section else {
        bail!("The 'vars' section must be a list of variable definitions");
    };

    let mut definitions = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let definition: VariableDefinition = serde_yaml::from_value(entry)
            .with_context(|| format!("Invalid variable definition at vars[{}]", index))?;
        if definition.name.trim().is_empty() {
            bail!("Variable definition at vars[{}] has no name", index);
        }
        definitions.push(definition);
    }
    Ok(definitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("devloop.yaml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn load(path: PathBuf, flags: &[String]) -> Result<LoadedConfig> {
        let registry = PredefinedRegistry::with_builtins();
        let options = ResolverOptions::new(path);
        load_config(&registry, &options, flags, CancellationToken::default())
    }

    #[test]
    fn test_load_substitutes_and_strips_the_vars_section() {
        // --- Setup ---
        let (_dir, path) = write_config(
            "vars:\n\
             - name: APP\n\
             \x20 value: shop\n\
             - name: IMAGE\n\
             \x20 source: none\n\
             \x20 default: ${APP}:${TAG}\n\
             deploy:\n\
             \x20 image: ${IMAGE}\n\
             \x20 replicas: \"${REPLICAS}\"\n",
        );
        let flags = vec!["TAG=1.0".to_string(), "REPLICAS=3".to_string()];

        // --- Execute ---
        let loaded = load(path, &flags).unwrap();

        // --- Assert ---
        let expected: VarValue =
            serde_yaml::from_str("deploy:\n  image: shop:1.0\n  replicas: 3\n").unwrap();
        assert_eq!(loaded.config, expected);
        assert_eq!(
            loaded.resolved_vars.get("IMAGE"),
            Some(&VarValue::String("shop:1.0".to_string()))
        );
    }

    #[test]
    fn test_unused_variables_are_not_resolved() {
        // An unused `command` variable must not run; a failing command proves
        // it was skipped.
        let (_dir, path) = write_config(
            "vars:\n\
             - name: UNUSED\n\
             \x20 source: command\n\
             \x20 command: exit 1\n\
             deploy:\n\
             \x20 image: static\n",
        );

        let loaded = load(path, &[]).unwrap();
        assert!(!loaded.resolved_vars.contains_key("UNUSED"));
    }

    #[cfg(unix)]
    #[test]
    fn test_always_resolve_forces_resolution() {
        let (_dir, path) = write_config(
            "vars:\n\
             - name: EAGER\n\
             \x20 source: command\n\
             \x20 command: echo eager-value\n\
             \x20 alwaysResolve: true\n\
             deploy:\n\
             \x20 image: static\n",
        );

        let loaded = load(path, &[]).unwrap();
        assert_eq!(
            loaded.resolved_vars.get("EAGER"),
            Some(&VarValue::String("eager-value".to_string()))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_command_definitions_pull_in_their_dependencies() {
        // PREFIX is referenced only from IMAGE's command string, so it must
        // still count as used and resolve before IMAGE does.
        let (_dir, path) = write_config(
            "vars:\n\
             - name: PREFIX\n\
             \x20 value: app\n\
             - name: IMAGE\n\
             \x20 source: command\n\
             \x20 command: echo ${PREFIX}-v1\n\
             deploy:\n\
             \x20 image: ${IMAGE}\n",
        );

        let loaded = load(path, &[]).unwrap();
        let expected: VarValue = serde_yaml::from_str("deploy:\n  image: app-v1\n").unwrap();
        assert_eq!(loaded.config, expected);
    }

    #[test]
    fn test_out_of_order_dependency_fails() {
        let (_dir, path) = write_config(
            "vars:\n\
             - name: IMAGE\n\
             \x20 source: none\n\
             \x20 default: ${REGISTRY}/app\n\
             - name: REGISTRY\n\
             \x20 value: ghcr.io/devloop\n\
             deploy:\n\
             \x20 image: ${IMAGE}\n",
        );

        let err = load(path, &[]).unwrap_err();
        assert!(err.to_string().contains("defined before"));
    }

    #[test]
    fn test_interactive_answers_persist_across_loads() {
        // --- Setup ---
        let (_dir, path) = write_config(
            "vars:\n\
             - name: SEEDED\n\
             \x20 source: none\n\
             \x20 default: x\n\
             deploy:\n\
             \x20 image: ${SEEDED}\n",
        );
        // Pre-populate the cache the way a previous interactive run would.
        let mut cache = HashMap::new();
        cache.insert("ANSWERED".to_string(), "from-cache".to_string());
        vars_cache::save(&path, &cache).unwrap();

        let updated = "vars:\n\
             - name: ANSWERED\n\
             deploy:\n\
             \x20 image: ${ANSWERED}\n";
        fs::write(&path, updated).unwrap();

        // --- Execute ---
        let loaded = load(path, &[]).unwrap();

        // --- Assert ---
        let expected: VarValue =
            serde_yaml::from_str("deploy:\n  image: from-cache\n").unwrap();
        assert_eq!(loaded.config, expected);
    }

    #[test]
    fn test_invalid_source_is_a_load_error() {
        let (_dir, path) = write_config(
            "vars:\n\
             - name: BAD\n\
             \x20 source: secret\n\
             deploy: {}\n",
        );

        let err = load(path, &[]).unwrap_err();
        assert!(format!("{:#}", err).contains("unrecognized variable source"));
    }
}
