// src/core/vars/predefined.rs

use crate::core::vars::{ResolverOptions, VarError};
use crate::models::{PluginMetadata, VarValue};
use crate::system::{git, kube, plugins};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Predefined variables that are resolved eagerly during every config load.
/// Errors here are logged at debug level and ignored, since the variables may
/// well be unused by the config at hand. The git lookups are deliberately
/// absent: they fail loudly only when actually referenced.
pub const ALWAYS_RESOLVE_PREDEFINED: &[&str] = &[
    "devloop.executable",
    "devloop.tmpdir",
    "devloop.version",
    "devloop.random",
    "devloop.profile",
    "devloop.profiles",
    "devloop.userHome",
    "devloop.timestamp",
    "devloop.context",
    "devloop.namespace",
];

type Provider = Arc<dyn Fn(&ResolverOptions) -> Result<VarValue, VarError> + Send + Sync>;

/// The process-wide table of always-available variables: built-ins computed
/// from runtime context plus names contributed by installed plugins. Built
/// explicitly at startup and passed by reference into every resolver, so
/// tests can construct isolated registries.
#[derive(Default)]
pub struct PredefinedRegistry {
    providers: HashMap<String, Provider>,
}

impl PredefinedRegistry {
    /// An empty registry. Useful in tests that must not touch git or the
    /// kubeconfig.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard registry: every built-in under the `devloop.` namespace
    /// plus the upper-cased legacy aliases.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register("devloop.version", |_options| {
            Ok(VarValue::String(env!("CARGO_PKG_VERSION").to_string()))
        });
        registry.register("devloop.random", |_options| {
            Ok(VarValue::String(random_string(6)))
        });
        registry.register("devloop.profile", |options| {
            Ok(VarValue::String(
                options.profiles.last().cloned().unwrap_or_default(),
            ))
        });
        registry.register("devloop.profiles", |options| {
            Ok(VarValue::String(options.profiles.join(" ")))
        });
        registry.register("devloop.userHome", |_options| {
            let home = dirs::home_dir().ok_or_else(|| VarError::PredefinedFailed {
                name: "devloop.userHome".to_string(),
                message: "could not determine the home directory".to_string(),
            })?;
            Ok(VarValue::String(home.to_string_lossy().into_owned()))
        });
        registry.register("devloop.timestamp", |_options| {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            Ok(VarValue::String(now.as_secs().to_string()))
        });
        registry.register("devloop.executable", |_options| {
            let exe = std::env::current_exe().map_err(|e| VarError::PredefinedFailed {
                name: "devloop.executable".to_string(),
                message: e.to_string(),
            })?;
            Ok(VarValue::String(exe.to_string_lossy().into_owned()))
        });
        registry.register("devloop.tmpdir", |_options| {
            Ok(VarValue::String(
                std::env::temp_dir().to_string_lossy().into_owned(),
            ))
        });
        registry.register("devloop.git.branch", |options| {
            git::branch(&config_dir(&options.config_path)).map(VarValue::String).map_err(|e| {
                VarError::PredefinedFailed {
                    name: "devloop.git.branch".to_string(),
                    message: format!("error retrieving the git branch: {}", e),
                }
            })
        });
        registry.register("devloop.git.commit", |options| {
            let hash = git::commit_hash(&config_dir(&options.config_path)).map_err(|e| {
                VarError::PredefinedFailed {
                    name: "devloop.git.commit".to_string(),
                    message: format!("no git repository found ({})", e),
                }
            })?;
            Ok(VarValue::String(
                hash.get(..8).unwrap_or(&hash).to_string(),
            ))
        });
        registry.register("devloop.context", |options| {
            let (context, _) = kube_lookup(options, "devloop.context")?;
            Ok(VarValue::String(context))
        });
        registry.register("devloop.namespace", |options| {
            let (_, namespace) = kube_lookup(options, "devloop.namespace")?;
            Ok(VarValue::String(namespace))
        });

        // Legacy upper-case names map onto the same providers.
        registry.alias("DEVLOOP_VERSION", "devloop.version");
        registry.alias("DEVLOOP_RANDOM", "devloop.random");
        registry.alias("DEVLOOP_PROFILE", "devloop.profile");
        registry.alias("DEVLOOP_PROFILES", "devloop.profiles");
        registry.alias("DEVLOOP_USER_HOME", "devloop.userHome");
        registry.alias("DEVLOOP_TIMESTAMP", "devloop.timestamp");
        registry.alias("DEVLOOP_EXECUTABLE", "devloop.executable");
        registry.alias("DEVLOOP_TMPDIR", "devloop.tmpdir");
        registry.alias("DEVLOOP_GIT_BRANCH", "devloop.git.branch");
        registry.alias("DEVLOOP_GIT_COMMIT", "devloop.git.commit");
        registry.alias("DEVLOOP_CONTEXT", "devloop.context");
        registry.alias("DEVLOOP_NAMESPACE", "devloop.namespace");
        // Migration path for cloud-era configs.
        registry.alias("DEVLOOP_SPACE", "devloop.namespace");

        registry
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Computes the value of a predefined variable, or `None` if the name is
    /// not registered.
    pub fn load(&self, name: &str, options: &ResolverOptions) -> Option<Result<VarValue, VarError>> {
        self.providers.get(name).map(|provider| provider(options))
    }

    pub fn register<F>(&mut self, name: &str, provider: F)
    where
        F: Fn(&ResolverOptions) -> Result<VarValue, VarError> + Send + Sync + 'static,
    {
        self.providers.insert(name.to_string(), Arc::new(provider));
    }

    fn alias(&mut self, alias: &str, target: &str) {
        if let Some(provider) = self.providers.get(target) {
            self.providers.insert(alias.to_string(), Arc::clone(provider));
        }
    }

    /// Registers every variable contributed by the given plugins. Each one
    /// shells out to the plugin's executable, passing the current CLI
    /// arguments (JSON-encoded) and the active kube flags in the environment,
    /// and takes the trimmed stdout as the value.
    pub fn register_plugins(&mut self, installed: &[PluginMetadata]) {
        for plugin in installed {
            let binary = plugins::plugin_binary_path(plugin);
            for variable in &plugin.vars {
                let plugin_name = plugin.name.clone();
                let var_name = variable.name.clone();
                let base_args = variable.base_args.clone();
                let binary = binary.clone();
                self.register(&variable.name, move |options| {
                    call_plugin_variable(&plugin_name, &var_name, &binary, &base_args, options)
                });
            }
        }
    }
}

fn call_plugin_variable(
    plugin_name: &str,
    var_name: &str,
    binary: &Path,
    base_args: &[String],
    options: &ResolverOptions,
) -> Result<VarValue, VarError> {
    let os_args: Vec<String> = std::env::args().collect();
    let encoded_args =
        serde_json::to_string(&os_args).map_err(|e| VarError::PluginVariableFailed {
            plugin: plugin_name.to_string(),
            name: var_name.to_string(),
            message: e.to_string(),
        })?;

    let mut env = HashMap::new();
    env.insert(plugins::OS_ARGS_ENV.to_string(), encoded_args);
    env.insert(
        plugins::KUBE_CONTEXT_FLAG_ENV.to_string(),
        options.kube_context.clone().unwrap_or_default(),
    );
    env.insert(
        plugins::NAMESPACE_FLAG_ENV.to_string(),
        options.kube_namespace.clone().unwrap_or_default(),
    );

    let mut buffer = Vec::new();
    plugins::call_plugin_executable(binary, base_args, &env, &mut buffer).map_err(|e| {
        VarError::PluginVariableFailed {
            plugin: plugin_name.to_string(),
            name: var_name.to_string(),
            message: format!("{} - {}", String::from_utf8_lossy(&buffer).trim(), e),
        }
    })?;

    Ok(VarValue::String(
        String::from_utf8_lossy(&buffer).trim().to_string(),
    ))
}

fn kube_lookup(options: &ResolverOptions, name: &str) -> Result<(String, String), VarError> {
    kube::current_context_and_namespace(
        options.kube_context.as_deref(),
        options.kube_namespace.as_deref(),
    )
    .map_err(|e| VarError::PredefinedFailed {
        name: name.to_string(),
        message: e.to_string(),
    })
}

fn config_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn random_string(length: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET.get(idx).copied().unwrap_or(b'a') as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ResolverOptions {
        ResolverOptions {
            profiles: vec!["base".to_string(), "staging".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_builtins_are_registered_with_legacy_aliases() {
        let registry = PredefinedRegistry::with_builtins();
        assert!(registry.contains("devloop.version"));
        assert!(registry.contains("DEVLOOP_VERSION"));
        assert!(registry.contains("DEVLOOP_SPACE"));
        assert!(!registry.contains("devloop.unknown"));
    }

    #[test]
    fn test_profile_is_the_last_profile() {
        let registry = PredefinedRegistry::with_builtins();
        let value = registry.load("devloop.profile", &options()).unwrap().unwrap();
        assert_eq!(value, VarValue::String("staging".to_string()));
        let joined = registry.load("devloop.profiles", &options()).unwrap().unwrap();
        assert_eq!(joined, VarValue::String("base staging".to_string()));
    }

    #[test]
    fn test_random_string_shape() {
        let value = random_string(6);
        assert_eq!(value.len(), 6);
        assert!(value.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_version_matches_crate_version() {
        let registry = PredefinedRegistry::with_builtins();
        let value = registry.load("devloop.version", &options()).unwrap().unwrap();
        assert_eq!(value, VarValue::String(env!("CARGO_PKG_VERSION").to_string()));
    }

    #[test]
    fn test_unregistered_name_returns_none() {
        let registry = PredefinedRegistry::new();
        assert!(registry.load("devloop.version", &options()).is_none());
    }
}
