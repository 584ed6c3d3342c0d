// src/core/vars/mod.rs
//
// The variable resolution engine. A `Resolver` is built once per config load,
// seeded with `--var` flags, and then asked to fill every `${...}` reference
// in the config tree. Within one resolver every variable resolves at most
// once; the memory cache is the single source of truth for the session.

pub mod error;
pub mod legacy;
pub mod predefined;
pub mod source;

pub use error::VarError;
pub use predefined::{ALWAYS_RESOLVE_PREDEFINED, PredefinedRegistry};

use crate::CancellationToken;
use crate::constants::DEFAULT_COMMAND_TIMEOUT_SECS;
use crate::core::{coerce, template, walker};
use crate::models::{VarValue, VariableDefinition, VariableSource};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime context the resolver and the predefined providers draw from.
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    pub config_path: PathBuf,
    pub profiles: Vec<String>,
    pub kube_context: Option<String>,
    pub kube_namespace: Option<String>,
    pub command_timeout: Option<Duration>,
}

impl ResolverOptions {
    pub fn new(config_path: PathBuf) -> Self {
        Self {
            config_path,
            command_timeout: Some(Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS)),
            ..Default::default()
        }
    }
}

pub struct Resolver<'a> {
    vars: HashMap<String, VariableDefinition>,
    memory_cache: HashMap<String, VarValue>,
    persistent_cache: &'a mut HashMap<String, String>,
    registry: &'a PredefinedRegistry,
    options: ResolverOptions,
    cancellation_token: CancellationToken,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver and seeds the memory cache from `--var key=value`
    /// flags. Flag values win over every other source because a seeded entry
    /// is a cache hit before any source is consulted.
    pub fn new(
        registry: &'a PredefinedRegistry,
        persistent_cache: &'a mut HashMap<String, String>,
        options: ResolverOptions,
        flags: &[String],
        cancellation_token: CancellationToken,
    ) -> Result<Self, VarError> {
        let mut resolver = Self {
            vars: HashMap::new(),
            memory_cache: HashMap::new(),
            persistent_cache,
            registry,
            options,
            cancellation_token,
        };
        resolver.convert_flags(flags)?;
        Ok(resolver)
    }

    /// Seeds the memory cache from `key=value` flag strings. Splits on the
    /// first `=`, trims both sides, and coerces the value.
    pub fn convert_flags(&mut self, flags: &[String]) -> Result<(), VarError> {
        for flag in flags {
            let Some((name, value)) = flag.split_once('=') else {
                return Err(VarError::InvalidFlagFormat(flag.clone()));
            };
            self.memory_cache.insert(
                name.trim().to_string(),
                coerce::convert_string_value(value.trim()),
            );
        }
        Ok(())
    }

    /// Replaces the set of declared variable definitions. Names are trimmed,
    /// matching how references are trimmed inside `${ ... }` tokens.
    pub fn update_vars(&mut self, definitions: Vec<VariableDefinition>) {
        self.vars = definitions
            .into_iter()
            .map(|definition| (definition.name.trim().to_string(), definition))
            .collect();
    }

    /// Everything resolved so far, flag seeds included.
    pub fn resolved_variables(&self) -> &HashMap<String, VarValue> {
        &self.memory_cache
    }

    /// Resolves one variable. Order of consultation: memory cache, the legacy
    /// space-domain passthrough, the predefined registry, then the definition
    /// (or the undefined-variable flow when there is none). The result is
    /// memoized, so side effects like prompts and commands happen at most
    /// once per session.
    pub fn resolve(
        &mut self,
        name: &str,
        definition: Option<&VariableDefinition>,
    ) -> Result<VarValue, VarError> {
        let name = name.trim();
        if let Some(cached) = self.memory_cache.get(name) {
            return Ok(cached.clone());
        }

        if legacy::is_space_domain(name) {
            let value = legacy::passthrough(name, self.persistent_cache);
            self.memory_cache.insert(name.to_string(), value.clone());
            return Ok(value);
        }

        if let Some(result) = self.registry.load(name, &self.options) {
            let value = result?;
            self.memory_cache.insert(name.to_string(), value.clone());
            return Ok(value);
        }

        let value = match definition {
            None => source::undefined(name, self.persistent_cache)?,
            Some(definition) => {
                let prepared = self.prepare_definition(name, definition)?;
                let config_dir = self.config_dir();
                match prepared.source {
                    VariableSource::Env => source::env(name, &prepared)?,
                    VariableSource::None => source::none(name, &prepared)?,
                    VariableSource::Command => source::command(
                        name,
                        &prepared,
                        &config_dir,
                        self.options.command_timeout,
                        &self.cancellation_token,
                    )?,
                    VariableSource::Default | VariableSource::All | VariableSource::Input => {
                        source::input(
                            name,
                            &prepared,
                            &config_dir,
                            self.persistent_cache,
                            self.options.command_timeout,
                            &self.cancellation_token,
                        )?
                    }
                }
            }
        };

        self.memory_cache.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Eagerly resolves the predefined variables that are cheap and commonly
    /// referenced. Failures are expected here (no kubeconfig, no git repo)
    /// and only logged.
    pub fn resolve_always_predefined(&mut self) {
        for name in ALWAYS_RESOLVE_PREDEFINED {
            if let Err(e) = self.resolve(name, None) {
                log::debug!("error resolving predefined variable '{}': {}", name, e);
            }
        }
    }

    /// Collects every variable name referenced anywhere in `haystack`, plus
    /// names referenced from declared defaults and command definitions, and
    /// variables marked `alwaysResolve`. The set is not filtered against
    /// declarations: undeclared references resolve through the
    /// undefined-variable flow.
    pub fn find_variables(&self, haystack: &VarValue) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        collect_names(haystack, &mut found);
        for definition in self.vars.values() {
            if let Some(VarValue::String(default)) = &definition.default {
                template::find_variable_names(default, &mut found);
            }
            // A reference inside `command`/`args` marks its target as used,
            // otherwise the target would be skipped and the substitution in
            // `prepare_definition` could never see it resolved.
            if let Some(command) = &definition.command {
                template::find_variable_names(command, &mut found);
            }
            if let Some(args) = &definition.args {
                for arg in args {
                    template::find_variable_names(arg, &mut found);
                }
            }
            for entry in &definition.commands {
                template::find_variable_names(&entry.command, &mut found);
                if let Some(args) = &entry.args {
                    for arg in args {
                        template::find_variable_names(arg, &mut found);
                    }
                }
            }
            if definition.always_resolve == Some(true) {
                found.insert(definition.name.trim().to_string());
            }
        }
        found
    }

    /// Resolves every `${...}` reference in the tree in place. A string that
    /// is exactly one reference is spliced as the raw value, so `"${PORT}"`
    /// can become a YAML integer.
    pub fn fill_variables(&mut self, haystack: &mut VarValue) -> Result<(), VarError> {
        walker::walk(
            haystack,
            &|_key, value| template::matches_variable(value),
            &mut |value| self.replace_string(value),
        )
    }

    /// Resolves all references in a single string.
    pub fn replace_string(&mut self, input: &str) -> Result<VarValue, VarError> {
        template::parse_string(input, |name| {
            let definition = self.vars.get(name.trim()).cloned();
            self.resolve(name, definition.as_ref())
        })
    }

    /// Normalizes a definition before dispatch: folds `value` into `default`
    /// with source `none`, and substitutes references inside `default`,
    /// `command`, `args` and `commands` from already-resolved variables. The
    /// caller's definition is never mutated.
    fn prepare_definition(
        &self,
        name: &str,
        definition: &VariableDefinition,
    ) -> Result<VariableDefinition, VarError> {
        let mut prepared = definition.clone();

        if let Some(value) = prepared.value.take() {
            if prepared.default.is_some() {
                return Err(VarError::ValueAndDefault(name.to_string()));
            }
            prepared.default = Some(value);
            prepared.source = VariableSource::None;
        }

        if let Some(VarValue::String(default)) = &prepared.default {
            prepared.default = Some(self.resolve_definition_string(name, default)?);
        }
        if let Some(command) = &prepared.command {
            prepared.command = Some(self.resolve_definition_text(name, command)?);
        }
        if let Some(args) = &mut prepared.args {
            for arg in args.iter_mut() {
                *arg = self.resolve_definition_text(name, arg)?;
            }
        }
        for entry in &mut prepared.commands {
            entry.command = self.resolve_definition_text(name, &entry.command)?;
            if let Some(args) = &mut entry.args {
                for arg in args.iter_mut() {
                    *arg = self.resolve_definition_text(name, arg)?;
                }
            }
        }

        Ok(prepared)
    }

    /// References inside a definition may only point at variables resolved
    /// earlier in the session or at predefined variables; anything else is a
    /// declaration-ordering mistake.
    fn resolve_definition_string(&self, outer: &str, input: &str) -> Result<VarValue, VarError> {
        template::parse_string(input, |inner| {
            if let Some(cached) = self.memory_cache.get(inner) {
                return Ok(cached.clone());
            }
            if let Some(result) = self.registry.load(inner, &self.options) {
                return result;
            }
            Err(VarError::UnresolvedDependency {
                inner: inner.to_string(),
                outer: outer.to_string(),
            })
        })
    }

    fn resolve_definition_text(&self, outer: &str, input: &str) -> Result<String, VarError> {
        Ok(coerce::scalar_to_string(
            &self.resolve_definition_string(outer, input)?,
        ))
    }

    fn config_dir(&self) -> PathBuf {
        self.options
            .config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn collect_names(value: &VarValue, found: &mut BTreeSet<String>) {
    match value {
        VarValue::String(s) => template::find_variable_names(s, found),
        VarValue::Mapping(map) => {
            for (_, child) in map {
                collect_names(child, found);
            }
        }
        VarValue::Sequence(items) => {
            for child in items {
                collect_names(child, found);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_registry() -> PredefinedRegistry {
        PredefinedRegistry::new()
    }

    fn none_var(name: &str, default: &str) -> VariableDefinition {
        VariableDefinition {
            name: name.to_string(),
            source: VariableSource::None,
            default: Some(VarValue::String(default.to_string())),
            ..Default::default()
        }
    }

    #[test]
    fn test_flags_seed_the_memory_cache_and_win() {
        // --- Setup ---
        let registry = empty_registry();
        let mut cache = HashMap::new();
        let flags = vec!["IMAGE = app:1.0 ".to_string(), "PORT=8080".to_string()];
        let mut resolver = Resolver::new(
            &registry,
            &mut cache,
            ResolverOptions::default(),
            &flags,
            CancellationToken::default(),
        )
        .unwrap();

        // --- Execute ---
        // A declared default must lose against the flag seed.
        let definition = none_var("IMAGE", "something-else");
        let value = resolver.resolve("IMAGE", Some(&definition)).unwrap();
        let port = resolver.resolve("PORT", None).unwrap();

        // --- Assert ---
        assert_eq!(value, VarValue::String("app:1.0".to_string()));
        assert_eq!(port, VarValue::Number(8080.into()));
    }

    #[test]
    fn test_malformed_flag_is_rejected() {
        let registry = empty_registry();
        let mut cache = HashMap::new();
        let flags = vec!["NOEQUALS".to_string()];
        let err = Resolver::new(
            &registry,
            &mut cache,
            ResolverOptions::default(),
            &flags,
            CancellationToken::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, VarError::InvalidFlagFormat(_)));
    }

    #[test]
    fn test_resolution_is_memoized_per_session() {
        let registry = PredefinedRegistry::with_builtins();
        let mut cache = HashMap::new();
        let mut resolver = Resolver::new(
            &registry,
            &mut cache,
            ResolverOptions::default(),
            &[],
            CancellationToken::default(),
        )
        .unwrap();

        let first = resolver.resolve("devloop.random", None).unwrap();
        let second = resolver.resolve("devloop.random", None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_value_folds_into_default_without_consulting_sources() {
        let registry = empty_registry();
        let mut cache = HashMap::new();
        let mut resolver = Resolver::new(
            &registry,
            &mut cache,
            ResolverOptions::default(),
            &[],
            CancellationToken::default(),
        )
        .unwrap();

        let definition = VariableDefinition {
            name: "REPLICAS".to_string(),
            value: Some(VarValue::Number(3.into())),
            ..Default::default()
        };
        let value = resolver.resolve("REPLICAS", Some(&definition)).unwrap();
        assert_eq!(value, VarValue::Number(3.into()));
    }

    #[test]
    fn test_value_and_default_together_are_rejected() {
        let registry = empty_registry();
        let mut cache = HashMap::new();
        let mut resolver = Resolver::new(
            &registry,
            &mut cache,
            ResolverOptions::default(),
            &[],
            CancellationToken::default(),
        )
        .unwrap();

        let mut definition = none_var("BROKEN", "default");
        definition.value = Some(VarValue::String("value".to_string()));
        let err = resolver.resolve("BROKEN", Some(&definition)).unwrap_err();
        assert!(matches!(err, VarError::ValueAndDefault(_)));
    }

    #[test]
    fn test_defaults_substitute_previously_resolved_variables() {
        let registry = empty_registry();
        let mut cache = HashMap::new();
        let flags = vec!["REGISTRY=ghcr.io/devloop".to_string()];
        let mut resolver = Resolver::new(
            &registry,
            &mut cache,
            ResolverOptions::default(),
            &flags,
            CancellationToken::default(),
        )
        .unwrap();

        let definition = none_var("IMAGE", "${REGISTRY}/app");
        let value = resolver.resolve("IMAGE", Some(&definition)).unwrap();
        assert_eq!(value, VarValue::String("ghcr.io/devloop/app".to_string()));
    }

    #[test]
    fn test_defaults_substitute_predefined_variables() {
        let registry = PredefinedRegistry::with_builtins();
        let mut cache = HashMap::new();
        let mut resolver = Resolver::new(
            &registry,
            &mut cache,
            ResolverOptions::default(),
            &[],
            CancellationToken::default(),
        )
        .unwrap();

        let definition = none_var("TAG", "v${devloop.version}");
        let value = resolver.resolve("TAG", Some(&definition)).unwrap();
        assert_eq!(
            value,
            VarValue::String(format!("v{}", env!("CARGO_PKG_VERSION")))
        );
    }

    #[test]
    fn test_unresolved_dependency_names_both_variables() {
        let registry = empty_registry();
        let mut cache = HashMap::new();
        let mut resolver = Resolver::new(
            &registry,
            &mut cache,
            ResolverOptions::default(),
            &[],
            CancellationToken::default(),
        )
        .unwrap();

        let definition = none_var("IMAGE", "${NOT_YET}/app");
        let err = resolver.resolve("IMAGE", Some(&definition)).unwrap_err();
        match err {
            VarError::UnresolvedDependency { inner, outer } => {
                assert_eq!(inner, "NOT_YET");
                assert_eq!(outer, "IMAGE");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_resolve_trims_the_variable_name() {
        let registry = empty_registry();
        let mut cache = HashMap::new();
        let flags = vec!["TAG=latest".to_string()];
        let mut resolver = Resolver::new(
            &registry,
            &mut cache,
            ResolverOptions::default(),
            &flags,
            CancellationToken::default(),
        )
        .unwrap();

        let value = resolver.resolve("  TAG  ", None).unwrap();
        assert_eq!(value, VarValue::String("latest".to_string()));
    }

    #[test]
    fn test_legacy_space_domain_passthrough_is_memoized() {
        let registry = empty_registry();
        let mut cache = HashMap::new();
        let mut resolver = Resolver::new(
            &registry,
            &mut cache,
            ResolverOptions::default(),
            &[],
            CancellationToken::default(),
        )
        .unwrap();

        let value = resolver.resolve("DEVLOOP_SPACE_DOMAIN_URL", None).unwrap();
        assert_eq!(
            value,
            VarValue::String("${DEVLOOP_SPACE_DOMAIN_URL}".to_string())
        );
        assert!(
            resolver
                .resolved_variables()
                .contains_key("DEVLOOP_SPACE_DOMAIN_URL")
        );
    }

    #[test]
    fn test_find_variables_includes_defaults_and_always_resolve() {
        // --- Setup ---
        let registry = empty_registry();
        let mut cache = HashMap::new();
        let mut resolver = Resolver::new(
            &registry,
            &mut cache,
            ResolverOptions::default(),
            &[],
            CancellationToken::default(),
        )
        .unwrap();
        let mut always = none_var("SIDE_EFFECT", "unused");
        always.always_resolve = Some(true);
        resolver.update_vars(vec![none_var("IMAGE", "${MY_REG}/app"), always]);

        let tree: VarValue =
            serde_yaml::from_str("deploy:\n  image: ${MY_IMG}:${TAG}\n").unwrap();

        // --- Execute ---
        let found = resolver.find_variables(&tree);

        // --- Assert ---
        let expected: Vec<&str> = vec!["MY_IMG", "MY_REG", "SIDE_EFFECT", "TAG"];
        assert_eq!(found.iter().map(String::as_str).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_find_variables_scans_command_definitions() {
        // --- Setup ---
        let registry = empty_registry();
        let mut cache = HashMap::new();
        let mut resolver = Resolver::new(
            &registry,
            &mut cache,
            ResolverOptions::default(),
            &[],
            CancellationToken::default(),
        )
        .unwrap();
        let command_backed = VariableDefinition {
            name: "IMAGE".to_string(),
            source: VariableSource::Command,
            command: Some("echo ${PREFIX}".to_string()),
            args: Some(vec!["${ARG_REF}".to_string()]),
            commands: vec![crate::models::VariableCommand {
                command: "echo ${OS_REF}".to_string(),
                args: None,
                operating_system: "linux".to_string(),
            }],
            ..Default::default()
        };
        resolver.update_vars(vec![command_backed]);

        let tree: VarValue = serde_yaml::from_str("image: ${IMAGE}\n").unwrap();

        // --- Execute ---
        let found = resolver.find_variables(&tree);

        // --- Assert ---
        for name in ["IMAGE", "PREFIX", "ARG_REF", "OS_REF"] {
            assert!(found.contains(name), "missing '{}'", name);
        }
    }

    #[test]
    fn test_fill_variables_resolves_the_whole_tree() {
        // --- Setup ---
        let registry = empty_registry();
        let mut cache = HashMap::new();
        let flags = vec!["TAG=1.0".to_string(), "PORT=8080".to_string()];
        let mut resolver = Resolver::new(
            &registry,
            &mut cache,
            ResolverOptions::default(),
            &flags,
            CancellationToken::default(),
        )
        .unwrap();
        resolver.update_vars(vec![VariableDefinition {
            name: "APP".to_string(),
            value: Some(VarValue::String("shop".to_string())),
            ..Default::default()
        }]);

        let mut tree: VarValue = serde_yaml::from_str(
            "image: ${APP}:${TAG}\nport: \"${PORT}\"\nliteral: $!{TAG}\n",
        )
        .unwrap();

        // --- Execute ---
        resolver.fill_variables(&mut tree).unwrap();

        // --- Assert ---
        let expected: VarValue =
            serde_yaml::from_str("image: shop:1.0\nport: 8080\nliteral: ${TAG}\n").unwrap();
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_always_predefined_failures_are_ignored() {
        let registry = PredefinedRegistry::with_builtins();
        let mut cache = HashMap::new();
        let mut resolver = Resolver::new(
            &registry,
            &mut cache,
            ResolverOptions::default(),
            &[],
            CancellationToken::default(),
        )
        .unwrap();

        // Must not error or prompt, whatever the host looks like.
        resolver.resolve_always_predefined();
        assert!(resolver.resolved_variables().contains_key("devloop.version"));
    }
}
