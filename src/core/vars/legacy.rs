// src/core/vars/legacy.rs
//
// Compatibility shim for the retired cloud offering. Variables carrying the
// old space-domain prefix are no longer provisioned by a backend, so they
// resolve from whatever the persistent cache still holds, and otherwise
// render back as an untouched placeholder so downstream tooling can spot
// them.

use crate::constants::LEGACY_SPACE_DOMAIN_PREFIX;
use crate::core::coerce;
use crate::models::VarValue;
use std::collections::HashMap;

pub fn is_space_domain(name: &str) -> bool {
    name.starts_with(LEGACY_SPACE_DOMAIN_PREFIX)
}

pub fn passthrough(name: &str, persistent_cache: &HashMap<String, String>) -> VarValue {
    match persistent_cache.get(name) {
        Some(cached) => coerce::convert_string_value(cached),
        None => VarValue::String(format!("${{{}}}", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uncached_space_domain_renders_as_placeholder() {
        let cache = HashMap::new();
        assert!(is_space_domain("DEVLOOP_SPACE_DOMAIN_URL"));
        assert_eq!(
            passthrough("DEVLOOP_SPACE_DOMAIN_URL", &cache),
            VarValue::String("${DEVLOOP_SPACE_DOMAIN_URL}".to_string())
        );
    }

    #[test]
    fn test_cached_space_domain_is_coerced() {
        let mut cache = HashMap::new();
        cache.insert("DEVLOOP_SPACE_DOMAIN_PORT".to_string(), "8080".to_string());
        assert_eq!(
            passthrough("DEVLOOP_SPACE_DOMAIN_PORT", &cache),
            VarValue::Number(8080.into())
        );
    }
}
