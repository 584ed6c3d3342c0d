// src/core/template.rs

use crate::core::coerce::scalar_to_string;
use crate::core::vars::VarError;
use crate::models::VarValue;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    // Fast check only: is there at least one `${...}` (or escaped `$!{...}`)
    // token in this string? The splitting logic lives in `parse_string`.
    static ref VAR_MATCH_RE: Regex = Regex::new(r"\$!?\{[^{}]+\}").unwrap();
    // Full token with the escape marker and the (trimmed) name captured.
    static ref VAR_TOKEN_RE: Regex = Regex::new(r"\$(!?)\{\s*([^{}]+?)\s*\}").unwrap();
}

/// True when the string contains at least one variable reference.
pub fn matches_variable(value: &str) -> bool {
    VAR_MATCH_RE.is_match(value)
}

/// Splits `input` into literal and `${name}` segments, calling `resolve` for
/// every unescaped reference.
///
/// A string that is exactly one unescaped reference yields the raw resolved
/// scalar (so `"${REPLICAS}"` can come back as an integer); any mix of
/// literal text and references concatenates the stringified segments.
/// `$!{name}` is an escape rendering the literal `${name}` untouched.
pub fn parse_string<F>(input: &str, mut resolve: F) -> Result<VarValue, VarError>
where
    F: FnMut(&str) -> Result<VarValue, VarError>,
{
    let first = match VAR_TOKEN_RE.captures(input) {
        Some(caps) => caps,
        None => return Ok(VarValue::String(input.to_string())),
    };

    let whole = first.get(0).map_or((0, 0), |m| (m.start(), m.end()));
    let escaped = first.get(1).is_some_and(|m| !m.as_str().is_empty());
    if whole.0 == 0 && whole.1 == input.len() && !escaped {
        let name = first.get(2).map_or("", |m| m.as_str());
        return resolve(name);
    }

    let mut out = String::new();
    let mut last = 0;
    for caps in VAR_TOKEN_RE.captures_iter(input) {
        let Some(token) = caps.get(0) else { continue };
        out.push_str(input.get(last..token.start()).unwrap_or_default());

        let escaped = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let name = caps.get(2).map_or("", |m| m.as_str());
        if escaped {
            out.push_str(&format!("${{{}}}", name));
        } else {
            out.push_str(&scalar_to_string(&resolve(name)?));
        }
        last = token.end();
    }
    out.push_str(input.get(last..).unwrap_or_default());

    Ok(VarValue::String(out))
}

/// Collects the names of every unescaped reference in `input`.
pub fn find_variable_names(input: &str, found: &mut BTreeSet<String>) {
    let _ = parse_string(input, |name| {
        found.insert(name.to_string());
        Ok(VarValue::String(String::new()))
    });
}
