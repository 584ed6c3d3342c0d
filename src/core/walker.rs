// src/core/walker.rs

use crate::core::vars::VarError;
use crate::models::VarValue;

/// Generic in-place traversal over a nested YAML structure. For every scalar
/// string satisfying `matches(key, value)` the `replace` closure is called and
/// its result spliced back into the tree, which may change the scalar's type
/// (a string becoming an integer, for instance).
pub fn walk<M, R>(tree: &mut VarValue, matches: &M, replace: &mut R) -> Result<(), VarError>
where
    M: Fn(&str, &str) -> bool,
    R: FnMut(&str) -> Result<VarValue, VarError>,
{
    visit(tree, "", matches, replace)
}

fn visit<M, R>(
    value: &mut VarValue,
    key: &str,
    matches: &M,
    replace: &mut R,
) -> Result<(), VarError>
where
    M: Fn(&str, &str) -> bool,
    R: FnMut(&str) -> Result<VarValue, VarError>,
{
    match value {
        VarValue::String(s) => {
            if matches(key, s) {
                let current = s.clone();
                *value = replace(&current)?;
            }
            Ok(())
        }
        VarValue::Mapping(map) => {
            for (map_key, map_value) in map.iter_mut() {
                let child_key = map_key.as_str().unwrap_or(key).to_string();
                visit(map_value, &child_key, matches, replace)?;
            }
            Ok(())
        }
        VarValue::Sequence(seq) => {
            for item in seq.iter_mut() {
                visit(item, key, matches, replace)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
