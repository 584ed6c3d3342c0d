// src/models.rs

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;
use std::str::FromStr;

use crate::core::vars::VarError;

/// The type of every resolved variable value. Values are plain YAML scalars
/// (string, integer, boolean, null) so they can be spliced back into the
/// configuration tree without conversion.
pub type VarValue = serde_yaml::Value;

// --- `devloop.yaml` VARIABLE MODELS ---

/// Declares where a variable's value comes from.
///
/// `Default`, `All` and `Input` share the interactive-with-fallbacks strategy;
/// `Input` additionally skips the environment short-circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariableSource {
    /// The empty source string; behaves like `All`.
    #[default]
    Default,
    All,
    Input,
    Env,
    None,
    Command,
}

impl VariableSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "",
            Self::All => "all",
            Self::Input => "input",
            Self::Env => "env",
            Self::None => "none",
            Self::Command => "command",
        }
    }
}

impl FromStr for VariableSource {
    type Err = VarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Self::Default),
            "all" => Ok(Self::All),
            "input" => Ok(Self::Input),
            "env" => Ok(Self::Env),
            "none" => Ok(Self::None),
            "command" => Ok(Self::Command),
            other => Err(VarError::UnrecognizedSource(other.to_string())),
        }
    }
}

impl Serialize for VariableSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for VariableSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A per-OS command override inside a variable's `commands:` list.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct VariableCommand {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    /// Comma-separated list of `std::env::consts::OS` names this entry applies
    /// to. Empty matches every OS.
    #[serde(rename = "os", default)]
    pub operating_system: String,
}

/// One entry of the `vars:` section: a passive record describing how a single
/// variable is resolved. Definitions are never mutated during resolution; the
/// resolver works on a private prepared copy.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct VariableDefinition {
    pub name: String,
    #[serde(default)]
    pub source: VariableSource,

    /// Static shortcut: equivalent to `source: none` with `default: value`.
    #[serde(default)]
    pub value: Option<VarValue>,
    /// Fallback value; may itself contain `${...}` references to predefined
    /// variables.
    #[serde(default)]
    pub default: Option<VarValue>,

    // Interactive-prompt shaping.
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub password: bool,
    #[serde(default)]
    pub validation_pattern: Option<String>,
    #[serde(default)]
    pub validation_message: Option<String>,

    // Shell-out configuration.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub commands: Vec<VariableCommand>,

    /// Recompute (or re-prompt) every run; never write to the persistent cache.
    #[serde(default)]
    pub no_cache: bool,
    /// Force resolution during discovery even when unreferenced.
    #[serde(default)]
    pub always_resolve: Option<bool>,
}

impl VariableDefinition {
    /// True when the definition computes its value by shelling out, in which
    /// case the interactive strategy delegates to the command strategy.
    pub fn is_command_backed(&self) -> bool {
        self.command.as_deref().is_some_and(|c| !c.is_empty()) || !self.commands.is_empty()
    }
}

// --- PLUGIN MODELS ---

/// One variable name a plugin contributes, plus the arguments its executable
/// is invoked with to compute the value.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PluginVariable {
    pub name: String,
    #[serde(default)]
    pub base_args: Vec<String>,
}

/// Metadata of one installed plugin (`plugin.yaml` in its folder).
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct PluginMetadata {
    pub name: String,
    #[serde(skip)]
    pub folder: PathBuf,
    #[serde(default)]
    pub vars: Vec<PluginVariable>,
}
