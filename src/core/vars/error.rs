// src/core/vars/error.rs

use thiserror::Error;

use crate::system::prompt::PromptError;

/// Every way a variable can fail to resolve. All of these are terminal for the
/// current resolution pass; nothing is retried.
#[derive(Error, Debug)]
pub enum VarError {
    #[error(
        "required variable '{0}' is not set in the environment and has no default, but is needed for loading the config"
    )]
    MissingRequiredVariable(String),

    #[error("variable '{0}' has source 'command', but neither 'command' nor 'commands' is configured")]
    InvalidVariableSource(String),

    #[error("variable '{name}': no entry in 'commands' matches the current operating system '{os}'")]
    NoMatchingCommand { name: String, os: &'static str },

    #[error("resolving variable '{name}': {message}")]
    CommandExecutionFailed { name: String, message: String },

    #[error("variable '{0}' has source 'none' but no default value")]
    MissingDefaultValue(String),

    #[error("unrecognized variable source '{0}', please choose one of 'all', 'input', 'env', 'none' or 'command'")]
    UnrecognizedSource(String),

    #[error(
        "variable '{inner}' was not resolved yet, but is referenced in the definition of variable '{outer}'. Please make sure '{inner}' is defined before '{outer}' in the vars section"
    )]
    UnresolvedDependency { inner: String, outer: String },

    #[error("plugin '{plugin}' failed to provide variable '{name}': {message}")]
    PluginVariableFailed {
        plugin: String,
        name: String,
        message: String,
    },

    #[error("wrong --var format: '{0}', expected 'key=value'")]
    InvalidFlagFormat(String),

    #[error("variable '{0}': 'value' and 'default' cannot be used together")]
    ValueAndDefault(String),

    #[error("variable '{name}': cannot parse '{value}' as {expected}")]
    TypeMismatch {
        name: String,
        value: String,
        expected: &'static str,
    },

    #[error("error resolving predefined variable '{name}': {message}")]
    PredefinedFailed { name: String, message: String },

    #[error("User Interface Error: {0}")]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Execution(#[from] crate::system::executor::ExecutionError),
}
