// src/core/vars/source.rs
//
// One function per variable source. The resolver dispatches here after the
// definition has been prepared (value folded into default, nested references
// substituted), so every function works on a self-contained definition.

use crate::CancellationToken;
use crate::core::coerce;
use crate::core::vars::VarError;
use crate::models::{VarValue, VariableDefinition, VariableSource};
use crate::system::executor::{self, ExecutionError};
use crate::system::prompt::{self, PromptOptions};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// `source: env`. Reads the environment variable named after the variable;
/// an unset or empty value falls back to the default.
pub fn env(name: &str, definition: &VariableDefinition) -> Result<VarValue, VarError> {
    match non_empty_env(name) {
        Some(value) => coerce::value_by_type(name, &value, definition.default.as_ref()),
        None => definition
            .default
            .clone()
            .ok_or_else(|| VarError::MissingRequiredVariable(name.to_string())),
    }
}

/// `source: none`. The default is the value, returned without coercion.
pub fn none(name: &str, definition: &VariableDefinition) -> Result<VarValue, VarError> {
    definition
        .default
        .clone()
        .ok_or_else(|| VarError::MissingDefaultValue(name.to_string()))
}

/// `source: command`, and any definition that configures `command` or
/// `commands`. Runs the selected command in the config directory and takes
/// its trimmed stdout as the value.
pub fn command(
    name: &str,
    definition: &VariableDefinition,
    config_dir: &Path,
    timeout: Option<Duration>,
    cancellation_token: &CancellationToken,
) -> Result<VarValue, VarError> {
    let (cmd, args) = select_command(name, definition)?;

    let env = HashMap::new();
    let result = match &args {
        Some(args) => {
            executor::run_argv_captured(&cmd, args, config_dir, &env, timeout, cancellation_token)
        }
        None => executor::run_shell_captured(&cmd, config_dir, &env, timeout, cancellation_token),
    };
    let output = match result {
        Ok(output) => output,
        // Cancellation and timeouts are not variable problems, they abort the
        // whole load and must stay identifiable for exit-code handling.
        Err(e @ (ExecutionError::Interrupted | ExecutionError::TimedOut { .. })) => {
            return Err(VarError::Execution(e));
        }
        Err(e) => {
            return Err(VarError::CommandExecutionFailed {
                name: name.to_string(),
                message: e.to_string(),
            });
        }
    };

    if !output.success {
        let mut message = match output.code {
            Some(code) => format!("command '{}' exited with code {}", cmd, code),
            None => format!("command '{}' was terminated by a signal", cmd),
        };
        if !output.stdout.trim().is_empty() {
            message.push_str(&format!("\n\nstdout:\n{}", output.stdout.trim_end()));
        }
        if !output.stderr.trim().is_empty() {
            message.push_str(&format!("\n\nstderr:\n{}", output.stderr.trim_end()));
        }
        return Err(VarError::CommandExecutionFailed {
            name: name.to_string(),
            message,
        });
    }

    let trimmed = output.stdout.trim();
    if trimmed.is_empty() {
        return Ok(definition.default.clone().unwrap_or(VarValue::Null));
    }
    Ok(coerce::convert_string_value(trimmed))
}

/// The interactive sources (`all`, `input`, and the implicit default).
/// Checks the cheaper channels first and only then asks the user.
pub fn input(
    name: &str,
    definition: &VariableDefinition,
    config_dir: &Path,
    persistent_cache: &mut HashMap<String, String>,
    timeout: Option<Duration>,
    cancellation_token: &CancellationToken,
) -> Result<VarValue, VarError> {
    if definition.is_command_backed() {
        return command(name, definition, config_dir, timeout, cancellation_token);
    }

    // `input` is the explicit opt-out from the environment lookup.
    if definition.source != VariableSource::Input
        && let Some(value) = non_empty_env(name)
    {
        return coerce::value_by_type(name, &value, definition.default.as_ref());
    }

    if !definition.no_cache
        && let Some(cached) = persistent_cache.get(name)
    {
        return coerce::value_by_type(name, cached, definition.default.as_ref());
    }

    let answer = prompt::ask(&prompt_options(name, definition))?;
    if !definition.no_cache {
        persistent_cache.insert(name.to_string(), answer.clone());
    }
    coerce::value_by_type(name, &answer, definition.default.as_ref())
}

/// A referenced variable with no definition at all: environment, then the
/// persistent cache, then a generic prompt.
pub fn undefined(
    name: &str,
    persistent_cache: &mut HashMap<String, String>,
) -> Result<VarValue, VarError> {
    if let Some(value) = non_empty_env(name) {
        return Ok(coerce::convert_string_value(&value));
    }
    if let Some(cached) = persistent_cache.get(name) {
        return Ok(coerce::convert_string_value(cached));
    }

    let answer = prompt::ask(&PromptOptions {
        question: generic_question(name),
        ..Default::default()
    })?;
    persistent_cache.insert(name.to_string(), answer.clone());
    Ok(coerce::convert_string_value(&answer))
}

fn prompt_options(name: &str, definition: &VariableDefinition) -> PromptOptions {
    let default_value = definition
        .default
        .as_ref()
        .map(coerce::scalar_to_string)
        .filter(|s| !s.is_empty())
        .or_else(|| definition.options.first().cloned());

    PromptOptions {
        question: definition
            .question
            .clone()
            .unwrap_or_else(|| generic_question(name)),
        default_value,
        options: definition.options.clone(),
        password: definition.password,
        validation_pattern: definition.validation_pattern.clone(),
        validation_message: definition.validation_message.clone(),
    }
}

fn generic_question(name: &str) -> String {
    format!("Please enter a value for {}", name)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn select_command(
    name: &str,
    definition: &VariableDefinition,
) -> Result<(String, Option<Vec<String>>), VarError> {
    if !definition.is_command_backed() {
        return Err(VarError::InvalidVariableSource(name.to_string()));
    }

    for entry in &definition.commands {
        if matches_current_os(&entry.operating_system) {
            return Ok((entry.command.clone(), entry.args.clone()));
        }
    }

    match definition.command.as_deref() {
        Some(cmd) if !cmd.is_empty() => Ok((cmd.to_string(), definition.args.clone())),
        _ => Err(VarError::NoMatchingCommand {
            name: name.to_string(),
            os: std::env::consts::OS,
        }),
    }
}

/// An empty `os` field matches everywhere; otherwise it is a comma-separated
/// list of `std::env::consts::OS` names.
fn matches_current_os(operating_system: &str) -> bool {
    if operating_system.is_empty() {
        return true;
    }
    operating_system
        .split(',')
        .any(|os| os.trim() == std::env::consts::OS)
}
