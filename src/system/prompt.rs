// src/system/prompt.rs

use dialoguer::{Input, Password, Select, theme::ColorfulTheme};
use regex::Regex;
use std::io::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("User Interface Error: {0}")]
    Dialoguer(#[from] dialoguer::Error),
    #[error("Invalid validation pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Everything a caller can configure about one interactive question. This is
/// the whole contract the variable engine has with the prompt UI.
#[derive(Debug, Default, Clone)]
pub struct PromptOptions {
    pub question: String,
    pub default_value: Option<String>,
    pub options: Vec<String>,
    pub password: bool,
    pub validation_pattern: Option<String>,
    pub validation_message: Option<String>,
}

/// Asks the user a single question and returns the raw answer.
///
/// An options list renders a selection menu (defaulting to the declared
/// default if it is one of the options, else the first entry); `password`
/// masks input; otherwise a free-text input with an optional regex validator
/// is shown. A keyboard interrupt exits the process immediately with the
/// conventional 130 code, matching how the tool behaves when a child process
/// is interrupted.
pub fn ask(options: &PromptOptions) -> Result<String, PromptError> {
    let theme = ColorfulTheme::default();

    if !options.options.is_empty() {
        let default_idx = options
            .default_value
            .as_ref()
            .and_then(|d| options.options.iter().position(|o| o == d))
            .unwrap_or(0);
        let selection = Select::with_theme(&theme)
            .with_prompt(options.question.clone())
            .items(&options.options)
            .default(default_idx)
            .interact()
            .map_err(exit_on_interrupt)?;
        return Ok(options
            .options
            .get(selection)
            .cloned()
            .unwrap_or_default());
    }

    if options.password {
        let answer = Password::with_theme(&theme)
            .with_prompt(options.question.clone())
            .interact()
            .map_err(exit_on_interrupt)?;
        return Ok(answer);
    }

    let validator = options
        .validation_pattern
        .as_ref()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| PromptError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .transpose()?;
    let validation_message = options.validation_message.clone();

    let mut input = Input::<String>::with_theme(&theme)
        .with_prompt(options.question.clone())
        .allow_empty(true);
    if let Some(default_value) = &options.default_value {
        input = input.default(default_value.clone());
    }
    if let Some(regex) = validator {
        input = input.validate_with(move |answer: &String| -> Result<(), String> {
            if regex.is_match(answer) {
                Ok(())
            } else {
                Err(validation_message.clone().unwrap_or_else(|| {
                    format!("Answer must match the pattern '{}'", regex.as_str())
                }))
            }
        });
    }

    input.interact_text().map_err(exit_on_interrupt)
}

/// Prompt cancellation is an immediate process exit, not a recoverable error.
fn exit_on_interrupt(err: dialoguer::Error) -> PromptError {
    let dialoguer::Error::IO(io_err) = &err;
    if io_err.kind() == ErrorKind::Interrupted {
        std::process::exit(130);
    }
    PromptError::Dialoguer(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_is_rejected_before_prompting() {
        // An unparsable regex must fail fast instead of reaching the terminal.
        let pattern = "[unclosed".to_string();
        let result = Regex::new(&pattern);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_option_index_prefers_declared_default() {
        let options = vec!["dev".to_string(), "staging".to_string(), "prod".to_string()];
        let default_value = Some("staging".to_string());
        let idx = default_value
            .as_ref()
            .and_then(|d| options.iter().position(|o| o == d))
            .unwrap_or(0);
        assert_eq!(idx, 1);
    }
}
