// src/system/git.rs

use crate::CancellationToken;
use crate::system::executor;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

// Git lookups are expected to be near-instant; anything longer means a hung
// credential helper or similar, and the config load must not wait for it.
const GIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Returns the branch currently checked out in `dir`.
pub fn branch(dir: &Path) -> Result<String> {
    git_output(dir, &["rev-parse", "--abbrev-ref", "HEAD"])
}

/// Returns the full commit hash of HEAD in `dir`.
pub fn commit_hash(dir: &Path) -> Result<String> {
    git_output(dir, &["rev-parse", "HEAD"])
}

fn git_output(dir: &Path, args: &[&str]) -> Result<String> {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    let output = executor::run_argv_captured(
        "git",
        &args,
        dir,
        &HashMap::new(),
        Some(GIT_TIMEOUT),
        &CancellationToken::default(),
    )?;

    if !output.success {
        return Err(anyhow!(
            "git {} failed in '{}': {}",
            args.join(" "),
            dir.display(),
            output.stderr.trim()
        ));
    }

    let value = output.stdout.trim().to_string();
    if value.is_empty() {
        return Err(anyhow!(
            "git {} returned no output in '{}'",
            args.join(" "),
            dir.display()
        ));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_fails_outside_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        let result = branch(dir.path());
        assert!(result.is_err());
    }
}
