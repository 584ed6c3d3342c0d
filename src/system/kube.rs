// src/system/kube.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// The handful of kubeconfig fields the tool cares about. Everything else in
/// the file is ignored on purpose.
#[derive(Deserialize, Debug, Default)]
struct KubeConfigFile {
    #[serde(rename = "current-context", default)]
    current_context: Option<String>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
}

#[derive(Deserialize, Debug, Default)]
struct NamedContext {
    #[serde(default)]
    name: String,
    #[serde(default)]
    context: ContextSpec,
}

#[derive(Deserialize, Debug, Default)]
struct ContextSpec {
    #[serde(default)]
    namespace: Option<String>,
}

/// Resolves the active Kubernetes context and namespace, honoring the
/// `--kube-context` and `--namespace` flag overrides. A missing kubeconfig is
/// not an error: the context comes back empty and the namespace falls back to
/// `default`, the same way a cluster-less invocation behaves.
pub fn current_context_and_namespace(
    kube_context_flag: Option<&str>,
    namespace_flag: Option<&str>,
) -> Result<(String, String)> {
    match kubeconfig_path() {
        Some(path) if path.exists() => {
            from_file(&path, kube_context_flag, namespace_flag)
        }
        _ => Ok((
            kube_context_flag.unwrap_or_default().to_string(),
            namespace_flag.unwrap_or("default").to_string(),
        )),
    }
}

/// Same as [`current_context_and_namespace`], from an explicit kubeconfig.
pub fn from_file(
    path: &Path,
    kube_context_flag: Option<&str>,
    namespace_flag: Option<&str>,
) -> Result<(String, String)> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read kubeconfig at '{}'", path.display()))?;
    let config: KubeConfigFile = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse kubeconfig at '{}'", path.display()))?;

    let context = kube_context_flag
        .map(str::to_string)
        .or(config.current_context.clone())
        .unwrap_or_default();

    let namespace = namespace_flag
        .map(str::to_string)
        .or_else(|| {
            config
                .contexts
                .iter()
                .find(|c| c.name == context)
                .and_then(|c| c.context.namespace.clone())
        })
        .unwrap_or_else(|| "default".to_string());

    Ok((context, namespace))
}

/// `$KUBECONFIG` (first entry of the list) wins over `~/.kube/config`.
fn kubeconfig_path() -> Option<PathBuf> {
    if let Ok(env_path) = env::var("KUBECONFIG")
        && !env_path.is_empty()
    {
        let separator = if cfg!(target_os = "windows") { ';' } else { ':' };
        if let Some(first) = env_path.split(separator).find(|p| !p.is_empty()) {
            return Some(PathBuf::from(first));
        }
    }

    dirs::home_dir().map(|home| home.join(".kube").join("config"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: minikube
contexts:
  - name: minikube
    context:
      cluster: minikube
      namespace: tooling
  - name: prod
    context:
      cluster: prod
"#;

    fn write_kubeconfig() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KUBECONFIG.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_current_context_and_its_namespace() {
        let file = write_kubeconfig();
        let (context, namespace) = from_file(file.path(), None, None).unwrap();
        assert_eq!(context, "minikube");
        assert_eq!(namespace, "tooling");
    }

    #[test]
    fn test_context_flag_overrides_and_namespace_defaults() {
        let file = write_kubeconfig();
        let (context, namespace) = from_file(file.path(), Some("prod"), None).unwrap();
        assert_eq!(context, "prod");
        // The prod context declares no namespace.
        assert_eq!(namespace, "default");
    }

    #[test]
    fn test_namespace_flag_wins_over_kubeconfig() {
        let file = write_kubeconfig();
        let (_, namespace) = from_file(file.path(), None, Some("override")).unwrap();
        assert_eq!(namespace, "override");
    }
}
