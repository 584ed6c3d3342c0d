//! # System Interaction Layer
//!
//! Boundary between the core resolution logic and everything that touches the
//! outside world: subprocesses, git, the kubeconfig, installed plugins and the
//! interactive terminal.
//!
//! ## Modules
//!
//! - **`executor`**: spawns external processes with captured output, a
//!   deadline and graceful cancellation.
//! - **`git`**: branch/commit lookups relative to the config directory.
//! - **`kube`**: current Kubernetes context and namespace discovery, honoring
//!   CLI flag overrides.
//! - **`plugins`**: plugin discovery and subprocess invocation.
//! - **`prompt`**: the interactive question/answer contract over `dialoguer`.

pub mod executor;
pub mod git;
pub mod kube;
pub mod plugins;
pub mod prompt;
