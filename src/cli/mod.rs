// src/cli/mod.rs

pub mod args;
pub mod handlers;

pub use args::{Cli, Commands, GlobalFlags};
