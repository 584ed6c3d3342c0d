// src/core/mod.rs

pub mod coerce;
pub mod config_loader;
pub mod template;
pub mod vars;
pub mod vars_cache;
pub mod walker;
