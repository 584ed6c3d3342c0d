// src/constants.rs

/// The name of the directory containing devloop state for a project.
pub const DEVLOOP_DIR: &str = ".devloop";

/// The default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILENAME: &str = "devloop.yaml";

/// File name template for the persistent variables cache (inside .devloop/).
/// The `{}` part is a short hash of the absolute config path, so several
/// config files in one project do not share answers.
pub const VARS_CACHE_FILENAME_PREFIX: &str = "vars-";
pub const VARS_CACHE_FILENAME_SUFFIX: &str = ".cache.bin";

/// The name of the directory holding installed plugins (in ~/.devloop/).
pub const PLUGINS_DIR: &str = "plugins";

/// The metadata file every plugin ships at its folder root.
pub const PLUGIN_METADATA_FILENAME: &str = "plugin.yaml";

/// The executable every plugin ships next to its metadata.
pub const PLUGIN_BINARY: &str = "binary";

/// Default deadline for command- and plugin-backed variables, in seconds.
/// A hung subprocess must not stall the whole config load.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

/// Deprecated cloud-era variable prefix kept as a passthrough for old configs.
pub const LEGACY_SPACE_DOMAIN_PREFIX: &str = "DEVLOOP_SPACE_DOMAIN";
