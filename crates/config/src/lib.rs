//! Configuration loading for pk.
//!
//! Config file: `pk.toml`, taken from `--config`/`PK_CONFIG` or
//! `~/.config/pk/`. A missing file means defaults.
//!
//! Supports `${ENV_VAR}` substitution and `~` expansion in path values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{
        CONFIG_FILE_NAME, config_dir, default_cache_dir, discover_and_load, find_config_file,
        load_config, load_or_discover,
    },
    schema::{CacheConfig, PkConfig, RootsConfig, expand_home},
};
