use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::PkConfig};

pub const CONFIG_FILE_NAME: &str = "pk.toml";

/// Load config from `path`. Read and parse failures are errors.
pub fn load_config(path: &Path) -> anyhow::Result<PkConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_config(&substitute_env(&raw), path)
}

/// Load `explicit` if given, otherwise discover the user-global file.
pub fn load_or_discover(explicit: Option<&Path>) -> anyhow::Result<PkConfig> {
    match explicit {
        Some(path) => {
            debug!(path = %path.display(), "loading explicit config");
            load_config(path)
        },
        None => Ok(discover_and_load()),
    }
}

/// Load `~/.config/pk/pk.toml` if present.
///
/// Returns `PkConfig::default()` when no file exists or it cannot be loaded.
pub fn discover_and_load() -> PkConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    PkConfig::default()
}

pub fn find_config_file() -> Option<PathBuf> {
    config_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .filter(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/pk/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "pk").map(|d| d.config_dir().to_path_buf())
}

/// Returns the platform cache directory (`~/.cache/pk/` on Linux).
pub fn default_cache_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "pk").map(|d| d.cache_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<PkConfig> {
    toml::from_str(raw).with_context(|| format!("invalid config {}", path.display()))
}
