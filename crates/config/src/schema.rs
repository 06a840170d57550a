//! Config schema for `pk.toml`.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::loader::default_cache_dir;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PkConfig {
    pub roots: RootsConfig,
    pub cache: CacheConfig,
}

/// Directories scanned for project descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootsConfig {
    pub projects: PathBuf,
    pub archive: PathBuf,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<PathBuf>,
}

impl Default for RootsConfig {
    fn default() -> Self {
        Self {
            projects: PathBuf::from("~/projects"),
            archive: PathBuf::from("~/archive"),
            extra: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Snapshot and access-record directory. Defaults to the platform cache dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Snapshot time-to-live in seconds.
    pub max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            max_age_secs: 300,
        }
    }
}

impl PkConfig {
    /// All scan roots with `~` expanded: projects, archive, then extras.
    pub fn root_dirs(&self) -> Vec<PathBuf> {
        [&self.roots.projects, &self.roots.archive]
            .into_iter()
            .chain(&self.roots.extra)
            .map(|p| expand_home(p))
            .collect()
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.cache.max_age_secs)
    }

    /// Configured cache directory, else the platform default.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        match &self.cache.dir {
            Some(dir) => Some(expand_home(dir)),
            None => default_cache_dir(),
        }
    }
}

/// Replace a leading `~` component with the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let home = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf());
    expand_home_with(path, home.as_deref())
}

fn expand_home_with(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
