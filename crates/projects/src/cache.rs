//! Staleness-bounded project snapshot.
//!
//! The snapshot is a JSON array of [`Project`]s. Its age is the file's
//! modification time; a snapshot younger than the configured max age is
//! served without walking the filesystem. Writes happen on background tasks
//! and hand back a [`PersistHandle`] that callers may await before exiting.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use {
    tokio::task::JoinHandle,
    tracing::{debug, warn},
};

use crate::{
    descriptor::Diagnostic,
    discover::{Discovery, SkippedDescriptor, discover},
    error::Result,
    types::Project,
};

pub const SNAPSHOT_FILE_NAME: &str = "projects.json";

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// Completion signal for a background snapshot write.
///
/// Dropping the handle detaches the task; the write then completes only if
/// the runtime outlives it.
#[derive(Debug)]
pub struct PersistHandle {
    inner: JoinHandle<Result<usize>>,
}

impl PersistHandle {
    /// Wait for the write and return the number of projects persisted.
    pub async fn wait(self) -> Result<usize> {
        self.inner.await?
    }
}

/// Where a project list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    Snapshot,
    Scan,
}

/// Result of [`ProjectCache::find_projects`].
#[derive(Debug)]
pub struct CachedProjects {
    pub projects: Vec<Project>,
    pub source: CacheSource,
    /// Descriptors skipped by the live scan; empty when served from the snapshot.
    pub skipped: Vec<SkippedDescriptor>,
    /// Migration diagnostics from the live scan, keyed by descriptor file.
    pub diagnostics: Vec<(PathBuf, Diagnostic)>,
    /// Pending write-back after a live scan.
    pub write_back: Option<PersistHandle>,
}

/// Diagnostic view of the snapshot file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    NotBuilt {
        path: PathBuf,
    },
    Built {
        path: PathBuf,
        age: Duration,
        valid: bool,
        size: u64,
    },
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotBuilt { .. } => writeln!(f, "Cache: not built"),
            Self::Built {
                path,
                age,
                valid,
                size,
            } => {
                writeln!(f, "Cache: {}", path.display())?;
                writeln!(f, "Age: {}s", age.as_secs())?;
                writeln!(f, "Valid: {valid}")?;
                writeln!(f, "Size: {size} bytes")
            },
        }
    }
}

/// Snapshot of the discovered projects with an injected max age.
#[derive(Debug, Clone)]
pub struct ProjectCache {
    path: PathBuf,
    max_age: Duration,
}

impl ProjectCache {
    pub fn new(path: PathBuf, max_age: Duration) -> Self {
        Self { path, max_age }
    }

    /// Cache stored as [`SNAPSHOT_FILE_NAME`] inside `dir`.
    pub fn in_dir(dir: &Path, max_age: Duration) -> Self {
        Self::new(dir.join(SNAPSHOT_FILE_NAME), max_age)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Time since the snapshot was last written, `None` if it does not exist.
    pub fn age(&self) -> Result<Option<Duration>> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(Some(age_of(meta.modified()?))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.age(), Ok(Some(age)) if age < self.max_age)
    }

    pub fn load(&self) -> Result<Vec<Project>> {
        let data = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Replace the snapshot wholesale.
    pub fn save(&self, projects: &[Project]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(projects)?;
        fs::write(&self.path, data)?;
        debug!(
            path = %self.path.display(),
            projects = projects.len(),
            "saved project snapshot"
        );
        Ok(())
    }

    /// Remove the snapshot. A missing file is not an error.
    pub fn invalidate(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "invalidated project snapshot");
                Ok(())
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn status(&self) -> Result<CacheStatus> {
        match fs::metadata(&self.path) {
            Ok(meta) => {
                let age = age_of(meta.modified()?);
                Ok(CacheStatus::Built {
                    path: self.path.clone(),
                    age,
                    valid: age < self.max_age,
                    size: meta.len(),
                })
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(CacheStatus::NotBuilt {
                path: self.path.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Serve the snapshot if it is valid, otherwise scan `roots` and persist
    /// the result in the background.
    ///
    /// An undecodable snapshot is discarded in favour of a live scan.
    pub async fn find_projects(&self, roots: &[PathBuf]) -> Result<CachedProjects> {
        if self.is_valid() {
            match self.load() {
                Ok(projects) => {
                    debug!(
                        path = %self.path.display(),
                        projects = projects.len(),
                        "serving project snapshot"
                    );
                    return Ok(CachedProjects {
                        projects,
                        source: CacheSource::Snapshot,
                        skipped: Vec::new(),
                        diagnostics: Vec::new(),
                        write_back: None,
                    });
                },
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "discarding unreadable project snapshot"
                    );
                },
            }
        }

        let discovery = scan(roots.to_vec()).await?;
        let write_back = self.spawn_save(discovery.projects.clone());
        Ok(CachedProjects {
            projects: discovery.projects,
            source: CacheSource::Scan,
            skipped: discovery.skipped,
            diagnostics: discovery.diagnostics,
            write_back: Some(write_back),
        })
    }

    /// Invalidate, rescan and persist, all off the calling task.
    pub fn rebuild(&self, roots: Vec<PathBuf>) -> PersistHandle {
        let cache = self.clone();
        let inner = tokio::spawn(async move {
            let result = rebuild_snapshot(&cache, roots).await;
            if let Err(ref e) = result {
                warn!(path = %cache.path.display(), error = %e, "project snapshot rebuild failed");
            }
            result
        });
        PersistHandle { inner }
    }

    fn spawn_save(&self, projects: Vec<Project>) -> PersistHandle {
        let cache = self.clone();
        let inner = tokio::task::spawn_blocking(move || -> Result<usize> {
            if let Err(e) = cache.save(&projects) {
                warn!(path = %cache.path.display(), error = %e, "failed to write project snapshot");
                return Err(e);
            }
            Ok(projects.len())
        });
        PersistHandle { inner }
    }
}

async fn rebuild_snapshot(cache: &ProjectCache, roots: Vec<PathBuf>) -> Result<usize> {
    cache.invalidate()?;
    let discovery = scan(roots).await?;
    let count = discovery.projects.len();
    let target = cache.clone();
    tokio::task::spawn_blocking(move || target.save(&discovery.projects)).await??;
    Ok(count)
}

/// Walk `roots` on the blocking pool.
pub async fn scan(roots: Vec<PathBuf>) -> Result<Discovery> {
    tokio::task::spawn_blocking(move || discover(&roots)).await?
}

fn age_of(modified: SystemTime) -> Duration {
    SystemTime::now()
        .duration_since(modified)
        .unwrap_or_default()
}
