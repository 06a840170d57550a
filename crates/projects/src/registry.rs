use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
    time::Duration,
};

use tracing::{debug, warn};

use crate::{
    access::{AccessRecord, AccessTracker, rank_by_recency},
    cache::{CacheStatus, CachedProjects, PersistHandle, ProjectCache, scan},
    descriptor::write_descriptor,
    discover::Discovery,
    error::{Error, Result},
    types::Project,
};

/// The configured roots, snapshot cache and access tracker behind one API.
///
/// Background snapshot writes started by lookups are kept until
/// [`ProjectRegistry::flush`] so a short-lived process can wait for them.
pub struct ProjectRegistry {
    roots: Vec<PathBuf>,
    cache: ProjectCache,
    access: AccessTracker,
    pending: Mutex<Vec<PersistHandle>>,
}

impl ProjectRegistry {
    pub fn new(roots: Vec<PathBuf>, cache: ProjectCache, access: AccessTracker) -> Self {
        Self {
            roots,
            cache,
            access,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot and access records side by side in `cache_dir`.
    pub fn in_dir(roots: Vec<PathBuf>, cache_dir: &Path, max_age: Duration) -> Self {
        Self::new(
            roots,
            ProjectCache::in_dir(cache_dir, max_age),
            AccessTracker::in_dir(cache_dir),
        )
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn cache(&self) -> &ProjectCache {
        &self.cache
    }

    pub fn access(&self) -> &AccessTracker {
        &self.access
    }

    /// Cached project list, with source and skipped descriptors.
    pub async fn lookup(&self) -> Result<CachedProjects> {
        let mut found = self.cache.find_projects(&self.roots).await?;
        if let Some(handle) = found.write_back.take() {
            self.track(handle);
        }
        Ok(found)
    }

    pub async fn projects(&self) -> Result<Vec<Project>> {
        Ok(self.lookup().await?.projects)
    }

    /// Uncached scan of every root.
    pub async fn scan(&self) -> Result<Discovery> {
        scan(self.roots.clone()).await
    }

    /// First project whose id or name matches `query`.
    pub async fn find(&self, query: &str) -> Result<Project> {
        self.projects()
            .await?
            .into_iter()
            .find(|p| p.matches(query))
            .ok_or_else(|| Error::NotFound(query.to_string()))
    }

    /// Projects ordered by last access; `limit == 0` returns all of them.
    pub async fn recent_projects(&self, limit: usize) -> Result<Vec<Project>> {
        let records = self.access.load()?;
        let projects = self.projects().await?;
        Ok(rank_by_recency(projects, &records, limit))
    }

    pub fn access_records(&self) -> Result<HashMap<String, AccessRecord>> {
        self.access.load()
    }

    pub fn record_access(&self, project: &Project) -> Result<AccessRecord> {
        self.access.record_access(project.id(), &project.path)
    }

    /// Rewrite a descriptor in the current schema and drop the snapshot so
    /// the next lookup sees the change.
    pub fn rewrite_descriptor(&self, project: &Project) -> Result<PathBuf> {
        let file = write_descriptor(project)?;
        self.cache.invalidate()?;
        Ok(file)
    }

    pub fn invalidate(&self) -> Result<()> {
        self.cache.invalidate()
    }

    pub fn rebuild(&self) -> PersistHandle {
        self.cache.rebuild(self.roots.clone())
    }

    pub fn status(&self) -> Result<CacheStatus> {
        self.cache.status()
    }

    /// Wait for every background snapshot write started by earlier lookups.
    ///
    /// Each failure is logged; the first one is returned once all writes
    /// have settled.
    pub async fn flush(&self) -> Result<()> {
        let pending = std::mem::take(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let mut first_error = None;
        for handle in pending {
            match handle.wait().await {
                Ok(written) => debug!(projects = written, "snapshot write-back finished"),
                Err(e) => {
                    warn!(error = %e, "snapshot write-back failed");
                    first_error.get_or_insert(e);
                },
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn track(&self, handle: PersistHandle) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.push(handle);
    }
}
