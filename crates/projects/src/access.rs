use std::{
    cmp::Ordering,
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::{error::Result, types::Project};

pub const ACCESS_FILE_NAME: &str = "access.json";

/// Last time a project was opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub project_id: String,
    pub project_path: PathBuf,
    pub last_accessed: DateTime<Utc>,
}

/// JSON file-backed map of project id → [`AccessRecord`].
///
/// Records are overwritten on every access and never expire.
#[derive(Debug, Clone)]
pub struct AccessTracker {
    path: PathBuf,
}

impl AccessTracker {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Tracker stored as [`ACCESS_FILE_NAME`] inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(ACCESS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all records. A missing file is an empty map.
    pub fn load(&self) -> Result<HashMap<String, AccessRecord>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, records: &HashMap<String, AccessRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(records)?;
        fs::write(&self.path, data)?;
        Ok(())
    }

    /// Mark `project_id` as accessed now.
    pub fn record_access(&self, project_id: &str, project_path: &Path) -> Result<AccessRecord> {
        self.record_access_at(project_id, project_path, Utc::now())
    }

    pub fn record_access_at(
        &self,
        project_id: &str,
        project_path: &Path,
        at: DateTime<Utc>,
    ) -> Result<AccessRecord> {
        let mut records = self.load()?;
        let record = AccessRecord {
            project_id: project_id.to_string(),
            project_path: project_path.to_path_buf(),
            last_accessed: at,
        };
        records.insert(project_id.to_string(), record.clone());
        self.save(&records)?;
        debug!(id = project_id, path = %project_path.display(), "recorded project access");
        Ok(record)
    }
}

/// Order `projects` most recently accessed first.
///
/// Projects without a record follow all accessed ones. A `limit` of zero
/// keeps everything.
pub fn rank_by_recency(
    mut projects: Vec<Project>,
    records: &HashMap<String, AccessRecord>,
    limit: usize,
) -> Vec<Project> {
    projects.sort_by(|a, b| {
        let a = records.get(a.id()).map(|r| r.last_accessed);
        let b = records.get(b.id()).map(|r| r.last_accessed);
        match (a, b) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    if limit > 0 {
        projects.truncate(limit);
    }
    projects
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::types::ProjectInfo,
        chrono::{Duration, TimeZone},
    };

    fn project(id: &str) -> Project {
        Project {
            path: PathBuf::from(format!("/projects/{id}")),
            info: ProjectInfo {
                id: id.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn ids(projects: &[Project]) -> Vec<&str> {
        projects.iter().map(Project::id).collect()
    }

    #[test]
    fn missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let tracker = AccessTracker::in_dir(&tmp.path().join("never-created"));
        assert!(tracker.load().unwrap().is_empty());
    }

    #[test]
    fn record_access_upserts() {
        let tmp = tempfile::tempdir().unwrap();
        let tracker = AccessTracker::in_dir(tmp.path());

        let before = Utc::now();
        tracker
            .record_access("test-project", Path::new("/path/to/project"))
            .unwrap();
        let records = tracker.load().unwrap();
        let record = &records["test-project"];
        assert_eq!(record.project_id, "test-project");
        assert_eq!(record.project_path, PathBuf::from("/path/to/project"));
        assert!(record.last_accessed >= before);

        let later = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        tracker
            .record_access_at("test-project", Path::new("/moved/project"), later)
            .unwrap();
        let records = tracker.load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records["test-project"].last_accessed, later);
        assert_eq!(records["test-project"].project_path, PathBuf::from("/moved/project"));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let tracker = AccessTracker::in_dir(tmp.path());
        fs::write(tracker.path(), "{not json").unwrap();
        assert!(tracker.load().is_err());
    }

    #[test]
    fn rank_orders_by_last_access() {
        let t1 = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let t2 = t1 + Duration::hours(1);
        let t3 = t2 + Duration::hours(1);

        let mut records = HashMap::new();
        for (id, at) in [("one", t1), ("two", t2), ("three", t3)] {
            records.insert(id.to_string(), AccessRecord {
                project_id: id.to_string(),
                project_path: PathBuf::from(format!("/projects/{id}")),
                last_accessed: at,
            });
        }
        let projects = vec![
            project("never"),
            project("one"),
            project("three"),
            project("two"),
        ];

        let limited = rank_by_recency(projects.clone(), &records, 2);
        assert_eq!(ids(&limited), vec!["three", "two"]);

        let all = rank_by_recency(projects, &records, 0);
        assert_eq!(ids(&all), vec!["three", "two", "one", "never"]);
    }

    #[test]
    fn records_for_unknown_projects_are_ignored() {
        let mut records = HashMap::new();
        records.insert("gone".to_string(), AccessRecord {
            project_id: "gone".into(),
            project_path: PathBuf::from("/gone"),
            last_accessed: Utc::now(),
        });
        let ranked = rank_by_recency(vec![project("a")], &records, 5);
        assert_eq!(ids(&ranked), vec!["a"]);
    }
}
