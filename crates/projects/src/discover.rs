use std::{
    io,
    path::{Path, PathBuf},
};

use {
    tracing::{debug, warn},
    walkdir::WalkDir,
};

use crate::{
    descriptor::{DESCRIPTOR_FILE_NAME, Diagnostic, load_descriptor},
    error::Result,
    types::Project,
};

/// A descriptor (or directory) the walk could not use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDescriptor {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of one scan over the configured roots.
#[derive(Debug, Default)]
pub struct Discovery {
    /// One entry per parsed descriptor, in traversal order. Not deduplicated.
    pub projects: Vec<Project>,
    pub skipped: Vec<SkippedDescriptor>,
    pub diagnostics: Vec<(PathBuf, Diagnostic)>,
}

/// Recursively scan `roots` for descriptor files.
///
/// Missing roots contribute nothing. Malformed descriptors and unreadable
/// nested entries are recorded in [`Discovery::skipped`] and never abort the
/// scan. A root that exists but cannot be opened is an error.
pub fn discover<P: AsRef<Path>>(roots: &[P]) -> Result<Discovery> {
    let mut discovery = Discovery::default();

    for root in roots {
        let root = root.as_ref();
        if !root.exists() {
            debug!(root = %root.display(), "discovery root does not exist, skipping");
            continue;
        }
        scan_root(root, &mut discovery)?;
    }

    debug!(
        roots = roots.len(),
        projects = discovery.projects.len(),
        skipped = discovery.skipped.len(),
        "discovery finished"
    );
    Ok(discovery)
}

fn scan_root(root: &Path, discovery: &mut Discovery) -> Result<()> {
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                if e.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) {
                    debug!(root = %root.display(), "discovery root vanished, skipping");
                    return Ok(());
                }
                return Err(io::Error::from(e).into());
            },
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                discovery.skipped.push(SkippedDescriptor {
                    path,
                    reason: e.to_string(),
                });
                continue;
            },
        };

        if !entry.file_type().is_file() || entry.file_name() != DESCRIPTOR_FILE_NAME {
            continue;
        }

        match load_descriptor(entry.path()) {
            Ok(migrated) => {
                discovery.diagnostics.extend(
                    migrated
                        .diagnostics
                        .into_iter()
                        .map(|d| (entry.path().to_path_buf(), d)),
                );
                discovery.projects.push(migrated.project);
            },
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "skipping descriptor");
                discovery.skipped.push(SkippedDescriptor {
                    path: entry.path().to_path_buf(),
                    reason: e.to_string(),
                });
            },
        }
    }
    Ok(())
}
