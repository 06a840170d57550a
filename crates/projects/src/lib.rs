//! Project registry for pk.
//!
//! A project is a directory carrying a `.project.toml` descriptor. Descriptors
//! are discovered under configured roots, migrated from the legacy
//! ownership/client schema on load, and cached as a JSON snapshot with a
//! bounded age. Access times are tracked separately to rank recent projects.

pub mod access;
pub mod cache;
pub mod descriptor;
pub mod discover;
pub mod error;
pub mod filter;
pub mod registry;
pub mod types;

pub use {
    access::{AccessRecord, AccessTracker, rank_by_recency},
    cache::{CacheSource, CacheStatus, CachedProjects, PersistHandle, ProjectCache},
    descriptor::{
        DESCRIPTOR_FILE_NAME, Diagnostic, Migrated, Severity, load_descriptor, migrate,
        parse_descriptor, write_descriptor,
    },
    discover::{Discovery, SkippedDescriptor, discover},
    error::{Error, Result},
    filter::ProjectFilter,
    registry::ProjectRegistry,
    types::{Project, ProjectKind, ProjectStatus},
};
