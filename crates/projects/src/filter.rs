use std::fmt;

use crate::types::{Project, ProjectKind, ProjectStatus};

/// Listing filter accepted by `pk list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectFilter {
    All,
    Status(ProjectStatus),
    Kind(ProjectKind),
    /// Projects with a client, direct or through a partner.
    Client,
    Owner(String),
}

impl ProjectFilter {
    /// Status and type names select on those fields; any other word is an owner.
    pub fn parse(s: &str) -> Self {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "" | "all" => Self::All,
            "client" | "client-project" => Self::Client,
            _ => {
                if let Some(status) = ProjectStatus::known(&s) {
                    Self::Status(status)
                } else if let Some(kind) = ProjectKind::known(&s) {
                    Self::Kind(kind)
                } else {
                    Self::Owner(s)
                }
            },
        }
    }

    pub fn matches(&self, project: &Project) -> bool {
        match self {
            Self::All => true,
            Self::Status(status) => project.info.status.as_ref() == Some(status),
            Self::Kind(kind) => project.info.kind.as_ref() == Some(kind),
            Self::Client => {
                !project.client_name().is_empty() || project.kind_label() == "client-project"
            },
            Self::Owner(owner) => project.owner().eq_ignore_ascii_case(owner),
        }
    }

    pub fn apply(&self, projects: Vec<Project>) -> Vec<Project> {
        projects.into_iter().filter(|p| self.matches(p)).collect()
    }
}

impl fmt::Display for ProjectFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Status(status) => write!(f, "{status}"),
            Self::Kind(kind) => write!(f, "{kind}"),
            Self::Client => write!(f, "client"),
            Self::Owner(owner) => write!(f, "owner {owner}"),
        }
    }
}
