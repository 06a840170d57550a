use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

fn is_false(value: &bool) -> bool {
    !*value
}

/// Lifecycle state from `project.status`.
///
/// Values outside the known vocabulary are preserved as [`ProjectStatus::Other`]
/// so hand-edited descriptors still load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectStatus {
    Active,
    Archived,
    Completed,
    Experimental,
    Other(String),
}

impl ProjectStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "active" => Self::Active,
            "archived" => Self::Archived,
            "completed" => Self::Completed,
            "experimental" => Self::Experimental,
            _ => Self::Other(s.to_string()),
        }
    }

    /// Parse only the known vocabulary.
    pub fn known(s: &str) -> Option<Self> {
        match Self::parse(s) {
            Self::Other(_) => None,
            status => Some(status),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Completed => "completed",
            Self::Experimental => "experimental",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ProjectStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<ProjectStatus> for String {
    fn from(status: ProjectStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Project category from `project.type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectKind {
    Product,
    Tool,
    Library,
    Experiment,
    Other(String),
}

impl ProjectKind {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "product" => Self::Product,
            "tool" => Self::Tool,
            "library" => Self::Library,
            "experiment" => Self::Experiment,
            _ => Self::Other(s.to_string()),
        }
    }

    pub fn known(s: &str) -> Option<Self> {
        match Self::parse(s) {
            Self::Other(_) => None,
            kind => Some(kind),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Product => "product",
            Self::Tool => "tool",
            Self::Library => "library",
            Self::Experiment => "experiment",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ProjectKind {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<ProjectKind> for String {
    fn from(kind: ProjectKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[project]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectInfo {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProjectKind>,
}

/// `[tech]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tech {
    pub stack: Vec<String>,
    pub domain: Vec<String>,
}

/// `[dates]` section. ISO dates; an empty `completed` means ongoing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dates {
    pub started: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub completed: String,
}

impl Dates {
    pub fn is_ongoing(&self) -> bool {
        self.completed.is_empty()
    }
}

/// `[links]` section, generic links only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Links {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub documentation: String,
}

/// `[notes]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Notes {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// `[tmux]` section consumed by session launchers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TmuxLayout {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub layout: String,
    pub windows: Vec<TmuxWindow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TmuxWindow {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub command: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
}

/// `[context]` section: per-provider cloud and VCS identities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudContext {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub aws_profile: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub azure_subscription: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub gcloud_project: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub databricks_profile: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub snowflake_account: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub git_identity: String,
}

/// `[consultant]` extension: ownership and billing metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Consultant {
    /// datakai | client | shared | open-source
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ownership: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_name: String,
    /// direct | partner | internal
    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub partner: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub my_role: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub deliverable_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub license_model: String,
    #[serde(skip_serializing_if = "is_false")]
    pub billable: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rate_type: String,
}

impl Consultant {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// `[datakai]` extension: visibility classification and knowledge-graph links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataKai {
    /// private | public | client-confidential
    #[serde(skip_serializing_if = "String::is_empty")]
    pub visibility: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scriptorium_project: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub conduit_graph: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dkos_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub product_category: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub revenue_model: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub maturity: String,
}

impl DataKai {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Legacy values kept for accessor fallback only. Never written to a
/// descriptor; travels with the snapshot so cached entities resolve the same.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct LegacyFallback {
    pub owner: String,
    pub partners: Vec<String>,
    pub license_model: String,
    pub end_client: String,
    pub intermediary: String,
    pub my_role: String,
}

impl LegacyFallback {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A normalized project, independent of the schema version on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Directory containing the descriptor.
    pub path: PathBuf,
    #[serde(rename = "project")]
    pub info: ProjectInfo,
    #[serde(default)]
    pub tech: Tech,
    #[serde(default)]
    pub dates: Dates,
    #[serde(default)]
    pub links: Links,
    #[serde(default)]
    pub notes: Notes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmux: Option<TmuxLayout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<CloudContext>,
    #[serde(default, skip_serializing_if = "Consultant::is_empty")]
    pub consultant: Consultant,
    #[serde(default, skip_serializing_if = "DataKai::is_empty")]
    pub datakai: DataKai,
    #[serde(default, skip_serializing_if = "LegacyFallback::is_empty")]
    pub(crate) legacy: LegacyFallback,
}

impl Project {
    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn status_label(&self) -> &str {
        self.info
            .status
            .as_ref()
            .map_or("unknown", ProjectStatus::as_str)
    }

    pub fn kind_label(&self) -> &str {
        self.info
            .kind
            .as_ref()
            .map_or("unknown", ProjectKind::as_str)
    }

    /// Case-insensitive match on id or name.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        !query.is_empty()
            && (self.info.id.eq_ignore_ascii_case(query)
                || self.info.name.eq_ignore_ascii_case(query))
    }

    pub fn owner(&self) -> &str {
        first_non_empty(&self.consultant.ownership, &self.legacy.owner)
    }

    pub fn license_model(&self) -> &str {
        first_non_empty(&self.consultant.license_model, &self.legacy.license_model)
    }

    pub fn client_name(&self) -> &str {
        first_non_empty(&self.consultant.client_name, &self.legacy.end_client)
    }

    pub fn partner(&self) -> &str {
        if !self.consultant.partner.is_empty() {
            return &self.consultant.partner;
        }
        if let Some(first) = self.legacy.partners.first() {
            return first;
        }
        &self.legacy.intermediary
    }

    pub fn partners(&self) -> Vec<&str> {
        if !self.consultant.partner.is_empty() {
            return vec![self.consultant.partner.as_str()];
        }
        self.legacy.partners.iter().map(String::as_str).collect()
    }

    pub fn my_role(&self) -> &str {
        first_non_empty(&self.consultant.my_role, &self.legacy.my_role)
    }
}

fn first_non_empty<'a>(canonical: &'a str, legacy: &'a str) -> &'a str {
    if canonical.is_empty() { legacy } else { canonical }
}
