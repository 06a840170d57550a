//! `.project.toml` decoding and legacy schema migration.
//!
//! Descriptors are decoded into [`RawDescriptor`], a superset record holding
//! both the current sections and the legacy `[ownership]` / `[client]`
//! layout. [`migrate`] folds the legacy values into `[consultant]` and
//! `[datakai]` and returns the normalized [`Project`]. Nothing outside this
//! module sees both schemas at once.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use {
    serde::{Deserialize, Serialize},
    toml_edit::{DocumentMut, Item},
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    types::{
        CloudContext, Consultant, DataKai, Dates, LegacyFallback, Links, Notes, Project,
        ProjectInfo, Tech, TmuxLayout,
    },
};

/// File name whose presence marks a directory as a tracked project.
pub const DESCRIPTOR_FILE_NAME: &str = ".project.toml";

const OWNERSHIP_VALUES: &[&str] = &["datakai", "client", "shared", "open-source"];
const CLIENT_TYPE_VALUES: &[&str] = &["direct", "partner", "internal"];
const ROLE_VALUES: &[&str] = &["lead", "contributor", "advisor"];
const VISIBILITY_VALUES: &[&str] = &["private", "public", "client-confidential"];

const LEGACY_SECTIONS: [&str; 2] = ["ownership", "client"];
const MOVED_LINK_KEYS: [&str; 2] = ["scriptorium_project", "conduit_graph"];

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// `[links]` as found on disk, including the two fields that belong to
/// `[datakai]` in the current schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLinks {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub documentation: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scriptorium_project: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub conduit_graph: String,
}

/// Legacy `[ownership]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyOwnership {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub primary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub partners: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub license_model: String,
    /// Misplaced; belongs to `datakai.visibility`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub visibility: String,
}

/// Legacy `[client]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyClient {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub end_client: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub intermediary: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub my_role: String,
}

/// Every section a descriptor may contain, current and legacy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDescriptor {
    pub project: ProjectInfo,
    #[serde(skip_serializing_if = "is_default")]
    pub tech: Tech,
    #[serde(skip_serializing_if = "is_default")]
    pub dates: Dates,
    #[serde(skip_serializing_if = "is_default")]
    pub links: RawLinks,
    #[serde(skip_serializing_if = "is_default")]
    pub notes: Notes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmux: Option<TmuxLayout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<CloudContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consultant: Option<Consultant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datakai: Option<DataKai>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership: Option<LegacyOwnership>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<LegacyClient>,
}

impl RawDescriptor {
    /// Rebuild the raw record an entity was migrated from, legacy fallback
    /// values included. Migrating the result yields the same entity.
    pub fn from_project(project: &Project) -> Self {
        let legacy = &project.legacy;
        let ownership = (!legacy.owner.is_empty()
            || !legacy.partners.is_empty()
            || !legacy.license_model.is_empty())
        .then(|| LegacyOwnership {
            primary: legacy.owner.clone(),
            partners: legacy.partners.clone(),
            license_model: legacy.license_model.clone(),
            visibility: String::new(),
        });
        let client = (!legacy.end_client.is_empty()
            || !legacy.intermediary.is_empty()
            || !legacy.my_role.is_empty())
        .then(|| LegacyClient {
            end_client: legacy.end_client.clone(),
            intermediary: legacy.intermediary.clone(),
            my_role: legacy.my_role.clone(),
        });

        Self {
            project: project.info.clone(),
            tech: project.tech.clone(),
            dates: project.dates.clone(),
            links: RawLinks {
                repository: project.links.repository.clone(),
                documentation: project.links.documentation.clone(),
                ..Default::default()
            },
            notes: project.notes.clone(),
            tmux: project.tmux.clone(),
            context: project.context.clone(),
            consultant: (!project.consultant.is_empty()).then(|| project.consultant.clone()),
            datakai: (!project.datakai.is_empty()).then(|| project.datakai.clone()),
            ownership,
            client,
        }
    }

    /// The current-schema record for `project`: legacy sections dropped and
    /// every value the accessors serve from the legacy fallback folded into
    /// `[consultant]`, so nothing readable is lost on save.
    pub fn canonical(project: &Project) -> Self {
        let mut raw = Self::from_project(project).without_legacy();
        let mut consultant = project.consultant.clone();
        let fallbacks = [
            (&mut consultant.ownership, project.owner()),
            (&mut consultant.license_model, project.license_model()),
            (&mut consultant.client_name, project.client_name()),
            (&mut consultant.partner, project.partner()),
            (&mut consultant.my_role, project.my_role()),
        ];
        for (target, fallback) in fallbacks {
            if target.is_empty() {
                fallback.clone_into(target);
            }
        }
        raw.consultant = (!consultant.is_empty()).then_some(consultant);
        raw
    }

    /// Drop the legacy sections, leaving only what the current schema writes.
    #[must_use]
    pub fn without_legacy(mut self) -> Self {
        self.ownership = None;
        self.client = None;
        self.links.scriptorium_project.clear();
        self.links.conduit_graph.clear();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A note produced while migrating or validating one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// "schema-conflict", "legacy-schema" or "unknown-value"
    pub category: &'static str,
    /// Dotted path of the canonical field, e.g. "consultant.ownership"
    pub field: String,
    pub message: String,
}

impl Diagnostic {
    fn conflict(field: &str, source: &str, canonical: &str, legacy: &str) -> Self {
        Self {
            severity: Severity::Warning,
            category: "schema-conflict",
            field: field.to_string(),
            message: format!("keeping {field} = {canonical:?}, ignoring {source} = {legacy:?}"),
        }
    }

    fn legacy(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            category: "legacy-schema",
            field: field.to_string(),
            message: message.into(),
        }
    }

    fn unknown_value(field: &str, value: &str, allowed: &[&str]) -> Self {
        Self {
            severity: Severity::Warning,
            category: "unknown-value",
            field: field.to_string(),
            message: format!("{value:?} is not one of {}", allowed.join(", ")),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}: {}", self.severity, self.category, self.field, self.message)
    }
}

/// A normalized project plus whatever migration noticed along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Migrated {
    pub project: Project,
    pub diagnostics: Vec<Diagnostic>,
    /// The descriptor had `[ownership]`, `[client]` or a moved link, whether
    /// or not any of it was folded.
    pub legacy_sections: bool,
}

impl Migrated {
    /// Whether the file on disk still carries legacy schema content.
    pub fn used_legacy_schema(&self) -> bool {
        self.legacy_sections
    }
}

/// Copy `legacy` into `target` unless the canonical value is already set.
/// A differing canonical value wins and is reported.
fn fill(
    target: &mut String,
    legacy: &str,
    field: &str,
    source: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if legacy.is_empty() {
        return;
    }
    if target.is_empty() {
        *target = legacy.to_string();
    } else if target != legacy {
        diagnostics.push(Diagnostic::conflict(field, source, target, legacy));
    }
}

fn check_vocabulary(
    value: &str,
    field: &str,
    allowed: &[&str],
    diagnostics: &mut Vec<Diagnostic>,
) {
    if !value.is_empty() && !allowed.contains(&value) {
        diagnostics.push(Diagnostic::unknown_value(field, value, allowed));
    }
}

/// Fold legacy sections into the current schema.
///
/// Canonical values are never overwritten, so the function is idempotent:
/// `migrate(RawDescriptor::from_project(&m.project), dir).project == m.project`.
pub fn migrate(raw: RawDescriptor, dir: &Path) -> Migrated {
    let mut diagnostics = Vec::new();
    let mut consultant = raw.consultant.unwrap_or_default();
    let mut datakai = raw.datakai.unwrap_or_default();
    let mut legacy = LegacyFallback::default();
    let legacy_sections = raw.ownership.is_some()
        || raw.client.is_some()
        || !raw.links.scriptorium_project.is_empty()
        || !raw.links.conduit_graph.is_empty();

    // Legacy values are resolved among themselves first, later sections
    // overriding earlier ones, and only then compared with `consultant`.
    let mut folded = Consultant::default();
    let mut partner_source = "ownership.partners";

    if let Some(ownership) = &raw.ownership {
        if !ownership.primary.is_empty() {
            folded.ownership.clone_from(&ownership.primary);
            folded.license_model.clone_from(&ownership.license_model);
            if let Some(first) = ownership.partners.first() {
                folded.partner.clone_from(first);
            }
            diagnostics.push(Diagnostic::legacy(
                "consultant",
                "[ownership] folded into [consultant]",
            ));
        }
        // Moved, not copied: the legacy location is dropped here.
        if !ownership.visibility.is_empty() {
            fill(
                &mut datakai.visibility,
                &ownership.visibility,
                "datakai.visibility",
                "ownership.visibility",
                &mut diagnostics,
            );
            diagnostics.push(Diagnostic::legacy(
                "datakai.visibility",
                "ownership.visibility moved to datakai.visibility",
            ));
        }
    }

    if let Some(client) = &raw.client
        && (!client.end_client.is_empty() || !client.intermediary.is_empty())
    {
        folded.client_name.clone_from(&client.end_client);
        folded.my_role.clone_from(&client.my_role);
        if client.intermediary.is_empty() {
            folded.client_type = "direct".to_string();
        } else {
            folded.partner.clone_from(&client.intermediary);
            partner_source = "client.intermediary";
            folded.client_type = "partner".to_string();
        }
        diagnostics.push(Diagnostic::legacy(
            "consultant",
            "[client] folded into [consultant]",
        ));
    }

    let folds = [
        (
            &mut consultant.ownership,
            folded.ownership.as_str(),
            "consultant.ownership",
            "ownership.primary",
        ),
        (
            &mut consultant.license_model,
            folded.license_model.as_str(),
            "consultant.license_model",
            "ownership.license_model",
        ),
        (
            &mut consultant.partner,
            folded.partner.as_str(),
            "consultant.partner",
            partner_source,
        ),
        (
            &mut consultant.client_name,
            folded.client_name.as_str(),
            "consultant.client_name",
            "client.end_client",
        ),
        (
            &mut consultant.my_role,
            folded.my_role.as_str(),
            "consultant.my_role",
            "client.my_role",
        ),
        (
            &mut consultant.client_type,
            folded.client_type.as_str(),
            "consultant.client_type",
            "client",
        ),
    ];
    for (target, value, field, source) in folds {
        fill(target, value, field, source, &mut diagnostics);
    }

    if let Some(ownership) = raw.ownership {
        legacy.owner = ownership.primary;
        legacy.partners = ownership.partners;
        legacy.license_model = ownership.license_model;
    }
    if let Some(client) = raw.client {
        legacy.end_client = client.end_client;
        legacy.intermediary = client.intermediary;
        legacy.my_role = client.my_role;
    }

    let moved_links = [
        (
            &mut datakai.scriptorium_project,
            raw.links.scriptorium_project.as_str(),
            "datakai.scriptorium_project",
            "links.scriptorium_project",
        ),
        (
            &mut datakai.conduit_graph,
            raw.links.conduit_graph.as_str(),
            "datakai.conduit_graph",
            "links.conduit_graph",
        ),
    ];
    for (target, value, field, source) in moved_links {
        if value.is_empty() {
            continue;
        }
        fill(target, value, field, source, &mut diagnostics);
        diagnostics.push(Diagnostic::legacy(field, format!("{source} moved to {field}")));
    }

    check_vocabulary(
        &consultant.ownership,
        "consultant.ownership",
        OWNERSHIP_VALUES,
        &mut diagnostics,
    );
    check_vocabulary(
        &consultant.client_type,
        "consultant.client_type",
        CLIENT_TYPE_VALUES,
        &mut diagnostics,
    );
    check_vocabulary(&consultant.my_role, "consultant.my_role", ROLE_VALUES, &mut diagnostics);
    check_vocabulary(
        &datakai.visibility,
        "datakai.visibility",
        VISIBILITY_VALUES,
        &mut diagnostics,
    );

    let project = Project {
        path: dir.to_path_buf(),
        info: raw.project,
        tech: raw.tech,
        dates: raw.dates,
        links: Links {
            repository: raw.links.repository,
            documentation: raw.links.documentation,
        },
        notes: raw.notes,
        tmux: raw.tmux,
        context: raw.context,
        consultant,
        datakai,
        legacy,
    };

    Migrated {
        project,
        diagnostics,
        legacy_sections,
    }
}

/// Decode descriptor text for a project living in `dir`.
pub fn parse_descriptor(contents: &str, dir: &Path) -> Result<Migrated> {
    let raw: RawDescriptor = toml::from_str(contents)
        .map_err(|e| Error::malformed(dir.join(DESCRIPTOR_FILE_NAME), e))?;
    Ok(migrate(raw, dir))
}

/// Read and normalize one descriptor file.
pub fn load_descriptor(file: &Path) -> Result<Migrated> {
    let contents = fs::read_to_string(file)?;
    let dir = file.parent().unwrap_or_else(|| Path::new("."));
    let dir = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
    let migrated = parse_descriptor(&contents, &dir)?;

    for d in &migrated.diagnostics {
        match (d.severity, d.category) {
            (Severity::Warning, "schema-conflict") => {
                warn!(path = %file.display(), field = %d.field, "{}", d.message);
            },
            _ => debug!(path = %file.display(), field = %d.field, "{}", d.message),
        }
    }

    Ok(migrated)
}

/// Write `project` to its descriptor in the current schema.
///
/// A new file gets the canonical rendering. An existing file is edited in
/// place: legacy sections and moved links are removed and changed canonical
/// values are set, while comments, formatting and keys or tables outside the
/// schema are kept.
pub fn write_descriptor(project: &Project) -> Result<PathBuf> {
    let fresh = toml::to_string_pretty(&RawDescriptor::canonical(project))?;
    fs::create_dir_all(&project.path)?;
    let file = project.path.join(DESCRIPTOR_FILE_NAME);

    let data = match fs::read_to_string(&file) {
        Ok(existing) => merge_descriptor(&existing, &fresh, &file)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => fresh,
        Err(e) => return Err(e.into()),
    };
    fs::write(&file, data)?;
    debug!(path = %file.display(), id = %project.info.id, "wrote descriptor");
    Ok(file)
}

/// Apply the canonical rendering `fresh` onto the text of `existing`.
///
/// Both sides are compared through the typed schema, so a key is only
/// touched when its value actually changed.
fn merge_descriptor(existing: &str, fresh: &str, file: &Path) -> Result<String> {
    let mut doc: DocumentMut = existing.parse()?;
    let fresh_doc: DocumentMut = fresh.parse()?;

    let on_disk: RawDescriptor =
        toml::from_str(existing).map_err(|e| Error::malformed(file, e))?;
    let before: toml::Table =
        toml::from_str(&toml::to_string_pretty(&on_disk.without_legacy())?)
            .map_err(|e| Error::malformed(file, e))?;
    let after: toml::Table = toml::from_str(fresh).map_err(|e| Error::malformed(file, e))?;

    for section in LEGACY_SECTIONS {
        doc.remove(section);
    }
    let links_emptied = doc
        .get_mut("links")
        .and_then(Item::as_table_like_mut)
        .map(|links| {
            for key in MOVED_LINK_KEYS {
                links.remove(key);
            }
            links.is_empty()
        });
    if links_emptied == Some(true) {
        doc.remove("links");
    }

    for (section, values) in &after {
        let Some(values) = values.as_table() else {
            continue;
        };
        let known = before.get(section).and_then(toml::Value::as_table);
        for (key, value) in values {
            if known.and_then(|k| k.get(key)) == Some(value) {
                continue;
            }
            let Some(item) = fresh_doc.get(section).and_then(|s| s.get(key.as_str())) else {
                continue;
            };
            match doc
                .entry(section)
                .or_insert(toml_edit::table())
                .as_table_like_mut()
            {
                Some(target) => {
                    target.insert(key, item.clone());
                },
                None => warn!(path = %file.display(), section = %section, "not a table, left as is"),
            }
        }
    }

    // Canonical keys the entity no longer carries.
    for (section, values) in &before {
        let Some(values) = values.as_table() else {
            continue;
        };
        let Some(target) = doc.get_mut(section).and_then(Item::as_table_like_mut) else {
            continue;
        };
        for key in values.keys() {
            if after.get(section).and_then(|s| s.get(key)).is_none() {
                target.remove(key);
            }
        }
    }

    Ok(doc.to_string())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::types::{ProjectKind, ProjectStatus},
    };

    fn dir() -> PathBuf {
        PathBuf::from("/home/dev/projects/alpha")
    }

    fn parse(contents: &str) -> Migrated {
        parse_descriptor(contents, &dir()).unwrap()
    }

    const CURRENT: &str = r#"
[project]
name = "Conduit"
id = "conduit"
status = "active"
type = "product"

[tech]
stack = ["rust", "postgres"]
domain = ["data"]

[dates]
started = "2025-01-15"

[links]
repository = "https://github.com/example/conduit"

[notes]
description = "Knowledge graph service"

[tmux]
layout = "main-vertical"

[[tmux.windows]]
name = "editor"
command = "nvim ."

[[tmux.windows]]
name = "server"
command = "cargo run"
path = "crates/server"

[context]
aws_profile = "dev"
git_identity = "work"

[consultant]
ownership = "datakai"
client_type = "internal"
billable = true

[datakai]
visibility = "public"
protocols = ["mcp"]
"#;

    #[test]
    fn current_schema_is_untouched() {
        let m = parse(CURRENT);
        assert!(m.diagnostics.is_empty(), "{:?}", m.diagnostics);

        let raw: RawDescriptor = toml::from_str(CURRENT).unwrap();
        let p = &m.project;
        assert_eq!(p.path, dir());
        assert_eq!(p.info, raw.project);
        assert_eq!(p.info.status, Some(ProjectStatus::Active));
        assert_eq!(p.info.kind, Some(ProjectKind::Product));
        assert_eq!(p.tech.stack, vec!["rust", "postgres"]);
        assert!(p.dates.is_ongoing());
        assert_eq!(Some(&p.consultant), raw.consultant.as_ref());
        assert_eq!(Some(&p.datakai), raw.datakai.as_ref());
        assert_eq!(p.context, raw.context);

        let tmux = p.tmux.as_ref().unwrap();
        assert_eq!(tmux.windows.len(), 2);
        assert_eq!(tmux.windows[1].path, "crates/server");
        assert!(p.legacy.is_empty());
    }

    #[test]
    fn legacy_ownership_and_visibility_migrate() {
        let m = parse(
            r#"
[project]
id = "alpha"

[ownership]
primary = "acme"
visibility = "private"
"#,
        );
        let p = &m.project;
        assert_eq!(p.consultant.ownership, "acme");
        assert_eq!(p.datakai.visibility, "private");
        assert_eq!(p.datakai.scriptorium_project, "");
        assert_eq!(p.owner(), "acme");
        assert!(m.used_legacy_schema());
    }

    #[test]
    fn legacy_ownership_fills_license_and_first_partner() {
        let p = parse(
            r#"
[project]
id = "beta"

[ownership]
primary = "shared"
partners = ["West Monroe", "Other"]
license_model = "client-owned"
"#,
        )
        .project;
        assert_eq!(p.consultant.ownership, "shared");
        assert_eq!(p.consultant.partner, "West Monroe");
        assert_eq!(p.consultant.license_model, "client-owned");
        assert_eq!(p.partners(), vec!["West Monroe"]);
    }

    #[test]
    fn visibility_moves_without_primary_owner() {
        let p = parse(
            r#"
[project]
id = "gamma"

[ownership]
visibility = "client-confidential"
"#,
        )
        .project;
        assert_eq!(p.datakai.visibility, "client-confidential");
        assert_eq!(p.consultant.ownership, "");
    }

    #[test]
    fn legacy_client_with_intermediary_is_a_partner_engagement() {
        let p = parse(
            r#"
[project]
id = "delta"

[client]
end_client = "Acme Corp"
intermediary = "West Monroe"
my_role = "lead"
"#,
        )
        .project;
        assert_eq!(p.consultant.client_name, "Acme Corp");
        assert_eq!(p.consultant.partner, "West Monroe");
        assert_eq!(p.consultant.client_type, "partner");
        assert_eq!(p.consultant.my_role, "lead");
        assert_eq!(p.my_role(), "lead");
        assert_eq!(p.client_name(), "Acme Corp");
    }

    #[test]
    fn legacy_client_without_intermediary_is_direct() {
        let p = parse(
            r#"
[project]
id = "epsilon"

[client]
end_client = "Acme Corp"
"#,
        )
        .project;
        assert_eq!(p.consultant.client_type, "direct");
        assert_eq!(p.consultant.partner, "");
    }

    #[test]
    fn legacy_client_role_alone_is_only_a_fallback() {
        let p = parse(
            r#"
[project]
id = "zeta"

[client]
my_role = "advisor"
"#,
        )
        .project;
        assert_eq!(p.consultant.my_role, "");
        assert_eq!(p.my_role(), "advisor");
    }

    #[test]
    fn legacy_links_move_to_datakai() {
        let p = parse(
            r#"
[project]
id = "eta"

[links]
repository = "https://example.com/eta"
scriptorium_project = "notes/eta"
conduit_graph = "graph/eta"
"#,
        )
        .project;
        assert_eq!(p.links.repository, "https://example.com/eta");
        assert_eq!(p.datakai.scriptorium_project, "notes/eta");
        assert_eq!(p.datakai.conduit_graph, "graph/eta");
    }

    #[test]
    fn canonical_value_wins_and_conflict_is_reported() {
        let m = parse(
            r#"
[project]
id = "theta"

[consultant]
ownership = "datakai"

[ownership]
primary = "acme"
"#,
        );
        assert_eq!(m.project.consultant.ownership, "datakai");
        assert_eq!(m.project.owner(), "datakai");
        let conflict = m
            .diagnostics
            .iter()
            .find(|d| d.category == "schema-conflict")
            .unwrap();
        assert_eq!(conflict.field, "consultant.ownership");
        assert_eq!(conflict.severity, Severity::Warning);
    }

    #[test]
    fn empty_legacy_values_never_clear_canonical_ones() {
        let p = parse(
            r#"
[project]
id = "iota"

[consultant]
license_model = "proprietary"

[ownership]
primary = "datakai"
license_model = ""
"#,
        )
        .project;
        assert_eq!(p.consultant.license_model, "proprietary");
    }

    #[test]
    fn migration_is_idempotent() {
        let m = parse(
            r#"
[project]
id = "kappa"

[ownership]
primary = "acme"
partners = ["p1", "p2"]
visibility = "private"

[client]
end_client = "Big Co"
intermediary = "p9"

[links]
conduit_graph = "g"
"#,
        );
        assert_eq!(m.project.consultant.partner, "p9");
        let again = migrate(RawDescriptor::from_project(&m.project), &dir());
        assert_eq!(again.project, m.project);
        let raw = RawDescriptor::from_project(&m.project);
        assert_eq!(raw.ownership.as_ref().unwrap().visibility, "");
    }

    #[test]
    fn unknown_extension_values_warn_only_when_set() {
        let m = parse(
            r#"
[project]
id = "lambda"

[datakai]
visibility = "secret"
"#,
        );
        assert_eq!(m.project.datakai.visibility, "secret");
        assert!(
            m.diagnostics
                .iter()
                .any(|d| d.category == "unknown-value" && d.field == "datakai.visibility")
        );
        assert!(parse("[project]\nid = \"mu\"\n").diagnostics.is_empty());
    }

    #[test]
    fn malformed_toml_is_reported_with_path() {
        let err = parse_descriptor("[project\nname = \"Invalid", &dir()).unwrap_err();
        assert!(err.is_malformed());
        match err {
            Error::MalformedDescriptor { path, .. } => {
                assert_eq!(path, dir().join(DESCRIPTOR_FILE_NAME));
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_descriptor_uses_parent_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join(DESCRIPTOR_FILE_NAME);
        fs::write(
            &file,
            "[project]\nname = \"Test Project\"\nid = \"test-project\"\nstatus = \"active\"\n",
        )
        .unwrap();

        let p = load_descriptor(&file).unwrap().project;
        assert_eq!(p.path, tmp.path());
        assert_eq!(p.id(), "test-project");
        assert_eq!(p.name(), "Test Project");
    }

    #[test]
    fn write_descriptor_drops_legacy_sections() {
        let tmp = tempfile::tempdir().unwrap();
        let mut p = parse(
            r#"
[project]
name = "Nu"
id = "nu"
status = "archived"

[ownership]
primary = "acme"
visibility = "private"

[links]
scriptorium_project = "notes/nu"
"#,
        )
        .project;
        p.path = tmp.path().to_path_buf();

        let file = write_descriptor(&p).unwrap();
        let written = fs::read_to_string(&file).unwrap();
        assert!(!written.contains("[ownership]"), "{written}");
        assert!(!written.contains("[client]"), "{written}");

        let raw: RawDescriptor = toml::from_str(&written).unwrap();
        assert!(raw.ownership.is_none());
        assert_eq!(raw.links.scriptorium_project, "");

        let reloaded = load_descriptor(&file).unwrap();
        assert!(!reloaded.used_legacy_schema());
        assert_eq!(reloaded.project.consultant, p.consultant);
        assert_eq!(reloaded.project.datakai, p.datakai);
        assert_eq!(reloaded.project.info, p.info);
    }

    #[test]
    fn intermediary_overrides_ownership_partner() {
        let m = parse(
            r#"
[project]
id = "xi"

[ownership]
primary = "shared"
partners = ["p1"]

[client]
end_client = "Big"
intermediary = "p9"
"#,
        );
        let p = &m.project;
        assert_eq!(p.consultant.partner, "p9");
        assert_eq!(p.consultant.client_type, "partner");
        assert_eq!(p.partner(), "p9");
        assert!(
            !m.diagnostics.iter().any(|d| d.category == "schema-conflict"),
            "{:?}",
            m.diagnostics
        );
    }

    #[test]
    fn canonical_partner_beats_intermediary() {
        let m = parse(
            r#"
[project]
id = "omicron"

[consultant]
partner = "Direct"

[ownership]
primary = "shared"
partners = ["p1"]

[client]
end_client = "Big"
intermediary = "p9"
"#,
        );
        assert_eq!(m.project.consultant.partner, "Direct");
        let conflicts: Vec<&Diagnostic> = m
            .diagnostics
            .iter()
            .filter(|d| d.category == "schema-conflict")
            .collect();
        assert_eq!(conflicts.len(), 1, "{conflicts:?}");
        assert_eq!(conflicts[0].field, "consultant.partner");
        assert!(conflicts[0].message.contains("client.intermediary"));
    }

    #[test]
    fn fallback_only_legacy_sections_count_as_legacy() {
        let m = parse(
            r#"
[project]
id = "pi"

[ownership]
partners = ["p1"]
license_model = "client-owned"

[client]
my_role = "advisor"
"#,
        );
        assert!(m.used_legacy_schema());
        assert_eq!(m.project.consultant.my_role, "");
        assert!(!parse(CURRENT).used_legacy_schema());

        let tmp = tempfile::tempdir().unwrap();
        let mut p = m.project;
        p.path = tmp.path().to_path_buf();
        let file = write_descriptor(&p).unwrap();

        let reloaded = load_descriptor(&file).unwrap();
        assert!(!reloaded.used_legacy_schema());
        let c = &reloaded.project.consultant;
        assert_eq!(c.my_role, "advisor");
        assert_eq!(c.partner, "p1");
        assert_eq!(c.license_model, "client-owned");
    }

    #[test]
    fn rewrite_keeps_comments_and_unknown_tables() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join(DESCRIPTOR_FILE_NAME);
        fs::write(
            &file,
            r#"# keep me
[project]
id = "x" # inline note

[ownership]
primary = "acme"

[links]
repository = "https://example.com/x"
conduit_graph = "g"

[custom]
key = "value"
"#,
        )
        .unwrap();

        let m = load_descriptor(&file).unwrap();
        write_descriptor(&m.project).unwrap();
        let written = fs::read_to_string(&file).unwrap();

        assert!(written.contains("# keep me"), "{written}");
        assert!(written.contains("# inline note"), "{written}");
        assert!(!written.contains("[ownership]"), "{written}");
        assert!(!written.contains("name ="), "{written}");

        let table: toml::Table = toml::from_str(&written).unwrap();
        assert_eq!(table["custom"]["key"].as_str(), Some("value"));
        assert_eq!(
            table["links"]["repository"].as_str(),
            Some("https://example.com/x")
        );
        assert!(table["links"].get("conduit_graph").is_none());

        let reloaded = load_descriptor(&file).unwrap();
        assert!(!reloaded.used_legacy_schema());
        assert_eq!(reloaded.project.consultant.ownership, "acme");
        assert_eq!(reloaded.project.datakai.conduit_graph, "g");
    }

    #[test]
    fn rewrite_sets_changed_values_and_drops_cleared_ones() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join(DESCRIPTOR_FILE_NAME);
        fs::write(
            &file,
            "# header\n[project]\nid = \"x\"\nstatus = \"active\"\n\n[notes]\ndescription = \"old\"\n",
        )
        .unwrap();

        let mut p = load_descriptor(&file).unwrap().project;
        p.info.status = Some(ProjectStatus::Archived);
        p.notes.description.clear();
        write_descriptor(&p).unwrap();

        let written = fs::read_to_string(&file).unwrap();
        assert!(written.starts_with("# header"), "{written}");
        assert!(!written.contains("old"), "{written}");
        let reloaded = load_descriptor(&file).unwrap().project;
        assert_eq!(reloaded.info.status, Some(ProjectStatus::Archived));
        assert_eq!(reloaded.id(), "x");
    }
}
