use std::fmt::Write as _;

use {
    anyhow::Result,
    chrono::Local,
    pk_projects::{
        DESCRIPTOR_FILE_NAME, Diagnostic, Project, ProjectFilter, ProjectRegistry, Severity,
        SkippedDescriptor, load_descriptor,
    },
};

/// ANSI color codes.
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

pub async fn list(registry: &ProjectRegistry, filter: Option<&str>, fresh: bool) -> Result<()> {
    let filter = ProjectFilter::parse(filter.unwrap_or_default());
    let (projects, skipped) = if fresh {
        let discovery = registry.scan().await?;
        (discovery.projects, discovery.skipped)
    } else {
        let found = registry.lookup().await?;
        (found.projects, found.skipped)
    };
    report_skipped(&skipped);

    let projects = filter.apply(projects);
    if projects.is_empty() {
        match filter {
            ProjectFilter::All => println!("No projects found."),
            _ => println!("No projects match {filter}."),
        }
        return Ok(());
    }
    print!("{}", format_table(&projects));
    Ok(())
}

pub async fn show(registry: &ProjectRegistry, query: &str) -> Result<()> {
    let project = registry.find(query).await?;
    print!("{}", describe(&project));
    Ok(())
}

pub async fn recent(registry: &ProjectRegistry, limit: usize) -> Result<()> {
    let records = registry.access_records()?;
    let projects = registry.recent_projects(limit).await?;
    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    let width = projects.iter().map(|p| p.id().len()).max().unwrap_or(0);
    for project in &projects {
        let last = records
            .get(project.id())
            .map(|r| {
                r.last_accessed
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<width$}  {:<16}  {}",
            project.id(),
            last,
            project.path.display()
        );
    }
    Ok(())
}

/// Record the access and print the directory, for `cd "$(pk touch x)"`.
pub async fn touch(registry: &ProjectRegistry, query: &str) -> Result<()> {
    let project = registry.find(query).await?;
    registry.record_access(&project)?;
    println!("{}", project.path.display());
    Ok(())
}

pub async fn migrate(registry: &ProjectRegistry, query: &str, dry_run: bool) -> Result<()> {
    let project = registry.find(query).await?;
    let file = project.path.join(DESCRIPTOR_FILE_NAME);
    let migrated = load_descriptor(&file)?;

    for diagnostic in &migrated.diagnostics {
        eprintln!("{}", format_diagnostic(diagnostic));
    }

    if !migrated.used_legacy_schema() {
        println!("{} already uses the current schema.", file.display());
        return Ok(());
    }
    if dry_run {
        println!("Would rewrite {}", file.display());
        return Ok(());
    }

    let written = registry.rewrite_descriptor(&migrated.project)?;
    println!("Rewrote {}", written.display());
    Ok(())
}

fn report_skipped(skipped: &[SkippedDescriptor]) {
    for s in skipped {
        eprintln!("{YELLOW}skipped{RESET} {}: {}", s.path.display(), s.reason);
    }
}

fn format_diagnostic(d: &Diagnostic) -> String {
    let color = match d.severity {
        Severity::Warning => YELLOW,
        Severity::Info => CYAN,
    };
    format!(
        "{color}{}{RESET} {BOLD}{}{RESET}: {}",
        d.severity, d.field, d.message
    )
}

fn format_table(projects: &[Project]) -> String {
    let header = ["ID", "NAME", "STATUS", "TYPE", "OWNER"];
    let rows: Vec<[&str; 5]> = projects
        .iter()
        .map(|p| {
            [
                p.id(),
                p.name(),
                p.status_label(),
                p.kind_label(),
                p.owner(),
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    for row in std::iter::once(&header).chain(&rows) {
        let line = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

fn describe(project: &Project) -> String {
    let mut out = String::new();
    let mut field = |label: &str, value: &str| {
        if !value.is_empty() {
            let _ = writeln!(out, "{:<13}{value}", format!("{label}:"));
        }
    };

    field("Name", project.name());
    field("ID", project.id());
    field("Path", &project.path.display().to_string());
    field("Status", project.status_label());
    field("Type", project.kind_label());
    field("Owner", project.owner());
    field("Client", project.client_name());
    field("Partner", &project.partners().join(", "));
    field("Role", project.my_role());
    field("License", project.license_model());
    field("Visibility", &project.datakai.visibility);
    field("Stack", &project.tech.stack.join(", "));
    field("Domain", &project.tech.domain.join(", "));
    field("Started", &project.dates.started);
    field("Completed", &project.dates.completed);
    field("Repository", &project.links.repository);
    field("Docs", &project.links.documentation);
    field("Scriptorium", &project.datakai.scriptorium_project);
    field("Description", &project.notes.description);
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, pk_projects::parse_descriptor, std::path::Path};

    fn load(toml: &str) -> Project {
        parse_descriptor(toml, Path::new("/home/me/projects/alpha"))
            .unwrap()
            .project
    }

    #[test]
    fn table_aligns_columns() {
        let projects = vec![
            load("[project]\nid = \"alpha\"\nname = \"Alpha\"\nstatus = \"active\"\ntype = \"product\"\n\n[consultant]\nownership = \"datakai\"\n"),
            load("[project]\nid = \"b\"\nname = \"Beta Longer Name\"\n"),
        ];
        let table = format_table(&projects);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID     NAME              STATUS   TYPE"));
        assert!(lines[1].starts_with("alpha  Alpha             active   product  datakai"));
        assert!(lines[2].starts_with("b      Beta Longer Name  unknown  unknown"));
        assert_eq!(lines[2], lines[2].trim_end());
    }

    #[test]
    fn describe_uses_legacy_fallbacks_and_skips_empty_fields() {
        let project = load(
            "[project]\nid = \"alpha\"\nname = \"Alpha\"\n\n[ownership]\nprimary = \"acme\"\npartners = [\"westmonroe\"]\nvisibility = \"private\"\n",
        );
        let text = describe(&project);
        assert!(text.contains("Owner:       acme\n"));
        assert!(text.contains("Partner:     westmonroe\n"));
        assert!(text.contains("Visibility:  private\n"));
        assert!(text.contains("Path:        /home/me/projects/alpha\n"));
        assert!(!text.contains("Client:"));
        assert!(!text.contains("Scriptorium:"));
    }

    #[test]
    fn diagnostic_line_names_field() {
        let migrated = parse_descriptor(
            "[project]\nid = \"c\"\n\n[consultant]\nownership = \"datakai\"\n\n[ownership]\nprimary = \"client\"\n",
            Path::new("/p"),
        )
        .unwrap();
        let conflict = migrated
            .diagnostics
            .iter()
            .find(|d| d.category == "schema-conflict")
            .unwrap();
        let line = format_diagnostic(conflict);
        assert!(line.contains("consultant.ownership"));
        assert!(line.starts_with(YELLOW));
    }
}
