use {anyhow::Result, clap::Subcommand, pk_projects::ProjectRegistry};

#[derive(Subcommand)]
pub enum CacheAction {
    /// Show snapshot location, age and validity.
    Status,
    /// Rescan every root and rewrite the snapshot.
    Refresh,
    /// Delete the snapshot; the next lookup rescans.
    Clear,
}

pub async fn handle_cache(registry: &ProjectRegistry, action: CacheAction) -> Result<()> {
    match action {
        CacheAction::Status => {
            print!("{}", registry.status()?);
            println!("Max age: {}s", registry.cache().max_age().as_secs());
            println!("Roots:");
            for root in registry.roots() {
                let marker = if root.exists() { "" } else { " (missing)" };
                println!("  {}{marker}", root.display());
            }
        },
        CacheAction::Refresh => {
            let count = registry.rebuild().wait().await?;
            println!("Cached {count} projects in {}", registry.cache().path().display());
        },
        CacheAction::Clear => {
            registry.invalidate()?;
            println!("Cleared {}", registry.cache().path().display());
        },
    }
    Ok(())
}
