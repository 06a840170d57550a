mod cache_commands;
mod project_commands;

use std::path::PathBuf;

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    pk_projects::ProjectRegistry,
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "pk", version, about = "pk: find, inspect and jump between local projects")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides ~/.config/pk/pk.toml).
    #[arg(long, global = true, env = "PK_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the project snapshot and access records.
    #[arg(long, global = true, env = "PK_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List projects, optionally filtered by status, type, owner or `client`.
    List {
        filter: Option<String>,
        /// Scan the roots instead of reading the snapshot.
        #[arg(long)]
        fresh: bool,
    },
    /// Show everything known about one project.
    Show {
        /// Project id or name.
        query: String,
    },
    /// Most recently accessed projects first.
    Recent {
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// Record an access and print the project directory.
    Touch { query: String },
    /// Rewrite a descriptor in the current schema.
    Migrate {
        query: String,
        /// Print what would change without writing.
        #[arg(long)]
        dry_run: bool,
    },
    /// Snapshot cache management.
    Cache {
        #[command(subcommand)]
        action: cache_commands::CacheAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn open_registry(cli: &Cli) -> anyhow::Result<ProjectRegistry> {
    let config = pk_config::load_or_discover(cli.config.as_deref())?;
    let cache_dir = cli
        .cache_dir
        .clone()
        .or_else(|| config.cache_dir())
        .context("no cache directory available; set PK_CACHE_DIR or --cache-dir")?;
    let roots = config.root_dirs();

    debug!(
        roots = ?roots,
        cache_dir = %cache_dir.display(),
        max_age_secs = config.cache.max_age_secs,
        "opening project registry"
    );
    Ok(ProjectRegistry::in_dir(roots, &cache_dir, config.max_age()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    let registry = open_registry(&cli)?;

    let result = match cli.command {
        Commands::List { filter, fresh } => {
            project_commands::list(&registry, filter.as_deref(), fresh).await
        },
        Commands::Show { query } => project_commands::show(&registry, &query).await,
        Commands::Recent { limit } => project_commands::recent(&registry, limit).await,
        Commands::Touch { query } => project_commands::touch(&registry, &query).await,
        Commands::Migrate { query, dry_run } => {
            project_commands::migrate(&registry, &query, dry_run).await
        },
        Commands::Cache { action } => cache_commands::handle_cache(&registry, action).await,
    };

    // Each failed write-back is already logged by `flush`.
    if registry.flush().await.is_err() {
        debug!("snapshot not refreshed; next lookup rescans");
    }
    result
}
