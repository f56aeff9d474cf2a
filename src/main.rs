use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "precache")]
#[command(about = "Cache-first static asset worker: pre-cache, activate and serve from a versioned cache", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, default_value = precache::config::DEFAULT_CONFIG_FILE, help = "Path to the YAML config file")]
    config: PathBuf,

    #[arg(long, global = true, help = "Override the cache directory")]
    cache_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Override the origin manifest URLs resolve against")]
    origin: Option<String>,

    #[arg(long, global = true, help = "Enable verbose debug output")]
    verbose: bool,

    #[arg(long, global = true, help = "Perform a dry run without executing actions")]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Pre-cache every manifest URL into the current cache version")]
    Install,

    #[command(about = "Activate the current cache version, deleting stale versions")]
    Activate,

    #[command(about = "Install then activate, as a browser does for a fresh worker")]
    Update,

    #[command(about = "Fetch a path cache-first and print the response")]
    Fetch {
        #[arg(help = "Path or absolute URL to fetch")]
        path: String,

        #[arg(long, default_value = "GET", help = "HTTP method")]
        method: String,

        #[arg(long, help = "Write the response body to stdout")]
        body: bool,
    },

    #[command(about = "List cache version names")]
    Keys,

    #[command(about = "List the entries of a cache version")]
    Entries {
        #[arg(help = "Cache version name (defaults to the current version)")]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli::Config {
        config_path: cli.config,
        cache_dir: cli.cache_dir,
        origin: cli.origin,
        verbose: cli.verbose,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Install => {
            cli::install(&config).await?;
        }
        Commands::Activate => {
            cli::activate(&config).await?;
        }
        Commands::Update => {
            cli::update(&config).await?;
        }
        Commands::Fetch { path, method, body } => {
            cli::fetch(&path, &method, body, &config).await?;
        }
        Commands::Keys => {
            cli::keys(&config).await?;
        }
        Commands::Entries { name } => {
            cli::entries(name, &config).await?;
        }
    }

    Ok(())
}
